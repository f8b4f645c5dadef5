//! hubfetch_core - Core library for hub model downloads
//!
//! This crate provides:
//! - A hub client trait and its Hugging Face HTTP implementation
//! - Snapshot downloads with skip and resume
//! - The cached token store
//! - Localized messages and configuration

pub mod cancel;
pub mod config;
pub mod error;
pub mod hub;
pub mod messages;
pub mod snapshot;
pub mod token;

pub use cancel::CancelToken;
pub use config::Config;
pub use error::HubError;
pub use hub::{HubClient, HuggingFaceHub, ModelSummary};
pub use messages::{Language, Messages, Msg};
pub use snapshot::{download_snapshot, model_dir, SnapshotReport};
pub use token::TokenStore;
