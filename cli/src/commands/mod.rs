pub mod config;
pub mod interactive;
pub mod pull;
pub mod search;
