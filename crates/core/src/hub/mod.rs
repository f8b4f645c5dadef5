pub mod huggingface;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::Deserialize;

use crate::error::Result;

/// The account a token belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSummary {
    #[serde(rename = "modelId")]
    pub id: String,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub likes: i64,
}

/// A file in a model repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    pub path: String,
    pub size: Option<u64>,
}

/// An open download of one repository file.
pub struct FileStream {
    /// The server honored the requested start offset.
    pub resumed: bool,
    /// Bytes remaining in the stream, when known.
    pub remaining: Option<u64>,
    pub chunks: BoxStream<'static, Result<Vec<u8>>>,
}

/// The hub operations this tool consumes.
#[async_trait]
pub trait HubClient: Send + Sync {
    /// Validate `token` and return the account it belongs to.
    async fn whoami(&self, token: &str) -> Result<Identity>;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ModelSummary>>;

    async fn list_files(&self, model_id: &str) -> Result<Vec<RepoFile>>;

    /// Start streaming `path` from byte `offset`. A server that ignores the
    /// offset returns the whole file with `resumed == false`.
    async fn open_file(&self, model_id: &str, path: &str, offset: u64) -> Result<FileStream>;
}

pub use huggingface::HuggingFaceHub;
