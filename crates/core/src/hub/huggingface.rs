use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::RANGE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::sync::RwLock;
use std::time::Duration;

use super::{FileStream, HubClient, Identity, ModelSummary, RepoFile};
use crate::error::{HubError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Downloads can run for a long time, so only connecting is bounded.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// [`HubClient`] backed by the Hugging Face HTTP API.
///
/// A token accepted by [`HubClient::whoami`] is remembered and sent with
/// every later request, so gated and private repositories work after login.
pub struct HuggingFaceHub {
    client: Client,
    endpoint: String,
    token: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct HfModelInfo {
    #[serde(default)]
    siblings: Vec<HfSibling>,
}

#[derive(Debug, Deserialize)]
struct HfSibling {
    rfilename: String,
    #[serde(default)]
    size: Option<u64>,
}

impl HuggingFaceHub {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("hubfetch/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    pub fn with_token(self, token: Option<String>) -> Self {
        self.set_token(token);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token;
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.token.read().ok().and_then(|t| t.clone());
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn file_url(&self, model_id: &str, path: &str) -> String {
        format!("{}/{}/resolve/main/{}", self.endpoint, model_id, path)
    }
}

/// Map non-success statuses onto [`HubError`].
fn check_status(response: Response, model_id: Option<&str>) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match (status, model_id) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => Err(HubError::Unauthorized),
        (StatusCode::NOT_FOUND, Some(id)) => Err(HubError::NotFound(id.to_string())),
        _ => Err(HubError::Status {
            status,
            url: response.url().to_string(),
        }),
    }
}

#[async_trait]
impl HubClient for HuggingFaceHub {
    async fn whoami(&self, token: &str) -> Result<Identity> {
        let url = format!("{}/api/whoami-v2", self.endpoint);
        tracing::debug!(url = %url, "Validating token");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await?;

        let identity: Identity = check_status(response, None)?.json().await?;
        self.set_token(Some(token.to_string()));
        tracing::info!(user = %identity.name, "Authenticated");
        Ok(identity)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ModelSummary>> {
        let url = format!("{}/api/models", self.endpoint);
        let limit = limit.to_string();
        tracing::debug!(query = %query, limit = %limit, "Searching models");

        let response = self
            .authorized(self.client.get(&url).query(&[
                ("search", query),
                ("limit", limit.as_str()),
                ("sort", "downloads"),
                ("direction", "-1"),
            ]))
            .send()
            .await?;

        let results: Vec<ModelSummary> = check_status(response, None)?.json().await?;
        Ok(results)
    }

    async fn list_files(&self, model_id: &str) -> Result<Vec<RepoFile>> {
        let url = format!("{}/api/models/{}", self.endpoint, model_id);
        tracing::debug!(url = %url, "Fetching model info");

        let response = self
            .authorized(self.client.get(&url).query(&[("blobs", "true")]))
            .send()
            .await?;

        let info: HfModelInfo = check_status(response, Some(model_id))?.json().await?;
        Ok(info
            .siblings
            .into_iter()
            .map(|s| RepoFile {
                path: s.rfilename,
                size: s.size,
            })
            .collect())
    }

    async fn open_file(&self, model_id: &str, path: &str, offset: u64) -> Result<FileStream> {
        let url = self.file_url(model_id, path);
        tracing::debug!(url = %url, offset, "Opening file");

        let mut request = self.authorized(self.client.get(&url));
        if offset > 0 {
            request = request.header(RANGE, format!("bytes={}-", offset));
        }
        let response = request.send().await?;

        // The part file already holds the whole file.
        if offset > 0 && response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(FileStream {
                resumed: true,
                remaining: Some(0),
                chunks: futures_util::stream::empty().boxed(),
            });
        }

        let response = check_status(response, Some(model_id))?;
        let resumed = response.status() == StatusCode::PARTIAL_CONTENT;
        let remaining = response.content_length();
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(HubError::from))
            .boxed();

        Ok(FileStream {
            resumed,
            remaining,
            chunks,
        })
    }
}
