use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable that carries a token for non-interactive use.
pub const TOKEN_ENV: &str = "HF_TOKEN";

/// The Hugging Face token file shared with the hub's own tooling.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$HF_HOME/token`, defaulting to `~/.cache/huggingface/token`.
    pub fn default_path() -> PathBuf {
        hf_hub::Cache::default().token_path()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached token, if the file exists and is not blank.
    pub fn load(&self) -> Option<String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read token file");
                return None;
            }
        };

        let token = content.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    pub fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token.trim())?;
        tracing::debug!(path = %self.path.display(), "Saved token");
        Ok(())
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

/// Token from [`TOKEN_ENV`], falling back to the store.
pub fn resolve_token(store: &TokenStore) -> Option<String> {
    std::env::var(TOKEN_ENV)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| store.load())
}
