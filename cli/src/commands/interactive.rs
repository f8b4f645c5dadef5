use anyhow::Result;
use hubfetch_core::{CancelToken, Config, HuggingFaceHub, Messages, TokenStore};
use std::io::{self, IsTerminal};

use crate::prompt::TerminalPrompter;
use crate::session::{Session, Settings};

pub async fn execute(config: &Config, messages: &Messages, cancel: CancelToken) -> Result<()> {
    let hub = HuggingFaceHub::new(&config.hub.endpoint)?;
    let tokens = TokenStore::default();
    tracing::debug!(token_path = %tokens.path().display(), "Using token file");

    let settings = Settings {
        search_limit: config.hub.search_limit,
        download_root: config.download.directory.clone(),
        tokens,
        clear_screen: config.ui.clear_on_success && io::stdout().is_terminal(),
        show_progress: true,
        exit_after_download: config.ui.exit_after_download,
    };

    let outcome = Session::new(TerminalPrompter, io::stdout(), &hub, messages, cancel, settings)
        .run()
        .await?;
    tracing::debug!(?outcome, "Session finished");

    Ok(())
}
