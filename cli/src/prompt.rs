//! Line input for the interactive session.

use async_trait::async_trait;
use std::io::{self, BufRead, Write};

/// Source of user input. `Ok(None)` means the input was closed.
#[async_trait]
pub trait Prompter: Send {
    async fn line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Reads from stdin; blocking reads run on the blocking pool so callers can
/// race them against cancellation.
pub struct TerminalPrompter;

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        tokio::task::spawn_blocking(|| -> io::Result<Option<String>> {
            let mut buf = String::new();
            let read = io::stdin().lock().read_line(&mut buf)?;
            Ok(if read == 0 { None } else { Some(buf) })
        })
        .await
        .map_err(io::Error::other)?
    }
}
