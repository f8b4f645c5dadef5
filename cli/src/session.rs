//! The interactive search-and-download loop.

use anyhow::Result;
use crossterm::cursor::MoveTo;
use crossterm::terminal::{Clear, ClearType};
use hubfetch_core::hub::{HubClient, Identity};
use hubfetch_core::{
    download_snapshot, model_dir, CancelToken, HubError, Messages, ModelSummary, Msg, TokenStore,
};
use std::fmt::Display;
use std::io::Write;
use std::ops::ControlFlow;
use std::path::PathBuf;

use crate::prompt::Prompter;

/// Why the session ended. Every outcome exits the process with status 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The user typed `q`.
    Quit,
    /// Input reached end of file.
    InputClosed,
    /// Ctrl+C while waiting for input or for a login or search request.
    Interrupted,
    /// Ctrl+C during a download.
    DownloadCancelled,
    /// A download ended and the session is set to exit afterwards.
    DownloadFinished,
}

/// A parsed answer to the model selection prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Quit,
    Cancel,
    Pick(usize),
    Invalid,
}

/// Parse a selection for a list of `count` results. `count` itself is the
/// cancel entry.
pub fn parse_choice(input: &str, count: usize) -> Choice {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") {
        return Choice::Quit;
    }

    match input.parse::<usize>() {
        Ok(n) if n == count => Choice::Cancel,
        Ok(n) if n < count => Choice::Pick(n),
        _ => Choice::Invalid,
    }
}

fn is_quit(input: &str) -> bool {
    input.eq_ignore_ascii_case("q")
}

enum Input {
    Line(String),
    Closed,
    Interrupted,
}

pub struct Settings {
    pub search_limit: usize,
    pub download_root: PathBuf,
    pub tokens: TokenStore,
    pub clear_screen: bool,
    pub show_progress: bool,
    /// End the session after one download attempt instead of searching again.
    pub exit_after_download: bool,
}

pub struct Session<'a, P, W> {
    prompter: P,
    out: W,
    hub: &'a dyn HubClient,
    messages: &'a Messages,
    cancel: CancelToken,
    settings: Settings,
}

impl<'a, P: Prompter, W: Write> Session<'a, P, W> {
    pub fn new(
        prompter: P,
        out: W,
        hub: &'a dyn HubClient,
        messages: &'a Messages,
        cancel: CancelToken,
        settings: Settings,
    ) -> Self {
        Self {
            prompter,
            out,
            hub,
            messages,
            cancel,
            settings,
        }
    }

    pub async fn run(&mut self) -> Result<Outcome> {
        self.say(Msg::Welcome)?;

        if let ControlFlow::Break(outcome) = self.authenticate().await? {
            return Ok(outcome);
        }

        loop {
            let results = match self.search_step().await? {
                ControlFlow::Break(outcome) => return Ok(outcome),
                ControlFlow::Continue(None) => continue,
                ControlFlow::Continue(Some(results)) => results,
            };

            self.list(&results)?;

            let model_id = match self.select(&results).await? {
                ControlFlow::Break(outcome) => return Ok(outcome),
                ControlFlow::Continue(None) => continue,
                ControlFlow::Continue(Some(id)) => id,
            };

            if let ControlFlow::Break(outcome) = self.download(&model_id).await? {
                return Ok(outcome);
            }
        }
    }

    /// Log in with the cached token, or prompt until a token is accepted.
    pub async fn authenticate(&mut self) -> Result<ControlFlow<Outcome, Identity>> {
        if let Some(token) = self.settings.tokens.load() {
            self.say(Msg::CachedToken)?;
            let login = self.cancel.run_until_cancelled(self.hub.whoami(&token)).await;
            match login {
                Ok(identity) => {
                    self.say(Msg::SuccessLogin)?;
                    return Ok(ControlFlow::Continue(identity));
                }
                Err(HubError::Cancelled) => return self.interrupted(),
                Err(e) => {
                    tracing::warn!(error = %e, "Cached token rejected");
                    self.say_with(Msg::LoginError, &[("error", &e)])?;
                    self.say(Msg::InvalidToken)?;
                }
            }
        }

        loop {
            let token = match self.ask(Msg::EnterApi, &[]).await? {
                Input::Line(line) if is_quit(&line) => return self.quit(),
                Input::Line(line) if line.is_empty() => continue,
                Input::Line(line) => line,
                other => return self.end_of_input(other).map(ControlFlow::Break),
            };

            let login = self.cancel.run_until_cancelled(self.hub.whoami(&token)).await;
            match login {
                Err(HubError::Cancelled) => return self.interrupted(),
                Ok(identity) => {
                    self.say(Msg::SuccessLogin)?;
                    match self.settings.tokens.save(&token) {
                        Ok(()) => self.say(Msg::TokenSaved)?,
                        Err(e) => self.say_with(Msg::TokenSaveFailed, &[("error", &e)])?,
                    }
                    return Ok(ControlFlow::Continue(identity));
                }
                Err(e) => {
                    self.say_with(Msg::LoginError, &[("error", &e)])?;
                    self.say(Msg::InvalidToken)?;
                }
            }
        }
    }

    /// Ask for a query and search. `Continue(None)` means "ask again".
    async fn search_step(&mut self) -> Result<ControlFlow<Outcome, Option<Vec<ModelSummary>>>> {
        let query = match self.ask(Msg::SearchPrompt, &[]).await? {
            Input::Line(line) if is_quit(&line) => return self.quit(),
            Input::Line(line) if line.is_empty() => {
                self.say(Msg::EmptyQuery)?;
                return Ok(ControlFlow::Continue(None));
            }
            Input::Line(line) => line,
            other => return self.end_of_input(other).map(ControlFlow::Break),
        };

        let search = self
            .cancel
            .run_until_cancelled(self.hub.search(&query, self.settings.search_limit))
            .await;
        let results = match search {
            Ok(results) => results,
            Err(HubError::Cancelled) => return self.interrupted(),
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Search failed");
                self.say_with(Msg::SearchError, &[("error", &e)])?;
                return Ok(ControlFlow::Continue(None));
            }
        };

        if results.is_empty() {
            self.say_with(Msg::ModelNotFound, &[("query", &query)])?;
            return Ok(ControlFlow::Continue(None));
        }
        Ok(ControlFlow::Continue(Some(results)))
    }

    fn list(&mut self, results: &[ModelSummary]) -> Result<()> {
        for (idx, model) in results.iter().enumerate() {
            writeln!(self.out, "{}. {}", idx, model.id)?;
        }
        let cancel = self.messages.get(Msg::CancelOption);
        writeln!(self.out, "{}. {}", results.len(), cancel)?;
        Ok(())
    }

    /// Prompt until a valid selection. `Continue(None)` means the search was
    /// cancelled.
    async fn select(&mut self, results: &[ModelSummary]) -> Result<ControlFlow<Outcome, Option<String>>> {
        let count = results.len();
        loop {
            let input = match self.ask(Msg::PromptChoice, &[("max", &count)]).await? {
                Input::Line(line) => line,
                other => return self.end_of_input(other).map(ControlFlow::Break),
            };

            match parse_choice(&input, count) {
                Choice::Quit => return self.quit(),
                Choice::Cancel => {
                    self.say(Msg::CancelSearch)?;
                    return Ok(ControlFlow::Continue(None));
                }
                Choice::Pick(idx) => return Ok(ControlFlow::Continue(Some(results[idx].id.clone()))),
                Choice::Invalid => self.say(Msg::InvalidChoice)?,
            }
        }
    }

    /// Snapshot-download `model_id` under the download root.
    pub async fn download(&mut self, model_id: &str) -> Result<ControlFlow<Outcome>> {
        self.say_with(Msg::DownloadStart, &[("model_id", &model_id)])?;
        let destination = model_dir(&self.settings.download_root, model_id);

        let result = download_snapshot(
            self.hub,
            model_id,
            &destination,
            &self.cancel,
            self.settings.show_progress,
        )
        .await;

        match result {
            Ok(report) => {
                if self.settings.clear_screen {
                    crossterm::execute!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
                }
                self.say_with(Msg::DownloadSuccess, &[("model_id", &model_id)])?;
                self.say_with(
                    Msg::DownloadSummary,
                    &[
                        ("downloaded", &report.downloaded),
                        ("skipped", &report.skipped),
                        ("path", &report.directory.display()),
                    ],
                )?;
                Ok(self.after_download())
            }
            Err(e) if e.is_cancelled() || self.cancel.is_cancelled() => {
                tracing::debug!(model_id = %model_id, error = %e, "Download interrupted");
                self.say(Msg::DownloadCancel)?;
                Ok(ControlFlow::Break(Outcome::DownloadCancelled))
            }
            Err(e) => {
                tracing::error!(model_id = %model_id, error = %e, "Download failed");
                self.say_with(Msg::DownloadError, &[("error", &e)])?;
                Ok(self.after_download())
            }
        }
    }

    fn after_download(&self) -> ControlFlow<Outcome> {
        if self.settings.exit_after_download {
            ControlFlow::Break(Outcome::DownloadFinished)
        } else {
            ControlFlow::Continue(())
        }
    }

    /// Show a prompt and wait for a line, unless the session is interrupted
    /// first.
    async fn ask(&mut self, msg: Msg, args: &[(&str, &dyn Display)]) -> Result<Input> {
        let prompt = self.messages.render(msg, args);
        let cancel = self.cancel.clone();
        let prompter = &mut self.prompter;

        let input = tokio::select! {
            biased;
            _ = cancel.cancelled() => Input::Interrupted,
            line = prompter.line(&prompt) => match line? {
                Some(line) => Input::Line(line.trim().to_string()),
                None => Input::Closed,
            },
        };
        Ok(input)
    }

    fn quit<T>(&mut self) -> Result<ControlFlow<Outcome, T>> {
        self.say(Msg::ExitMessage)?;
        Ok(ControlFlow::Break(Outcome::Quit))
    }

    fn interrupted<T>(&mut self) -> Result<ControlFlow<Outcome, T>> {
        self.end_of_input(Input::Interrupted).map(ControlFlow::Break)
    }

    fn end_of_input(&mut self, input: Input) -> Result<Outcome> {
        // Terminal echo leaves the cursor after the prompt.
        writeln!(self.out)?;
        match input {
            Input::Interrupted => {
                self.say(Msg::ExitMessage)?;
                Ok(Outcome::Interrupted)
            }
            _ => {
                self.say(Msg::InputInterrupted)?;
                Ok(Outcome::InputClosed)
            }
        }
    }

    fn say(&mut self, msg: Msg) -> Result<()> {
        writeln!(self.out, "{}", self.messages.get(msg))?;
        Ok(())
    }

    fn say_with(&mut self, msg: Msg, args: &[(&str, &dyn Display)]) -> Result<()> {
        writeln!(self.out, "{}", self.messages.render(msg, args))?;
        Ok(())
    }
}
