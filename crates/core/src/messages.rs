//! Localized user-facing text.
//!
//! The message table ships inside the binary. A [`Messages`] value is built
//! once at startup for the selected [`Language`] and passed to whatever
//! renders text.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

const MESSAGE_TABLE: &str = include_str!("messages.json");

/// Locale variables consulted by [`Language::detect`], highest precedence first.
const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Tr,
    #[default]
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Tr => "tr",
            Language::En => "en",
        }
    }

    /// Pick a language from the process locale environment.
    pub fn detect() -> Self {
        Self::detect_with(|name| std::env::var(name).ok())
    }

    /// Pick a language using `lookup` to read locale variables.
    pub fn detect_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        LOCALE_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty())
            .map(|value| Self::from_locale(&value))
            .unwrap_or_default()
    }

    /// Map a locale string such as `tr_TR.UTF-8` to a language, falling back
    /// to English.
    pub fn from_locale(locale: &str) -> Self {
        if locale.trim().to_ascii_lowercase().starts_with("tr") {
            Language::Tr
        } else {
            Language::En
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower.starts_with("tr") {
            Ok(Language::Tr)
        } else if lower.starts_with("en") {
            Ok(Language::En)
        } else {
            Err(format!("unsupported language '{}' (expected 'tr' or 'en')", s))
        }
    }
}

/// Every message the program can print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Msg {
    Welcome,
    CachedToken,
    EnterApi,
    ExitMessage,
    InputInterrupted,
    SuccessLogin,
    InvalidToken,
    LoginError,
    TokenSaved,
    TokenSaveFailed,
    SearchPrompt,
    EmptyQuery,
    SearchError,
    ModelNotFound,
    CancelOption,
    PromptChoice,
    CancelSearch,
    InvalidChoice,
    DownloadStart,
    DownloadSuccess,
    DownloadSummary,
    DownloadError,
    DownloadCancel,
}

impl Msg {
    pub const ALL: [Msg; 23] = [
        Msg::Welcome,
        Msg::CachedToken,
        Msg::EnterApi,
        Msg::ExitMessage,
        Msg::InputInterrupted,
        Msg::SuccessLogin,
        Msg::InvalidToken,
        Msg::LoginError,
        Msg::TokenSaved,
        Msg::TokenSaveFailed,
        Msg::SearchPrompt,
        Msg::EmptyQuery,
        Msg::SearchError,
        Msg::ModelNotFound,
        Msg::CancelOption,
        Msg::PromptChoice,
        Msg::CancelSearch,
        Msg::InvalidChoice,
        Msg::DownloadStart,
        Msg::DownloadSuccess,
        Msg::DownloadSummary,
        Msg::DownloadError,
        Msg::DownloadCancel,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Msg::Welcome => "welcome",
            Msg::CachedToken => "cached_token",
            Msg::EnterApi => "enter_api",
            Msg::ExitMessage => "exit_message",
            Msg::InputInterrupted => "input_interrupted",
            Msg::SuccessLogin => "success_login",
            Msg::InvalidToken => "invalid_token",
            Msg::LoginError => "login_error",
            Msg::TokenSaved => "token_saved",
            Msg::TokenSaveFailed => "token_save_failed",
            Msg::SearchPrompt => "search_prompt",
            Msg::EmptyQuery => "empty_query",
            Msg::SearchError => "search_error",
            Msg::ModelNotFound => "model_not_found",
            Msg::CancelOption => "cancel_option",
            Msg::PromptChoice => "prompt_choice",
            Msg::CancelSearch => "cancel_search",
            Msg::InvalidChoice => "invalid_choice",
            Msg::DownloadStart => "download_start",
            Msg::DownloadSuccess => "download_success",
            Msg::DownloadSummary => "download_summary",
            Msg::DownloadError => "download_error",
            Msg::DownloadCancel => "download_cancel",
        }
    }
}

type Table = HashMap<String, HashMap<String, String>>;

/// Message templates for one language, with English as the fallback.
#[derive(Debug, Clone)]
pub struct Messages {
    language: Language,
    selected: HashMap<String, String>,
    fallback: HashMap<String, String>,
}

impl Messages {
    pub fn new(language: Language) -> Result<Self, serde_json::Error> {
        let mut table: Table = serde_json::from_str(MESSAGE_TABLE)?;
        let fallback = table.remove(Language::En.as_str()).unwrap_or_default();
        let selected = match language {
            Language::En => fallback.clone(),
            other => table.remove(other.as_str()).unwrap_or_default(),
        };

        Ok(Self {
            language,
            selected,
            fallback,
        })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// The raw template for `msg`.
    pub fn template(&self, msg: Msg) -> &str {
        let key = msg.key();
        self.selected
            .get(key)
            .or_else(|| self.fallback.get(key))
            .map(String::as_str)
            .unwrap_or(key)
    }

    /// A message without placeholders.
    pub fn get(&self, msg: Msg) -> String {
        self.template(msg).to_string()
    }

    /// Fill `{name}` placeholders from `args`. Placeholders without a
    /// matching argument are left untouched.
    pub fn render(&self, msg: Msg, args: &[(&str, &dyn fmt::Display)]) -> String {
        let mut text = self.template(msg).to_string();
        for (name, value) in args {
            text = text.replace(&format!("{{{}}}", name), &value.to_string());
        }
        text
    }
}
