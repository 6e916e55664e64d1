//! This module provides functionality for loading and handling the application's configuration.
//!
//! Configuration comes from two places, in increasing priority:
//!
//! 1. an optional YAML file (by default `config.yaml` in [`crate::config_dir`]),
//! 2. environment variables.
//!
//! | variable | field |
//! |---|---|
//! | `OPENAI_API_KEY` | `openai_api_key` |
//! | `GEMINI_API_KEY` | `gemini_api_key` |
//! | `OLLAMA_BASE_URL` | `ollama_base_url` |
//! | `MAX_HISTORY_LENGTH` | `max_history_length` |
//! | `AMBER_DB_PATH` | `db_path` |
//! | `AMBER_DEFAULT_PROVIDER` | `default_provider` |
//! | `AMBER_DEFAULT_MODEL` | `default_model` |
//!
//! Every field has a default, so an empty file (or no file at all) is valid.
//!
//! # Examples
//!
//! ```no_run
//! use amber_chat::config::AmberConfig;
//!
//! let config = AmberConfig::load(None).unwrap();
//! println!("history kept per chat: {}", config.max_history_length);
//! ```

use serde::{Deserialize, Serialize};
use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use tracing::*;

use crate::{
    gateway::{
        gemini::{DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL},
        ollama::DEFAULT_OLLAMA_BASE_URL,
        openai::{DEFAULT_OPENAI_API_BASE, DEFAULT_OPENAI_MODEL},
    },
    store::DEFAULT_MAX_HISTORY_LENGTH,
};

pub const DEFAULT_DB_PATH: &str = "amber_chat_history.db";

/// Represents the application's configuration.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct AmberConfig {
    /// Enables the OpenAI provider when set.
    pub openai_api_key: Option<String>,

    pub openai_api_base: String,

    /// Model used for OpenAI chats.
    pub openai_model: String,

    /// Enables the Gemini provider when set.
    pub gemini_api_key: Option<String>,

    pub gemini_api_base: String,

    /// Model used for Gemini chats.
    pub gemini_model: String,

    /// Where the local Ollama server listens.
    pub ollama_base_url: String,

    /// Messages kept per chat; older ones are pruned.
    pub max_history_length: usize,

    /// Path of the SQLite chat history.
    pub db_path: String,

    // Provider used when none is given on the command line.
    pub default_provider: String,

    // Model used when none is given on the command line.
    pub default_model: String,
}

impl Default for AmberConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            gemini_api_key: None,
            gemini_api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            max_history_length: DEFAULT_MAX_HISTORY_LENGTH,
            db_path: DEFAULT_DB_PATH.to_string(),
            default_provider: "ollama".to_string(),
            default_model: "llama2".to_string(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AmberConfig {
    /// Load configuration for a run.
    ///
    /// Reads `path` if given (it must exist), otherwise `config.yaml` in the
    /// config directory if that exists, otherwise starts from defaults. The
    /// process environment is applied on top.
    ///
    /// # Errors
    /// Unreadable or malformed files, an unparsable `MAX_HISTORY_LENGTH`, and a
    /// retention window of zero.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let mut config = match path {
            Some(path) => load_config(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => load_config(&path)?,
                _ => {
                    debug!("No config file found, using defaults");
                    AmberConfig::default()
                }
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;

        info!(
            "OPENAI_API_KEY loaded: {}",
            if config.openai_api_key().is_some() { "Yes" } else { "No" }
        );
        info!(
            "GEMINI_API_KEY loaded: {}",
            if config.gemini_api_key().is_some() { "Yes" } else { "No" }
        );

        Ok(config)
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), Box<dyn Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            self.ollama_base_url = url;
        }
        if let Some(length) = lookup("MAX_HISTORY_LENGTH") {
            self.max_history_length = length
                .trim()
                .parse()
                .map_err(|err| format!("MAX_HISTORY_LENGTH must be a number ({length:?}): {err}"))?;
        }
        if let Some(path) = lookup("AMBER_DB_PATH") {
            self.db_path = path;
        }
        if let Some(provider) = lookup("AMBER_DEFAULT_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("AMBER_DEFAULT_MODEL") {
            self.default_model = model;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.max_history_length == 0 {
            return Err("max_history_length must be at least 1".into());
        }
        Ok(())
    }

    /// The OpenAI key, if one is configured and not blank.
    pub fn openai_api_key(&self) -> Option<&str> {
        non_empty(&self.openai_api_key)
    }

    /// The Gemini key, if one is configured and not blank.
    pub fn gemini_api_key(&self) -> Option<&str> {
        non_empty(&self.gemini_api_key)
    }
}

/// `config.yaml` inside the per-platform config directory, if it can be determined.
pub fn default_config_path() -> Option<PathBuf> {
    crate::config_dir().ok().map(|dir| dir.join("config.yaml"))
}

/// Loads the application's configuration from a YAML file.
///
/// # Examples
///
/// ```no_run
/// use amber_chat::config::load_config;
///
/// match load_config("/path/to/config.yaml".as_ref()) {
///     Ok(config) => println!("{:?}", config),
///     Err(err) => eprintln!("Error loading config: {}", err),
/// }
/// ```
pub fn load_config(file: &Path) -> Result<AmberConfig, Box<dyn Error>> {
    debug!("Loading config from: {}", file.display());
    let content = fs::read_to_string(file)?;
    let config: AmberConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Write `config` as YAML to `file`, creating parent directories.
pub fn save_config(config: &AmberConfig, file: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(file, serde_yaml::to_string(config)?)?;
    Ok(())
}
