//! # Amber (library root)
//!
//! Core plumbing for the **Amber** chat CLI: talk to a hosted or local language
//! model, keep every conversation in a local SQLite file, and pick old
//! conversations back up.
//!
//! - Model access behind one capability (`gateway`) with a provider registry (`router`).
//! - Chat history persistence with a per-chat retention window (`store`, `models`, `schema`).
//! - Offline chat titles (`title`).
//! - Session state, terminal rendering and CLI parsing (`session`, `shell`, `commands`).
//! - Configuration from YAML and the environment (`config`).
//!
//! ## Modules
//! - [`commands`], [`config`], [`gateway`], [`models`], [`router`], [`schema`],
//!   [`session`], [`shell`], [`store`], [`title`]

use directories::ProjectDirs;
use std::error::Error;

pub mod commands;
pub mod config;
pub mod gateway;
pub mod models;
pub mod router;
pub mod schema;
pub mod session;
pub mod shell;
pub mod store;
pub mod title;

/// Return the per-platform configuration directory used by Amber.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "amber", "amber")`, so you get the right place on each OS
/// (e.g., `~/.config/amber` on Linux).
///
/// The directory is **not** created by this function.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be determined
/// (which is rare but possible in heavily sandboxed environments).
pub fn config_dir() -> Result<std::path::PathBuf, Box<dyn Error>> {
    let proj_dirs =
        ProjectDirs::from("com", "amber", "amber").ok_or("Unable to determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}
