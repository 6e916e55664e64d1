//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum with the available subcommands and their options.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use amber_chat::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! if let Commands::Chats = cli.command {
//!     // list stored chats
//! }
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Provider to talk to: openai, ollama or gemini.
    #[arg(short = 'p', long, global = true, env = "AMBER_PROVIDER")]
    pub provider: Option<String>,

    /// Model to request from the provider.
    #[arg(short = 'm', long, global = true, env = "AMBER_MODEL")]
    pub model: Option<String>,

    /// Path to a YAML config file.
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug, PartialEq)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Ask a single question, in a new chat or an existing one.
    #[clap(name = "ask", alias = "a")]
    Ask {
        /// The question to ask.
        question: String,

        /// Continue the chat with this id.
        #[arg(long)]
        chat: Option<i32>,
    },

    /// Chat back and forth until `exit`.
    ///
    /// This subcommand can be invoked with either 'i' or 'interactive'.
    #[clap(name = "interactive", alias = "i")]
    Interactive {
        /// Resume the chat with this id.
        #[arg(long)]
        chat: Option<i32>,
    },

    /// List stored chats, most recently active first.
    #[clap(name = "chats", alias = "ls")]
    Chats,

    /// Print the messages of a chat.
    Show { id: i32 },

    /// Rename a chat.
    Rename { id: i32, title: String },

    /// Delete a chat with its messages and attachments.
    #[clap(alias = "rm")]
    Delete { id: i32 },

    /// Delete every stored chat.
    Clear {
        /// Skip the safety check; required to actually clear.
        #[arg(long)]
        yes: bool,
    },

    /// Store a file as an attachment of a chat.
    Attach { chat: i32, file: PathBuf },

    /// List providers and their selectable models.
    Models,

    /// Write a default config file into the config directory.
    Init,
}
