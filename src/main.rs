//! Main module for the Amber CLI application (`amber`).
//!
//! Parses the command line, loads configuration, opens the chat history and
//! dispatches to the requested subcommand.
//!
//! # Examples
//!
//! ```sh
//! amber ask "What is the meaning of life?"
//! amber interactive --chat 3
//! amber chats
//! ```

use std::{error::Error, fs};

use amber_chat::{
    commands::{Cli, Commands},
    config::{self, AmberConfig},
    gateway::{Gateway, ModelGateway},
    router::{ModelRouter, Provider},
    session::ChatSession,
    shell,
    store::ConversationStore,
};
use clap::Parser;
use once_cell::sync::OnceCell;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .init();
    });

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())
}

/// Resolve the provider and model for this run, point the router's gateway at
/// that model and hand back an owned copy of it.
fn select_gateway(
    cli: &Cli,
    config: &AmberConfig,
    router: &mut ModelRouter,
) -> Result<(Provider, String, Gateway), Box<dyn Error>> {
    let provider = match cli.provider.as_deref() {
        Some(name) => name.parse::<Provider>()?,
        None => router.default_provider(),
    };

    let gateway = router
        .gateway_mut(provider)
        .ok_or_else(|| format!("provider '{provider}' is not available; check its API key"))?;
    if let Some(model) = &cli.model {
        gateway.set_model(model.clone());
    }

    let model = gateway
        .model_name()
        .map(str::to_string)
        .unwrap_or_else(|| config.default_model.clone());

    Ok((provider, model, gateway.clone()))
}

fn open_session(
    store: &ConversationStore,
    chat: Option<i32>,
    provider: Provider,
    model: &str,
) -> Result<ChatSession, Box<dyn Error>> {
    match chat {
        Some(id) => Ok(ChatSession::resume(store, id, provider, model)?
            .ok_or_else(|| format!("chat {id} not found"))?),
        None => Ok(ChatSession::new(provider, model)),
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.command == Commands::Init {
        return init();
    }

    let config = AmberConfig::load(cli.config.as_deref())?;
    debug!("Using history database: {}", config.db_path);
    let store = ConversationStore::open(config.db_path.clone(), config.max_history_length)?;
    let mut router = ModelRouter::new(&config);

    match &cli.command {
        Commands::Ask { question, chat } => {
            let (provider, model, gateway) = select_gateway(&cli, &config, &mut router)?;
            let mut session = open_session(&store, *chat, provider, &model)?;
            shell::ask(&store, &gateway, &mut session, question).await?;
        }
        Commands::Interactive { chat } => {
            let (provider, model, gateway) = select_gateway(&cli, &config, &mut router)?;
            let mut session = open_session(&store, *chat, provider, &model)?;
            shell::interactive_mode(&store, &gateway, &mut session).await?;
        }
        Commands::Chats => shell::print_chats(&store.get_all_chats()?),
        Commands::Show { id } => {
            let chat = store
                .get_chat(*id)?
                .ok_or_else(|| format!("chat {id} not found"))?;
            println!("{} [{}]", chat.title, chat.model);
            shell::print_transcript(&store.get_chat_messages(*id)?)?;
            for attachment in store.get_chat_attachments(*id)? {
                println!(
                    "attachment #{}: {} ({} bytes)",
                    attachment.id,
                    attachment.filename,
                    attachment.content.len()
                );
            }
        }
        Commands::Rename { id, title } => {
            store
                .get_chat(*id)?
                .ok_or_else(|| format!("chat {id} not found"))?;
            store.update_chat_title(*id, title)?;
            println!("Renamed chat {id} to {title:?}");
        }
        Commands::Delete { id } => {
            store.delete_chat(*id)?;
            println!("Deleted chat {id}");
        }
        Commands::Clear { yes } => {
            if !yes {
                return Err("refusing to delete all chat history without --yes".into());
            }
            let removed = store.clear_all_history()?;
            println!("Deleted {removed} chats");
        }
        Commands::Attach { chat, file } => {
            store
                .get_chat(*chat)?
                .ok_or_else(|| format!("chat {chat} not found"))?;
            let content = fs::read(file)?;
            let filename = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            let id = store.save_attachment(*chat, &filename, &content)?;
            println!("Attached {filename} to chat {chat} as #{id}");
        }
        Commands::Models => {
            for (provider, models) in router.available_models().await {
                let marker = if provider == router.default_provider() { "*" } else { " " };
                println!("{marker} {provider}: {}", models.join(", "));
            }
        }
        Commands::Init => init()?,
    }

    Ok(())
}

/// Write a default `config.yaml` into the config directory, keeping any
/// existing file.
fn init() -> Result<(), Box<dyn Error>> {
    let config_path =
        config::default_config_path().ok_or("Unable to determine config directory")?;
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    info!("Creating config file: {}", config_path.display());
    config::save_config(&AmberConfig::default(), &config_path)?;
    println!("Wrote {}", config_path.display());
    Ok(())
}
