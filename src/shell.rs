//! # Terminal shell
//!
//! Renders chats in the terminal and drives [`ChatSession`] turns from user
//! input. Assistant replies are printed as markdown through `termimad`; a
//! spinner runs while the gateway works.
//!
//! Interactive mode reads one line per turn and understands a few commands:
//!
//! | input | effect |
//! |---|---|
//! | `exit`, `quit`, EOF | leave |
//! | `/new` | start a new chat |
//! | `/title <text>` | rename the open chat |
//! | `/attach <path>` | store a file in the open chat |

use std::{
    error::Error,
    fs,
    io::{BufRead, Write, stdin, stdout},
    path::Path,
    time::Duration,
};

use crossterm::{
    ExecutableCommand,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
};
use indicatif::{ProgressBar, ProgressStyle};
use termimad::MadSkin;
use tracing::{debug, error};

use crate::{
    gateway::ModelGateway,
    models::{Chat, ChatMessage, Role},
    session::{ChatSession, SessionError},
    store::ConversationStore,
};

/// What a line typed in interactive mode asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum ShellInput<'a> {
    Exit,
    NewChat,
    Rename(&'a str),
    Attach(&'a str),
    Message(&'a str),
    Nothing,
}

impl<'a> ShellInput<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ShellInput::Nothing;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            return ShellInput::Exit;
        }
        if line == "/new" {
            return ShellInput::NewChat;
        }
        if let Some(title) = line.strip_prefix("/title ") {
            return ShellInput::Rename(title.trim());
        }
        if let Some(path) = line.strip_prefix("/attach ") {
            return ShellInput::Attach(path.trim());
        }
        ShellInput::Message(line)
    }
}

fn spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        bar.set_style(style);
    }
    bar.set_message("Thinking...");
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Print an assistant reply as markdown.
pub fn print_reply(reply: &str) -> Result<(), Box<dyn Error>> {
    let mut out = stdout();
    out.execute(SetForegroundColor(Color::Blue))?;
    out.execute(SetAttribute(Attribute::Bold))?;
    out.execute(Print("Assistant:\n"))?;
    out.execute(SetAttribute(Attribute::Reset))?;
    out.execute(ResetColor)?;
    MadSkin::default().print_text(reply);
    out.flush()?;
    Ok(())
}

/// Print a stored transcript, oldest first.
pub fn print_transcript(messages: &[ChatMessage]) -> Result<(), Box<dyn Error>> {
    let mut out = stdout();
    for message in messages {
        match message.role {
            Role::User => {
                out.execute(SetForegroundColor(Color::Green))?;
                out.execute(Print(format!("You: {}\n", message.content)))?;
                out.execute(ResetColor)?;
            }
            Role::Assistant => print_reply(&message.content)?,
        }
    }
    Ok(())
}

/// One line per chat: id, title, model and last activity.
pub fn format_chat_line(chat: &Chat) -> String {
    format!(
        "{:>4}  {}  [{}]  {}",
        chat.id,
        chat.title,
        chat.model,
        chat.last_updated.format("%Y-%m-%d %H:%M")
    )
}

pub fn print_chats(chats: &[Chat]) {
    if chats.is_empty() {
        println!("No chat history available");
        return;
    }
    for chat in chats {
        println!("{}", format_chat_line(chat));
    }
}

async fn run_turn<G: ModelGateway>(
    store: &ConversationStore,
    gateway: &G,
    session: &mut ChatSession,
    input: &str,
) -> Result<String, SessionError> {
    let bar = spinner();
    let reply = session.send(store, gateway, input).await;
    bar.finish_and_clear();
    reply
}

/// Ask one question in `session` and print the reply.
pub async fn ask<G: ModelGateway>(
    store: &ConversationStore,
    gateway: &G,
    session: &mut ChatSession,
    question: &str,
) -> Result<(), Box<dyn Error>> {
    debug!("Asking question: {:?}", question);
    let reply = run_turn(store, gateway, session, question).await?;
    print_reply(&reply)?;
    if let Some(chat_id) = session.chat_id() {
        println!("(chat {chat_id})");
    }
    Ok(())
}

/// Read-eval loop until the user leaves.
pub async fn interactive_mode<G: ModelGateway>(
    store: &ConversationStore,
    gateway: &G,
    session: &mut ChatSession,
) -> Result<(), Box<dyn Error>> {
    let mut out = stdout();
    match session.chat_id().and_then(|id| store.get_chat(id).ok().flatten()) {
        Some(chat) => {
            println!("Conversation: {}", chat.title);
            print_transcript(session.transcript())?;
        }
        None => println!("New conversation with {}", session.model_id()),
    }

    let mut lines = stdin().lock().lines();
    loop {
        out.execute(SetForegroundColor(Color::Green))?;
        out.execute(Print("\nYou: "))?;
        out.execute(ResetColor)?;
        out.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        match ShellInput::parse(&line) {
            ShellInput::Exit => break,
            ShellInput::Nothing => continue,
            ShellInput::NewChat => {
                session.reset();
                println!("Started a new conversation");
            }
            ShellInput::Rename(title) => match session.chat_id() {
                Some(chat_id) => {
                    store.update_chat_title(chat_id, title)?;
                    println!("Renamed chat {chat_id} to {title:?}");
                }
                None => eprintln!("Error: {}", SessionError::NoActiveChat),
            },
            ShellInput::Attach(path) => {
                let content = match fs::read(path) {
                    Ok(content) => content,
                    Err(err) => {
                        eprintln!("Error: could not read {path}: {err}");
                        continue;
                    }
                };
                let filename = Path::new(path)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.to_string());
                match session.attach(store, &filename, &content) {
                    Ok(id) => println!("Attached {filename} ({} bytes) as #{id}", content.len()),
                    Err(err) => eprintln!("Error: {err}"),
                }
            }
            ShellInput::Message(message) => {
                match run_turn(store, gateway, session, message).await {
                    Ok(reply) => print_reply(&reply)?,
                    Err(err) => {
                        error!("Turn failed: {}", err);
                        eprintln!("Error: {err}");
                    }
                }
            }
        }
    }

    Ok(())
}
