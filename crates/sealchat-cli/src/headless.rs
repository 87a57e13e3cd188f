//! Line mode.
//!
//! Reads commands and chat lines from the input, prints incoming messages as
//! they arrive. Runs until `/quit`, end of input, or the relay hangs up.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;

use crate::chat::{ChatClient, ChatEvent};
use crate::connection::ConnectionError;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Chat(String),
    WhoAmI,
    Help,
    Quit,
    Say(String),
    Unknown(String),
    Empty,
}

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        if trimmed.is_empty() {
            return Command::Empty;
        }
        return Command::Say(line.trim_end_matches(['\r', '\n']).to_string());
    };
    let (cmd, arg) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(c, a)| (c, a.trim()));
    match cmd {
        "list" => Command::List,
        "chat" if !arg.is_empty() => Command::Chat(arg.to_string()),
        "whoami" => Command::WhoAmI,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

/// Run line mode until the user quits or the relay goes away.
pub async fn run<R, W>(client: &mut ChatClient, input: R, out: &mut W) -> Result<(), HeadlessError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Input closed");
                    break;
                };
                if !handle_command(client, parse_command(&line), out).await? {
                    break;
                }
            }
            event = client.next_event() => print_event(out, &event?)?,
        }
        out.flush()?;
    }
    client.close().await?;
    Ok(())
}

/// Execute one command. Returns false when the user asked to quit.
async fn handle_command<W: Write>(
    client: &mut ChatClient,
    command: Command,
    out: &mut W,
) -> Result<bool, HeadlessError> {
    match command {
        Command::Quit => return Ok(false),
        Command::Empty => {}
        Command::Help => {
            writeln!(out, "[/list | /chat <id-or-name> | /whoami | /quit | anything else is sent]")?;
        }
        Command::Unknown(cmd) => writeln!(out, "[unknown command {cmd}]")?,
        Command::List => {
            let own = client.identifier().map(str::to_string);
            for entry in client.list().await? {
                let marker = if own.as_deref() == Some(entry.identifier.as_str()) {
                    " (you)"
                } else {
                    ""
                };
                writeln!(
                    out,
                    "  {}  {}{marker}",
                    entry.identifier,
                    entry.name.as_deref().unwrap_or("-")
                )?;
            }
        }
        Command::WhoAmI => {
            let fingerprint = client.key_pair().map_err(ConnectionError::from)?.public_key().fingerprint();
            writeln!(
                out,
                "[{} key {fingerprint}]",
                client.identifier().unwrap_or("unregistered")
            )?;
        }
        Command::Chat(target) => match client.start_chat(&target).await {
            Ok(peer) => writeln!(
                out,
                "[chatting with {} ({}), key {}]",
                peer.label(),
                peer.identifier,
                peer.key.fingerprint()
            )?,
            Err(ConnectionError::TargetNotFound(message)) => writeln!(out, "[{message}]")?,
            Err(e) => return Err(e.into()),
        },
        Command::Say(text) => match client.send_text(&text).await {
            Ok(()) => {}
            Err(ConnectionError::NoPeer) => {
                writeln!(out, "[no chat selected, use /chat <id-or-name>]")?;
            }
            Err(ConnectionError::Crypto(e)) => writeln!(out, "[could not seal message: {e}]")?,
            Err(e @ ConnectionError::InvalidCorruptBit(_)) => writeln!(out, "[{e}]")?,
            Err(e) => return Err(e.into()),
        },
    }
    Ok(true)
}

fn print_event<W: Write>(out: &mut W, event: &ChatEvent) -> std::io::Result<()> {
    match event {
        ChatEvent::Message {
            sender,
            sender_name,
            text,
        } => writeln!(out, "[{}] {text}", sender_name.as_deref().unwrap_or(sender)),
        ChatEvent::Unreadable { sender, reason } => {
            writeln!(out, "[unreadable message from {sender}: {reason}]")
        }
        ChatEvent::DeliveryFailed { recipient, reason } => {
            writeln!(out, "[not delivered to {recipient}: {reason}]")
        }
        ChatEvent::Notice(message) => writeln!(out, "[relay: {message}]"),
    }
}

/// Line mode errors.
#[derive(Debug, thiserror::Error)]
pub enum HeadlessError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),
}
