//! Subcommands.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use mex_client::config::default_config_path;
use mex_client::{ClientConfig, MailboxClient, MessageId, MexError};
use tokio_util::sync::CancellationToken;

/// Exit status for protocol violations.
pub const EXIT_FATAL: u8 = 2;
/// Exit status for transport failures and everything else.
pub const EXIT_FAILURE: u8 = 1;
/// Exit status after Ctrl-C.
pub const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Parser)]
#[command(name = "mex", version, about = "Chunked mailbox message-exchange client")]
pub struct Cli {
    /// Path to the JSON config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check the mailbox and credentials.
    Handshake,
    /// List waiting message ids.
    Inbox,
    /// Send a file as one message.
    Send {
        /// Recipient mailbox id.
        #[arg(long)]
        to: String,
        #[arg(long)]
        workflow_id: String,
        /// Filename tag; defaults to the file's name.
        #[arg(long)]
        filename: Option<String>,
        file: PathBuf,
    },
    /// Download a message.
    Receive {
        message_id: String,
        /// Write the body here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Acknowledge after a successful download.
        #[arg(long)]
        ack: bool,
    },
    /// Acknowledge a message.
    Ack { message_id: String },
}

/// Maps a failure onto the process exit status.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<MexError>() {
        Some(MexError::Fatal(_)) => EXIT_FATAL,
        Some(MexError::Cancelled(_)) => EXIT_CANCELLED,
        _ => EXIT_FAILURE,
    }
}

/// Filename tag for `path` when none is given.
fn filename_tag(explicit: Option<String>, path: &Path) -> anyhow::Result<String> {
    match explicit {
        Some(name) => Ok(name),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", path.display())),
    }
}

fn parse_id(raw: &str) -> anyhow::Result<MessageId> {
    MessageId::new(raw).with_context(|| format!("invalid message id {raw:?}"))
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let path = cli.config.unwrap_or_else(default_config_path);
    let config = ClientConfig::load(&path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    tracing::info!(mailbox = %config.mailbox_id, base_url = %config.base_url, "configuration loaded");

    let cancel = CancellationToken::new();
    let client = MailboxClient::from_config(&config)?.with_cancellation(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            cancel.cancel();
        }
    });

    match cli.command {
        Command::Handshake => {
            client.handshake().await?;
            println!("ok");
        }
        Command::Inbox => {
            for id in client.list_inbox().await? {
                println!("{id}");
            }
        }
        Command::Send {
            to,
            workflow_id,
            filename,
            file,
        } => {
            let filename = filename_tag(filename, &file)?;
            let payload = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let metadata = client.outbound(to, workflow_id, filename);
            let result = client.send_message(&metadata, &payload).await?;
            // The final response body is the service's JSON receipt.
            match serde_json::from_slice::<serde_json::Value>(&result.data) {
                Ok(json) => println!("{json}"),
                Err(_) => println!("{}", result.text()),
            }
        }
        Command::Receive {
            message_id,
            output,
            ack,
        } => {
            let id = parse_id(&message_id)?;
            let result = client.receive_message(&id).await?;
            match output {
                Some(path) => tokio::fs::write(&path, &result.data)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?,
                None => std::io::stdout().lock().write_all(&result.data)?,
            }
            if ack {
                client.acknowledge(&id).await?;
            }
        }
        Command::Ack { message_id } => {
            client.acknowledge(&parse_id(&message_id)?).await?;
        }
    }
    Ok(())
}
