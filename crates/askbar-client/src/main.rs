use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use askbar_client::{init_tracing, Attachments, ChatStore, ClientConfig, StoreEvent};
use askbar_media::{CpalDevice, VoiceRecorder};
use askbar_shared::{ChatId, MessageId, Role};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

#[derive(Debug, Parser)]
#[command(name = "askbar", version, about = "Chat with the Askbar assistant")]
struct Cli {
    /// Override the API base URL (`ASKBAR_API_URL`).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Override the storage directory (`ASKBAR_DATA_DIR`).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List chats.
    Chats,
    /// Create a chat.
    New { name: String },
    /// Rename a chat.
    Rename { chat: String, name: String },
    /// Delete a chat.
    Delete { chat: String },
    /// Print the messages of a chat.
    History { chat: String },
    /// Send a message and stream the reply.
    Send {
        chat: String,
        text: String,
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        audio: Option<PathBuf>,
    },
    /// Record from the microphone, then send the recording.
    Voice {
        chat: String,
        #[arg(long, default_value_t = 5)]
        seconds: u64,
        #[arg(default_value = "")]
        text: String,
    },
    /// Like an assistant message.
    Like { message: String },
    /// Dislike an assistant message.
    Dislike { message: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    let store = ChatStore::open(&config).context("opening local storage")?;
    store.hydrate();
    if let Err(e) = store.fetch_chats().await {
        tracing::warn!(error = %e, "using cached chat list");
    }

    match cli.command {
        Command::Chats => {
            for chat in store.chats() {
                println!("{}\t{}", chat.id, chat.name);
            }
        }
        Command::New { name } => {
            let chat = store.create_chat(&name).await?;
            println!("{}", chat.id);
        }
        Command::Rename { chat, name } => {
            store.rename_chat(&ChatId::from(chat.as_str()), &name).await?;
        }
        Command::Delete { chat } => {
            store.delete_chat(&ChatId::from(chat.as_str())).await?;
        }
        Command::History { chat } => {
            let chat_id = ChatId::from(chat.as_str());
            if let Err(e) = store.fetch_messages(&chat_id).await {
                eprintln!("showing cached messages: {e}");
            }
            let messages = store
                .chat(&chat_id)
                .and_then(|c| c.messages)
                .unwrap_or_default();
            for m in messages {
                let who = match m.role {
                    Role::User => "you",
                    Role::Assistant => "assistant",
                };
                if m.id.is_temporary() {
                    println!("[pending] {who}: {}", m.content);
                } else {
                    println!("[{}] {who}: {}", m.id, m.content);
                }
            }
        }
        Command::Send {
            chat,
            text,
            image,
            audio,
        } => {
            let mut attachments = Attachments::none();
            if let Some(path) = image {
                attachments = attachments.with_image(path);
            }
            if let Some(path) = audio {
                attachments = attachments.with_audio(path);
            }
            send(&store, &ChatId::from(chat.as_str()), &text, attachments).await?;
        }
        Command::Voice {
            chat,
            seconds,
            text,
        } => {
            let mut recorder = VoiceRecorder::new(
                CpalDevice::default(),
                |secs| eprint!("\rrecording {secs}s"),
                |clip| tracing::debug!(secs = clip.duration_secs(), "recording assembled"),
            );
            if !recorder.start_recording() {
                bail!("could not access the microphone");
            }
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            let clip = recorder.stop_recording().await;
            eprintln!();

            let Some(clip) = clip.filter(|c| !c.is_empty()) else {
                bail!("nothing was recorded");
            };
            let attachments = Attachments::none().with_audio(&clip);
            send(&store, &ChatId::from(chat.as_str()), &text, attachments).await?;
        }
        Command::Like { message } => {
            store.like_message(&MessageId::from(message.as_str())).await?;
        }
        Command::Dislike { message } => {
            store
                .dislike_message(&MessageId::from(message.as_str()))
                .await?;
        }
    }

    Ok(())
}

async fn send(
    store: &ChatStore,
    chat_id: &ChatId,
    text: &str,
    attachments: Attachments,
) -> anyhow::Result<()> {
    let printer = print_stream(store);
    let result = store.send_message(chat_id, text, attachments).await;
    let _ = printer.await;
    println!();

    let reply = result?;
    if let Some(name) = reply.chat_new_name {
        eprintln!("chat renamed to {name:?}");
    }
    Ok(())
}

/// Echo streamed fragments to stdout until the reply settles.
fn print_stream(store: &ChatStore) -> JoinHandle<()> {
    let mut rx = store.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(StoreEvent::StreamDelta { text, .. }) => {
                    print!("{text}");
                    let _ = std::io::stdout().flush();
                }
                Ok(StoreEvent::StreamFinished { .. } | StoreEvent::Failed { .. }) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    })
}
