//! `CareChat`: line-oriented client for the clinical messaging core.
//!
//! Connects to a `carechat-server` when a base URL, token and participant id
//! are configured, otherwise runs against an in-process demo backend.
//!
//! ```bash
//! # Offline demo mode
//! cargo run --bin carechat
//!
//! # Connect to a server
//! cargo run --bin carechat -- --base-url http://127.0.0.1:8080 \
//!     --token tok-p1 --participant p-1
//! ```
//!
//! Commands: `/list`, `/open <participant-id>`, `/seen`, `/refresh`,
//! `/hide`, `/show`, `/quit`. Any other line is sent to the open
//! conversation.

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;

use carechat::api::{ApiError, ChatApi};
use carechat::api::http::HttpApi;
use carechat::api::memory::{InMemoryApi, InMemoryBackend};
use carechat::config::{CliArgs, ClientConfig};
use carechat::render;
use carechat::sync::conversation_list::ConversationListView;
use carechat::sync::conversation_view::{ConversationTarget, ConversationView};
use carechat::sync::notice::{self, Notice, Scope};
use carechat::sync::visibility::{Visibility, VisibilitySource};
use carechat_proto::participant::{ParticipantId, ParticipantRef};

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file; stdout belongs to the prompt.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!("carechat starting");

    let result = if let Some(connection) = config.connection() {
        match HttpApi::new(&connection.base_url, connection.token) {
            Ok(api) => {
                println!("Connected to {} as {}", api.base_url(), connection.participant_id);
                run(Arc::new(api), connection.participant_id, &config).await
            }
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    } else {
        println!("No server configured, using the demo backend.");
        let (api, me) = demo_backend();
        run(Arc::new(api), me, &config).await
    };

    tracing::info!("carechat exiting");
    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("carechat.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// A patient with two doctors to talk to.
fn demo_backend() -> (InMemoryApi, ParticipantId) {
    let backend = InMemoryBackend::new();
    let me = ParticipantRef::Patient(ParticipantId::new("demo-patient"));
    backend.add_participant(&me, "Demo Patient", Some("HID-0001".into()));
    backend.add_participant(
        &ParticipantRef::Doctor(ParticipantId::new("dr-lee")),
        "Dr. Lee",
        Some("Cardiology".into()),
    );
    backend.add_participant(
        &ParticipantRef::Doctor(ParticipantId::new("dr-patel")),
        "Dr. Patel",
        Some("Dermatology".into()),
    );
    println!("Try `/open dr-lee` or `/open dr-patel`.");
    let id = me.id().clone();
    (InMemoryApi::new(backend, me), id)
}

/// Command loop shared by the HTTP and demo backends.
async fn run<A: ChatApi + 'static>(
    api: Arc<A>,
    me: ParticipantId,
    config: &ClientConfig,
) -> io::Result<()> {
    let visibility = VisibilitySource::default();
    let (notifier, mut notices) = notice::channel(config.sync.notice_buffer);
    let list = ConversationListView::mount(
        Arc::clone(&api),
        config.sync.list_interval,
        &visibility,
        notifier.clone(),
    );
    let mut open: Option<(Arc<ConversationView<A>>, String)> = None;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                match line {
                    "" => {}
                    "/quit" => break,
                    "/list" => {
                        for row in list.rows() {
                            println!("  {}", render::format_summary(&row, &config.timestamp_format));
                        }
                        println!("  {} unread", list.total_unread());
                    }
                    "/hide" | "/show" => {
                        let wanted = if line == "/hide" { Visibility::Hidden } else { Visibility::Visible };
                        if !visibility.set(wanted) {
                            println!("Already {:?}.", visibility.current());
                        } else if visibility.current() == Visibility::Hidden {
                            println!("Polling paused.");
                        } else {
                            println!("Polling resumed.");
                        }
                    }
                    "/refresh" => {
                        let _ = list.refresh().await;
                        if let Some((view, _)) = &open {
                            let _ = view.refresh().await;
                        }
                    }
                    "/seen" => match &open {
                        Some((view, _)) => match view.mark_seen().await {
                            Ok(n) => println!("Marked {n} message(s) as seen."),
                            Err(e) => println!("Error: {e}"),
                        },
                        None => println!("No conversation open."),
                    },
                    _ if line.starts_with("/open ") => {
                        let other = ParticipantId::new(line.trim_start_matches("/open ").trim());
                        match list.open(&other).await {
                            Ok(conversation_id) => {
                                let name = list
                                    .rows()
                                    .into_iter()
                                    .find(|r| r.conversation_id == conversation_id)
                                    .map_or_else(|| other.to_string(), |r| r.other_participant.name);
                                println!("Opened conversation with {name}.");
                                let target = ConversationTarget {
                                    conversation_id,
                                    me: me.clone(),
                                    other,
                                };
                                // Dropping the previous view stops its poller.
                                open = Some((
                                    Arc::new(ConversationView::mount(
                                        Arc::clone(&api),
                                        target,
                                        config.sync.message_interval,
                                        &visibility,
                                        notifier.clone(),
                                    )),
                                    name,
                                ));
                            }
                            Err(e) => println!("Error: {e}"),
                        }
                    }
                    _ if line.starts_with('/') => println!("Unknown command: {line}"),
                    body => match &open {
                        Some((view, _)) => {
                            // Off the input loop, so the pending entry prints
                            // before the server answers.
                            let view = Arc::clone(view);
                            let body = body.to_string();
                            tokio::spawn(async move {
                                // Other failures arrive as `SendFailed` notices.
                                if let Err(ApiError::Validation(reason)) = view.send(&body).await {
                                    println!("Not sent: {reason}");
                                }
                            });
                        }
                        None => println!("Open a conversation first: /open <participant-id>"),
                    },
                }
            }
            Some(notice) = notices.recv() => {
                print_notice(&notice, open.as_ref(), &me, &config.timestamp_format);
            }
        }
    }
    Ok(())
}

fn print_notice<A: ChatApi + 'static>(
    notice: &Notice,
    open: Option<&(Arc<ConversationView<A>>, String)>,
    me: &ParticipantId,
    format: &str,
) {
    match notice {
        Notice::Updated(Scope::Messages(id)) => {
            let Some((view, name)) = open.filter(|(v, _)| &v.target().conversation_id == id) else {
                return;
            };
            println!("--- {name} ---");
            for entry in view.entries() {
                println!("{}", render::format_entry(&entry, me, name, format));
            }
        }
        Notice::Updated(Scope::Conversations) => {}
        Notice::FetchFailed { scope, error } => {
            tracing::debug!(?scope, "fetch failure shown");
            println!("(sync failed: {error}; retrying)");
        }
        Notice::SendFailed { error, .. } => println!("(send failed: {error})"),
        Notice::MarkSeenFailed { error, .. } => println!("(mark seen failed: {error})"),
    }
}
