//! notesync — team awareness TUI over a replicated note store.
//!
//! Entry point for the `notesync` binary. Wires together the terminal
//! lifecycle (`tui`), unified event bus (`event`), panel UI (`ui`), theme
//! system (`theme`), the replica-watcher thread (`sync`), and the shared
//! WAL-mode SQLite replica (`notesync-core`).
//!
//! The replica file is written by the external sync process; this binary
//! only observes it (and writes the local read ledger). Every poll the
//! watcher reports the note listing and any revision changes, which drive
//! the unread markers and the activity feed; opening a file computes the
//! last-seen → current diff and relocates the file's annotations.
//!
//! # Startup sequence (order matters)
//!
//! 1. Load config and theme — read-only, safe before terminal init.
//! 2. Initialise file logging — the terminal belongs to ratatui, so
//!    `tracing` writes to `notesync.log` next to the replica.
//! 3. `install_panic_hook()` — installed before the terminal is touched so
//!    a panic always restores it before the message prints.
//! 4. `register_sigterm()` — returns `Arc<AtomicBool>` polled in the loop.
//! 5. `init_tui()` — enters alternate screen and enables raw mode.
//! 6. Event channel + background event task.
//! 7. `open_db()` + stores + watcher thread + initial poll — all before the
//!    first frame so the files panel has data immediately.
//!
//! # Safety
//!
//! `restore_tui()` is called after the event loop exits (normal quit, `q`,
//! SIGTERM, or channel close). The loop exits only via `break`, never `?`,
//! so the restore is always reached; the panic hook covers the panic path.

mod app;
mod event;
mod sync;
mod theme;
mod tui;
mod ui;

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use crossbeam_channel::Sender;
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;

use notesync_core::annotations::AnnotationStore;
use notesync_core::db::{self, SqliteDocStore};
use notesync_core::readstate::ReadStateStore;
use notesync_core::store::DocumentStore;

use crate::event::AppEvent;
use crate::sync::types::{SyncRequest, SyncUpdate};
use crate::ui::keybindings::KeyAction;

/// User configuration from `config.toml`. Every field has a default so a
/// missing or partial file still starts the app.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    /// The local user's directory username — the identity the tracker uses
    /// to tell own edits from everyone else's.
    username: String,
    /// Theme name resolved via `Theme::from_name`.
    theme: String,
    /// Path to the replicated SQLite database.
    replica: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            username: "local".to_owned(),
            theme: "catppuccin-mocha".to_owned(),
            replica: ".notesync/replica.db".to_owned(),
        }
    }
}

/// Returns the path to the notesync config file.
///
/// Prefers `$XDG_CONFIG_HOME/notesync/config.toml`; falls back to
/// `~/.config/notesync/config.toml` when the env var is absent.
fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("notesync").join("config.toml")
}

/// Loads the config, falling back to defaults on any problem.
///
/// Config errors are soft failures printed to stderr — this runs before the
/// terminal is initialised, so eprintln is still visible. A typo in the
/// file must never prevent startup.
fn load_config() -> Config {
    let path = config_path();
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => return Config::default(),
    };
    match toml::from_str(&raw) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("notesync: config parse error in {path:?}: {e}");
            Config::default()
        }
    }
}

/// Initialises file logging next to the replica.
///
/// Returns the non-blocking writer guard — it must stay alive for the whole
/// run or buffered log lines are lost on exit.
fn init_logging(dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    let appender = tracing_appender::rolling::never(dir, "notesync.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    guard
}

/// Requests the selected file's diff from the watcher and spawns the
/// annotation relocation refresh.
///
/// The two requests race independently; `AppState` drops whichever replies
/// arrive after the user has moved on to another file.
fn open_selected(
    state: &app::AppState,
    sync_tx: &Sender<SyncRequest>,
    docs: &SqliteDocStore,
    tx: &UnboundedSender<AppEvent>,
) {
    let Some(entry) = state.selected_file() else { return };
    let path = entry.path.clone();

    let _ = sync_tx.send(SyncRequest::LoadDiff { path: path.clone() });

    let docs = docs.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let text = match docs.fetch(&path, None).await {
            Ok(Some(doc)) => doc.body,
            Ok(None) => String::new(),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "could not load file for annotation refresh");
                String::new()
            }
        };
        let annotations = AnnotationStore::new(docs);
        let notes = match annotations.refresh_for_file(&path, &text).await {
            Ok(notes) => notes,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "annotation refresh failed");
                Vec::new()
            }
        };
        let _ = tx.send(AppEvent::Notes { path, notes });
    });
}

/// Marks the selected file read: advisory state immediately, the durable
/// ledger via a spawned write whose completion comes back as an event.
fn mark_selected_read(
    state: &mut app::AppState,
    reads: &ReadStateStore,
    tx: &UnboundedSender<AppEvent>,
) {
    let (path, rev) = {
        let Some(entry) = state.selected_file() else { return };
        (entry.path.clone(), entry.rev.clone())
    };
    state.mark_read_locally(&path);

    let reads = reads.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let ok = match reads.mark_as_read(&path, &rev).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "read-ledger write failed");
                false
            }
        };
        let _ = tx.send(AppEvent::MarkedRead { path, ok });
    });
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Step 1: config and theme — read-only, safe before terminal init.
    let config = load_config();
    let theme = theme::Theme::from_name(&config.theme);

    // Step 2: data directory + file logging.
    let replica_dir = Path::new(&config.replica)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    std::fs::create_dir_all(&replica_dir)?;
    let _log_guard = init_logging(&replica_dir);
    tracing::info!(replica = %config.replica, username = %config.username, "starting");

    // Step 3: panic hook installed before the terminal is touched.
    tui::install_panic_hook();

    // Step 4: SIGTERM flag — polled in the 50ms heartbeat arm below.
    let term_flag = tui::register_sigterm();

    // Step 5: enter alternate screen and raw mode.
    let mut terminal = tui::init_tui()?;

    // Step 6: event channel and the background event task.
    let handler = event::EventHandler::new();
    event::spawn_event_task(handler.tx.clone());
    let tx = handler.tx;
    let mut rx = handler.rx;

    // Step 7: open the replica before the first frame, then start the
    // watcher thread and prime it with one poll so the files panel has
    // data immediately.
    let conn = db::open_db(&config.replica)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let doc_store = SqliteDocStore::new(conn.clone());
    let read_store = ReadStateStore::new(conn);

    let (sync_tx, sync_rx) = crossbeam_channel::unbounded();
    {
        let event_tx = tx.clone();
        let replica = config.replica.clone();
        std::thread::spawn(move || sync::worker::sync_worker_loop(replica, sync_rx, event_tx));
    }
    let _ = sync_tx.send(SyncRequest::Poll);

    let mut state = app::AppState::new(config.username.clone());

    // Event loop — exits only via `break`, never via `?` (draw errors
    // propagate out of the loop and still reach restore_tui below).
    'event_loop: loop {
        tokio::select! {
            // Heartbeat: guarantees SIGTERM is checked at least every 50ms,
            // even when no events arrive.
            _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(AppEvent::Render) => {
                        // Exactly one draw() call per Render event.
                        terminal.draw(|frame| ui::render(frame, &mut state, &theme))?;
                    }
                    Some(AppEvent::Tick) => {
                        let _ = sync_tx.send(SyncRequest::Poll);
                    }
                    Some(AppEvent::Key(key)) => {
                        match ui::keybindings::handle_key(key, &mut state) {
                            KeyAction::Quit => break 'event_loop,
                            KeyAction::OpenSelected => {
                                open_selected(&state, &sync_tx, &doc_store, &tx);
                            }
                            KeyAction::MarkSelectedRead => {
                                mark_selected_read(&mut state, &read_store, &tx);
                            }
                            KeyAction::Continue => {}
                        }
                    }
                    Some(AppEvent::Mouse(mouse)) => {
                        let _ = ui::keybindings::handle_mouse(mouse, &mut state);
                    }
                    Some(AppEvent::Sync(update)) => match *update {
                        SyncUpdate::Poll(payload) => state.apply_poll(payload),
                        SyncUpdate::Diff(diff) => state.apply_diff(*diff),
                    },
                    Some(AppEvent::Notes { path, notes }) => {
                        state.apply_notes(path, notes);
                    }
                    Some(AppEvent::MarkedRead { path, ok }) => {
                        if !ok {
                            tracing::warn!(path = %path, "mark-as-read did not persist");
                        }
                    }
                    Some(AppEvent::Resize(_, _)) => {
                        // Handled automatically by ratatui on the next
                        // Render: frame.area() returns the new size.
                    }
                    Some(AppEvent::Quit) | None => break 'event_loop,
                    _ => {}
                }
                // Check SIGTERM after every event too, so quit latency is at
                // most one event cycle rather than 50ms.
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
        }
    }

    // Restore the terminal at the single exit point of the loop.
    tui::restore_tui()?;
    Ok(())
}
