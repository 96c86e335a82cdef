//! chop: an interactive local EVM development environment.
//!
//! Load bytecode, shape a call, execute it against the embedded EVM and
//! walk the resulting synthetic chain, all from the keyboard. Sessions
//! persist as an append-only call log that is replayed on the next boot.
//!
//! ## Usage
//!
//! ```bash
//! # Persistent session at ~/.chop_state.json
//! chop
//!
//! # Fixed seed, throwaway session
//! chop --seed 0x0101...01 --memory
//! ```

mod app;
mod clipboard;
mod msg;
mod nav;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::App;
use chop_core::{config, persist, replay_state_file, Session};
use msg::{Cmd, Msg};

/// chop: interactive local EVM workbench
#[derive(Parser, Debug)]
#[command(name = "chop")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Account derivation seed, 0x + 64 hex chars. Random when omitted.
    #[arg(long)]
    seed: Option<String>,

    /// Path of the persisted call log (default: ~/.chop_state.json).
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Keep the session in memory only; nothing is persisted or replayed.
    #[arg(long)]
    memory: bool,

    /// Log file (default: ~/.chop/chop.log). The TUI owns the terminal,
    /// so logs never go to stdout.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.clone())?;

    // Bootstrap: config, session, replay. Failures here exit non-zero
    // before the terminal is touched.
    let config_path = config::config_path()?;
    let config = config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let seed = args.seed.as_deref().map(parse_seed).transpose()?;
    let state_path = if args.memory {
        None
    } else {
        Some(match args.state_file {
            Some(path) => path,
            None => persist::get_state_file_path()?,
        })
    };

    let mut session = Session::new(seed, config, state_path);
    let summary = replay_state_file(&mut session);
    info!(replayed = summary.replayed, "boot complete");

    let mut app = App::new(session);
    if summary.replayed > 0 {
        app.update(Msg::Feedback(format!(
            "replayed {} call(s) from the state file",
            summary.replayed
        )));
    }

    // Terminal setup with a panic hook for cleanup.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// The message loop: draw, receive one message, apply it, launch its
/// follow-up commands. All model mutation happens inside `app.update`.
async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Msg>();

    spawn_key_reader(tx.clone());

    // Prime the dashboard tick.
    app.tick_scheduled = true;
    run_cmd(Cmd::ScheduleTick, app.session.clone(), tx.clone());

    loop {
        terminal.draw(|frame| {
            let session = app.session();
            ui::render(frame, app, &session);
        })?;

        let Some(message) = rx.recv().await else {
            return Ok(());
        };
        let cmds = app.update(message);
        for cmd in cmds {
            run_cmd(cmd, app.session.clone(), tx.clone());
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Dedicated thread feeding keyboard events into the message channel.
fn spawn_key_reader(tx: mpsc::UnboundedSender<Msg>) {
    std::thread::spawn(move || loop {
        match event::poll(Duration::from_millis(200)) {
            Ok(true) => {
                if let Ok(Event::Key(key)) = event::read() {
                    if key.kind == KeyEventKind::Press && tx.send(Msg::Key(key)).is_err() {
                        return;
                    }
                }
            }
            Ok(false) => {
                if tx.is_closed() {
                    return;
                }
            }
            Err(_) => return,
        }
    });
}

fn lock_session(session: &Arc<Mutex<Session>>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// Executes one command. Each produces exactly one message back into the
/// loop; heavier work runs on the blocking pool.
fn run_cmd(cmd: Cmd, session: Arc<Mutex<Session>>, tx: mpsc::UnboundedSender<Msg>) {
    match cmd {
        Cmd::Execute(params) => {
            tokio::task::spawn_blocking(move || {
                let outcome = lock_session(&session).execute(&params);
                let _ = tx.send(Msg::CallCompleted(Box::new(outcome)));
            });
        }
        Cmd::Disassemble(address) => {
            tokio::task::spawn_blocking(move || {
                let code = {
                    let guard = lock_session(&session);
                    match guard.registry.get(address) {
                        Some(contract) => contract.bytecode.clone(),
                        None => guard.inspector().get_code(address),
                    }
                };
                let result = if code.is_empty() {
                    Err(format!("no code at {address:?}"))
                } else {
                    Ok(Box::new(chop_core::disassemble(code.as_slice())))
                };
                let _ = tx.send(Msg::DisassemblyReady { address, result });
            });
        }
        Cmd::Reset => {
            tokio::task::spawn_blocking(move || {
                let warning = lock_session(&session).reset();
                let _ = tx.send(Msg::ResetDone { warning });
            });
        }
        Cmd::ScheduleTick => {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                let _ = tx.send(Msg::Tick);
            });
        }
        Cmd::Copy(text) => {
            let feedback = match clipboard::copy(&text) {
                Ok(()) => format!("copied {}", ui::widgets::truncate_id(&text)),
                Err(err) => format!("clipboard unavailable: {err}"),
            };
            let _ = tx.send(Msg::Feedback(feedback));
        }
        Cmd::SaveConfig => {
            tokio::task::spawn_blocking(move || {
                let outcome = config::config_path().and_then(|path| {
                    let snapshot = lock_session(&session).config.clone();
                    config::save(&path, &snapshot).map(|()| path)
                });
                let feedback = match outcome {
                    Ok(path) => format!("config saved to {}", path.display()),
                    Err(err) => format!("config save failed: {err}"),
                };
                let _ = tx.send(Msg::Feedback(feedback));
            });
        }
        Cmd::SaveFixture(fixture) => {
            tokio::task::spawn_blocking(move || {
                let outcome = chop_core::fixtures::fixtures_dir()
                    .and_then(|dir| chop_core::fixtures::save(&dir, &fixture));
                let feedback = match outcome {
                    Ok(path) => format!("fixture saved to {}", path.display()),
                    Err(err) => format!("fixture save failed: {err}"),
                };
                let _ = tx.send(Msg::Feedback(feedback));
            });
        }
    }
}

/// Parses a 0x-prefixed 32-byte seed.
fn parse_seed(input: &str) -> Result<[u8; 32]> {
    let rest = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    let raw = hex::decode(rest).map_err(|_| anyhow!("seed is not hex: {input}"))?;
    let bytes: [u8; 32] = raw
        .try_into()
        .map_err(|_| anyhow!("seed must be exactly 32 bytes"))?;
    Ok(bytes)
}

/// File-backed tracing so the alternate screen stays clean. `CHOP_LOG`
/// selects the filter, default info.
fn init_tracing(log_file: Option<PathBuf>) -> Result<()> {
    let path = match log_file {
        Some(path) => path,
        None => dirs::home_dir()
            .ok_or_else(|| anyhow!("home directory not found"))?
            .join(".chop")
            .join("chop.log"),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;

    let filter = EnvFilter::try_from_env("CHOP_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
