use super::load_config;
use anyhow::{Context, Result};
use casino_feed_core::{AppConfig, BookmakerId, GameType, Scope, ServerEvent};
use casino_feed_ingest::{FeedSession, FeedView};
use clap::Args;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Game the capture was recorded from
    #[arg(short, long)]
    pub game: GameType,

    /// Bookmaker the session is scoped to
    #[arg(short, long)]
    pub bookmaker: u32,

    /// JSON-lines capture, one `{"event": ..., "data": ...}` object per line
    #[arg(short, long)]
    pub file: String,

    /// Config file path
    #[arg(short, long)]
    pub config: Option<String>,
}

/// Replays a recorded capture through an offline session and prints the final view.
///
/// # Errors
/// Returns an error if the config or the capture file cannot be read.
pub fn run_replay(args: &ReplayArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), None)?;
    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open capture {}", args.file))?;
    let scope = Scope::new(args.game, BookmakerId(args.bookmaker));

    let view = replay(BufReader::new(file), scope, &config)?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

/// Applies every event in `reader` to a fresh session for `scope`.
///
/// Blank lines are skipped; lines that are not a valid event are logged and skipped.
pub fn replay(reader: impl BufRead, scope: Scope, config: &AppConfig) -> Result<FeedView> {
    let mut session = FeedSession::new(scope, config);
    let mut applied = 0_usize;
    let mut skipped = 0_usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", index + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ServerEvent>(&line) {
            Ok(event) => {
                session.apply(&event);
                applied += 1;
            }
            Err(e) => {
                warn!(line = index + 1, error = %e, "Skipping malformed capture line");
                skipped += 1;
            }
        }
    }

    info!(%scope, applied, skipped, rounds = session.history().len(), "Replay finished");
    Ok(session.view())
}
