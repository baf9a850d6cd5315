use super::load_config;
use crate::display::summary_line;
use anyhow::{bail, Result};
use casino_feed_core::{BookmakerId, GameType};
use casino_feed_orchestrator::FeedContext;
use casino_feed_stream::{AuthToken, ConnectionState, NoticeLevel, WebSocketTransport};
use clap::Args;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Game to watch (aviator, spaceman, roulette)
    #[arg(short, long)]
    pub game: GameType,

    /// Bookmaker to subscribe to
    #[arg(short, long)]
    pub bookmaker: u32,

    /// Roulette only: also stream forecasts computed over this many recent spins
    #[arg(long, value_name = "SPINS")]
    pub prediction_window: Option<u32>,

    /// Access token for the feed server
    #[arg(long, env = "FEED_AUTH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<String>,
}

/// Connects, subscribes and prints a summary line on every view change until Ctrl+C.
///
/// # Errors
/// Returns an error if the config is invalid, no token is available, or the
/// connection fails permanently.
pub async fn run_watch(args: WatchArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), None)?;
    let token = args.token.map(AuthToken::new);
    let transport = Arc::new(WebSocketTransport::new(&config.stream));

    let handle = FeedContext::spawn(args.game, token, &config, transport)?;
    let bookmaker_id = BookmakerId(args.bookmaker);
    handle.subscribe(bookmaker_id).await;
    if args.game == GameType::Roulette {
        if let Some(window) = args.prediction_window {
            handle.subscribe_prediction(window).await;
        }
    } else if args.prediction_window.is_some() {
        warn!(game = %args.game, "Prediction window only applies to roulette, ignoring it");
    }
    info!(
        game = %args.game,
        %bookmaker_id,
        base_url = %config.stream.base_url,
        "Watching feed"
    );

    let mut views = handle.watch_view();
    let mut notices = handle.notices();
    let mut connection = handle.watch_connection();
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            _ = &mut interrupt => {
                info!("Interrupted, disconnecting");
                break;
            }
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                if let Some(view) = view {
                    println!("{}", summary_line(&view, &handle.connection_state()));
                }
            }
            changed = notices.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(notice) = notices.borrow_and_update().clone() {
                    let tag = match notice.level {
                        NoticeLevel::Info => "info",
                        NoticeLevel::Warning => "warning",
                        NoticeLevel::Error => "error",
                    };
                    eprintln!("[{tag}] {}", notice.message);
                }
            }
            changed = connection.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = connection.borrow_and_update().clone();
                if let ConnectionState::Failed { reason } = state {
                    handle.disconnect().await;
                    bail!("Feed connection failed: {reason}");
                }
            }
        }
    }

    handle.disconnect().await;
    Ok(())
}
