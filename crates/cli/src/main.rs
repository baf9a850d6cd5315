use clap::{Parser, Subcommand};

mod commands;
mod display;

use commands::{ReplayArgs, ShowConfigArgs, WatchArgs};

#[derive(Parser)]
#[command(name = "casino-feed")]
#[command(
    about = "Live Aviator, Spaceman and Roulette feeds with rolling statistics",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a live feed and print a summary on every change
    Watch(WatchArgs),
    /// Feed a recorded JSON-lines capture through a session offline
    Replay(ReplayArgs),
    /// Print the merged configuration
    ShowConfig(ShowConfigArgs),
}

impl Commands {
    fn log_file(&self) -> Option<&str> {
        match self {
            Self::Watch(args) => args.log_file.as_deref(),
            Self::Replay(_) | Self::ShowConfig(_) => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    if let Some(path) = cli.command.log_file() {
        // Keep stdout clean for the summaries
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Watch(args) => commands::run_watch(args).await?,
        Commands::Replay(args) => commands::run_replay(&args)?,
        Commands::ShowConfig(args) => commands::run_show_config(&args)?,
    }

    Ok(())
}
