mod replay;
mod show_config;
mod watch;

pub use replay::{run_replay, ReplayArgs};
pub use show_config::{run_show_config, ShowConfigArgs};
pub use watch::{run_watch, WatchArgs};

use anyhow::Result;
use casino_feed_core::{AppConfig, ConfigLoader};

/// Explicit file first, then a profile overlay, then the default layering.
fn load_config(path: Option<&str>, profile: Option<&str>) -> Result<AppConfig> {
    match (path, profile) {
        (Some(path), _) => ConfigLoader::load_from(path),
        (None, Some(profile)) => ConfigLoader::load_with_profile(profile),
        (None, None) => ConfigLoader::load(),
    }
}
