use super::load_config;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct ShowConfigArgs {
    /// Config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Profile overlay (`config/Config.{profile}.toml`)
    #[arg(long)]
    pub profile: Option<String>,
}

/// Prints the configuration after defaults, files and `FEED_` variables are merged.
///
/// # Errors
/// Returns an error if a configuration source is invalid.
pub fn run_show_config(args: &ShowConfigArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), args.profile.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
