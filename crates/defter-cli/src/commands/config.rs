//! Configuration management command.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;

use defter_core::DefterConfig;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Where to write the file
        #[arg(default_value = "defter.json")]
        path: PathBuf,
    },

    /// Print the effective configuration
    Show,
}

pub fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    match args.action {
        ConfigAction::Init { path } => {
            if path.exists() {
                anyhow::bail!("Refusing to overwrite existing file: {}", path.display());
            }
            DefterConfig::default().save(&path)?;
            println!(
                "{} Default configuration written to {}",
                style("✓").green(),
                path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = super::load_config(config_path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
