use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use strata_core::options::{DynamicOptions, FixedOptions};

/// Full session configuration as persisted on disk.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    pub fixed: FixedOptions,
    pub dynamic: DynamicOptions,
    /// Whether the first-run hints have been dismissed.
    #[serde(default)]
    pub onboarding_dismissed: bool,
}

impl ScanConfig {
    pub fn load(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).context("Invalid scan config")
    }
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a full default ScanConfig as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = ScanConfig::default();
    let toml_str = toml::to_string_pretty(&config)?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
