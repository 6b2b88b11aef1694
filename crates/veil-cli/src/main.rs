mod cmd_categories;
mod cmd_config;
mod cmd_probe;
mod cmd_scan;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "veil", version, about = "Classify feed items and report the ones to hide")]
struct Cli {
    /// Config file (default: <config dir>/veil/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the change feed in FILE (JSONL, stdin if omitted) through the classifier
    Scan {
        /// Change-feed file, one batch or node per line
        file: Option<PathBuf>,
        /// Categories to hide besides SPONSORED, e.g. "PROMOTION|TRENDING"
        #[arg(long)]
        hide: Option<String>,
        /// Print hidden items as JSON objects
        #[arg(long)]
        json: bool,
    },
    /// Print the obfuscated digest a feed would publish for an item and category
    Probe {
        /// Item identifier (post id)
        #[arg(long)]
        item: String,
        /// Category label, e.g. PROMOTION
        #[arg(long)]
        category: String,
    },
    /// Recover the category behind an obfuscated digest
    Resolve {
        /// Item identifier (post id)
        #[arg(long)]
        item: String,
        /// Observed digest (lowercase hex)
        #[arg(long)]
        digest: String,
    },
    /// List known categories
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or edit the config file
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("VEIL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("veil")
        .join("config.json")
}

/// The default path is optional; an explicit `--config` must exist unless the
/// command is about to create it.
fn config_path(explicit: Option<PathBuf>, creates: bool) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) if !creates && !path.exists() => {
            anyhow::bail!("config file not found: {}", path.display())
        }
        Some(path) => Ok(path),
        None => Ok(default_config_path()),
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let creates = matches!(
        cli.cmd,
        Command::Config {
            cmd: cmd_config::ConfigCmd::Set { .. }
        }
    );
    let config_path = config_path(cli.config, creates)?;

    match cli.cmd {
        Command::Scan { file, hide, json } => {
            cmd_scan::execute(&config_path, file.as_deref(), hide.as_deref(), json)
        }
        Command::Probe { item, category } => cmd_probe::probe(&config_path, &item, &category),
        Command::Resolve { item, digest } => cmd_probe::resolve(&config_path, &item, &digest),
        Command::Categories { json } => cmd_categories::execute(&config_path, json),
        Command::Config { cmd } => cmd_config::run(cmd, &config_path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("typo.json");
        assert!(config_path(Some(missing.clone()), false).is_err());
        assert_eq!(config_path(Some(missing.clone()), true).unwrap(), missing);

        let present = dir.path().join("config.json");
        std::fs::write(&present, "{}").unwrap();
        assert_eq!(config_path(Some(present.clone()), false).unwrap(), present);
    }

    #[test]
    fn default_config_may_be_absent() {
        let path = config_path(None, false).unwrap();
        assert!(path.ends_with("veil/config.json"));
    }
}
