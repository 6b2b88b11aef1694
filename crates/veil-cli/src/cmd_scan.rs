use anyhow::Context;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use veil_core::config::{VeilConfig, HIDE_ENV};
use veil_core::dispatch::Suppressor;
use veil_core::feed::ChangeBatch;
use veil_core::hash::Sha256Digest;
use veil_core::pipeline::Outcome;
use veil_core::session::Session;
use veil_core::{CategoryLabel, NodeHandle};

/// Prints each hidden handle to stdout as soon as it is decided.
struct StdoutSuppressor {
    json: bool,
}

impl Suppressor for StdoutSuppressor {
    fn suppress(&self, handle: &NodeHandle, label: &CategoryLabel) {
        if self.json {
            println!(
                "{}",
                serde_json::json!({"handle": handle, "category": label})
            );
        } else {
            println!("{handle}");
        }
    }
}

/// Tally of outcomes for the end-of-scan summary.
#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    hidden: usize,
    shown: usize,
    unresolved: usize,
    skipped: usize,
}

impl Summary {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Dispatched { hidden: true, .. } => self.hidden += 1,
            Outcome::Dispatched { hidden: false, .. } => self.shown += 1,
            Outcome::Unresolved => self.unresolved += 1,
            Outcome::AlreadyProcessed | Outcome::NotApplicable => self.skipped += 1,
        }
    }
}

/// `veil scan [FILE]`
pub fn execute(
    config_path: &Path,
    file: Option<&Path>,
    hide: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let config = effective_config(
        config_path,
        std::env::var(HIDE_ENV).ok(),
        hide.map(str::to_string),
    )?;

    let reader: Box<dyn BufRead> = match file {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path).with_context(|| format!("open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let rt = tokio::runtime::Runtime::new()?;
    let summary = rt.block_on(scan(&config, reader, json))?;
    tracing::info!(
        hidden = summary.hidden,
        shown = summary.shown,
        unresolved = summary.unresolved,
        skipped = summary.skipped,
        "scan complete"
    );
    Ok(())
}

/// File, then `VEIL_HIDE`, then `--hide`.
fn effective_config(
    config_path: &Path,
    env_hide: Option<String>,
    flag_hide: Option<String>,
) -> anyhow::Result<VeilConfig> {
    Ok(VeilConfig::load_or_default(config_path)?
        .with_hide_override(env_hide)
        .with_hide_override(flag_hide))
}

async fn scan(config: &VeilConfig, reader: Box<dyn BufRead>, json: bool) -> anyhow::Result<Summary> {
    let mut session = Session::new(
        config,
        Arc::new(Sha256Digest),
        Arc::new(StdoutSuppressor { json }),
    )?;
    let mut summary = Summary::default();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.context("read change feed")?;
        if line.trim().is_empty() {
            continue;
        }
        match ChangeBatch::parse(&line) {
            Ok(batch) => {
                session.apply(batch);
            }
            Err(e) => tracing::warn!(line = lineno + 1, error = %e, "skipping malformed feed line"),
        }
        // Settle each batch before reading the next so repeats see its processed handles.
        for (_, outcome) in session.drain().await {
            summary.record(&outcome);
        }
    }

    session.close();
    for (_, outcome) in session.drain().await {
        summary.record(&outcome);
    }
    let memo = session.pipeline().resolver().stats();
    tracing::debug!(
        item_digests = memo.item_digests,
        probe_digests = memo.probe_digests,
        resolved = memo.resolved,
        "resolver memo tables"
    );
    Ok(summary)
}
