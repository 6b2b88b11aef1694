use anyhow::Context;
use clap::Subcommand;
use std::io::Write;
use std::path::Path;
use veil_core::config::VeilConfig;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (hide, props_prefix)
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// Print the effective configuration (file, then VEIL_HIDE) as JSON
    Show,
}

const SETTABLE_KEYS: &[&str] = &["hide", "props_prefix"];

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, path: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value } => set(path, &key, &value),
        ConfigCmd::Get { key } => get(path, &key),
        ConfigCmd::Show => show(path),
    }
}

// ── Command Implementations ──

/// Read the config file as a JSON map. Returns empty map if file doesn't exist.
/// Anything other than a JSON object is an error so `set` never clobbers it.
fn read_config(path: &Path) -> anyhow::Result<serde_json::Map<String, serde_json::Value>> {
    if !path.exists() {
        return Ok(serde_json::Map::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    let val: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("parse {}", path.display()))?;
    match val {
        serde_json::Value::Object(map) => Ok(map),
        _ => anyhow::bail!("config {} is not a JSON object", path.display()),
    }
}

/// Write the config file atomically, creating its directory if needed.
fn write_config(
    path: &Path,
    config: &serde_json::Map<String, serde_json::Value>,
) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&config)?;
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(json.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// `veil config set <key> <value>`
pub fn set(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    if !SETTABLE_KEYS.contains(&key) {
        anyhow::bail!(
            "Unknown config key: {key}. Settable keys: {}",
            SETTABLE_KEYS.join(", ")
        );
    }
    let mut config = read_config(path)?;
    config.insert(key.to_string(), serde_json::Value::String(value.to_string()));
    // Reject edits that would leave an unloadable file.
    let parsed: VeilConfig = serde_json::from_value(serde_json::Value::Object(config.clone()))?;
    parsed.catalog()?;
    write_config(path, &config)?;
    println!("{key} = {value}");
    Ok(())
}

/// `veil config get <key>`
pub fn get(path: &Path, key: &str) -> anyhow::Result<()> {
    let config = read_config(path)?;
    match config.get(key) {
        Some(val) => println!("{val}"),
        None => println!("(not set)"),
    }
    Ok(())
}

/// `veil config show`
pub fn show(path: &Path) -> anyhow::Result<()> {
    let config = VeilConfig::load_or_default(path)?.with_env();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_creates_file_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("veil").join("config.json");
        set(&path, "hide", "PROMOTION|TRENDING").unwrap();

        let loaded = VeilConfig::load(&path).unwrap();
        assert_eq!(loaded.hide, "PROMOTION|TRENDING");
        assert_eq!(loaded.props_prefix, "__reactProps");
    }

    #[test]
    fn set_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"categories":[{"label":"ORGANIC","id":1}]}"#).unwrap();
        set(&path, "props_prefix", "__props").unwrap();

        let loaded = VeilConfig::load(&path).unwrap();
        assert_eq!(loaded.props_prefix, "__props");
        assert_eq!(loaded.catalog().unwrap().len(), 1);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert!(set(&path, "colour", "blue").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn set_refuses_to_write_over_broken_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let broken = r#"{"categories":[]}"#;
        std::fs::write(&path, broken).unwrap();
        assert!(set(&path, "hide", "X").is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), broken);
    }

    #[test]
    fn set_refuses_to_overwrite_non_object_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let err = set(&path, "hide", "X").unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1, 2]");
    }
}
