use crate::category::{CatalogError, CategoryCatalog, CategoryEntry};
use crate::dispatch::HideList;
use crate::extract::DEFAULT_PROPS_PREFIX;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the configured hide list.
pub const HIDE_ENV: &str = "VEIL_HIDE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Runtime configuration, stored as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VeilConfig {
    /// `|`-separated categories to hide besides `SPONSORED`.
    #[serde(default)]
    pub hide: String,
    /// Replaces the built-in catalog when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<CategoryEntry>>,
    #[serde(default = "default_props_prefix")]
    pub props_prefix: String,
}

fn default_props_prefix() -> String {
    DEFAULT_PROPS_PREFIX.to_string()
}

impl Default for VeilConfig {
    fn default() -> Self {
        Self {
            hide: String::new(),
            categories: None,
            props_prefix: default_props_prefix(),
        }
    }
}

impl VeilConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if it exists, otherwise return defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Apply `VEIL_HIDE` when it is set.
    pub fn with_env(self) -> Self {
        self.with_hide_override(std::env::var(HIDE_ENV).ok())
    }

    /// Replace the hide list when `hide` is `Some`.
    pub fn with_hide_override(mut self, hide: Option<String>) -> Self {
        if let Some(hide) = hide {
            self.hide = hide;
        }
        self
    }

    pub fn catalog(&self) -> Result<CategoryCatalog, ConfigError> {
        match &self.categories {
            Some(entries) => Ok(CategoryCatalog::from_entries(entries.clone())?),
            None => Ok(CategoryCatalog::builtin()),
        }
    }

    pub fn hide_list(&self) -> HideList {
        HideList::parse(&self.hide)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryId, CategoryLabel};

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = VeilConfig::load_or_default(&dir.path().join("config.json")).unwrap();
        assert_eq!(cfg, VeilConfig::default());
        assert_eq!(cfg.props_prefix, "__reactProps");
        assert!(cfg.hide_list().is_empty());
        assert_eq!(cfg.catalog().unwrap().len(), 17);
    }

    #[test]
    fn loads_hide_list_and_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"hide":"promotion|Trending","categories":[{"label":"ORGANIC","id":1},{"label":"REELS","id":30}]}"#,
        )
        .unwrap();

        let cfg = VeilConfig::load(&path).unwrap();
        assert!(cfg.hide_list().contains("PROMOTION"));
        assert!(cfg.hide_list().contains("TRENDING"));
        let catalog = cfg.catalog().unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.id_of("REELS"), Some(CategoryId(30)));
    }

    #[test]
    fn overrides_apply_in_order_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"hide":"PROMOTION"}"#).unwrap();
        let file = VeilConfig::load(&path).unwrap();

        let env = file.clone().with_hide_override(Some("TRENDING".into()));
        assert_eq!(env.hide, "TRENDING");
        let flag = env.clone().with_hide_override(Some("SHOWCASE".into()));
        assert_eq!(flag.hide, "SHOWCASE");
        assert_eq!(env.with_hide_override(None).hide, "TRENDING");
        assert_eq!(file.with_hide_override(None).hide, "PROMOTION");
    }

    #[test]
    fn missing_explicit_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            VeilConfig::load(&dir.path().join("typo.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            VeilConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn invalid_catalog_is_reported() {
        let cfg = VeilConfig {
            categories: Some(vec![
                CategoryEntry {
                    label: CategoryLabel::new("A"),
                    id: CategoryId(1),
                },
                CategoryEntry {
                    label: CategoryLabel::new("B"),
                    id: CategoryId(1),
                },
            ]),
            ..VeilConfig::default()
        };
        assert!(matches!(
            cfg.catalog(),
            Err(ConfigError::Catalog(CatalogError::DuplicateId(_)))
        ));
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = VeilConfig {
            hide: "SHOWCASE".into(),
            ..VeilConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("categories"));
        let back: VeilConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
