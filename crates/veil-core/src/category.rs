use crate::types::{CategoryId, CategoryLabel};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Built-in categories, in the feed's canonical order.
const BUILTIN: &[(&str, u32)] = &[
    ("UNKNOWN", 0),
    ("ORGANIC", 1),
    ("ENGAGEMENT", 2),
    ("FIXED_POSITION", 3),
    ("PROMOTION", 4),
    ("SPONSORED", 5),
    ("END_OF_FEED_CONTENT", 6),
    ("FB_STORIES", 7),
    ("HIGH_VALUE_PROMOTION", 8),
    ("FB_STORIES_ENGAGEMENT", 9),
    ("SHOWCASE", 10),
    ("FB_SHORTS", 11),
    ("TRENDING", 12),
    ("ENGAGEMENT_QP", 13),
    ("MULTI_FB_STORIES_TRAY", 14),
    ("END_OF_FEED_REELS", 15),
    ("FB_SHORTS_FALLBACK", 16),
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("category catalog is empty")]
    Empty,
    #[error("category label is blank (id {0})")]
    BlankLabel(CategoryId),
    #[error("duplicate category label: {0}")]
    DuplicateLabel(String),
    #[error("duplicate category id: {0}")]
    DuplicateId(CategoryId),
}

/// One catalog entry as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub label: CategoryLabel,
    pub id: CategoryId,
}

/// The closed set of categories the resolver knows about.
///
/// Order matters: digest probing enumerates entries in catalog order and
/// stops at the first match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCatalog {
    entries: Vec<CategoryEntry>,
}

impl CategoryCatalog {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN
                .iter()
                .map(|(label, id)| CategoryEntry {
                    label: CategoryLabel::new(*label),
                    id: CategoryId(*id),
                })
                .collect(),
        }
    }

    /// Build a catalog from configured entries. Labels must be non-blank and
    /// both labels and ids unique.
    pub fn from_entries(entries: Vec<CategoryEntry>) -> Result<Self, CatalogError> {
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut labels = HashSet::new();
        let mut ids = HashSet::new();
        for entry in &entries {
            if entry.label.as_str().trim().is_empty() {
                return Err(CatalogError::BlankLabel(entry.id));
            }
            if !labels.insert(entry.label.as_str()) {
                return Err(CatalogError::DuplicateLabel(entry.label.to_string()));
            }
            if !ids.insert(entry.id) {
                return Err(CatalogError::DuplicateId(entry.id));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a label by its exact name. Feed values are matched case-sensitively.
    pub fn label(&self, name: &str) -> Option<&CategoryLabel> {
        self.entries
            .iter()
            .find(|e| e.label.as_str() == name)
            .map(|e| &e.label)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.label(name).is_some()
    }

    pub fn id_of(&self, name: &str) -> Option<CategoryId> {
        self.entries
            .iter()
            .find(|e| e.label.as_str() == name)
            .map(|e| e.id)
    }

    /// Exact lookup, falling back to a case-insensitive match. For user input only.
    pub fn id_of_ignore_case(&self, name: &str) -> Option<CategoryId> {
        self.id_of(name).or_else(|| {
            self.entries
                .iter()
                .find(|e| e.label.as_str().eq_ignore_ascii_case(name))
                .map(|e| e.id)
        })
    }
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
