use crate::types::{CategoryLabel, NodeHandle, ORGANIC, SPONSORED};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, OnceLock};

// ── Hide list ──

/// Categories to hide in addition to `SPONSORED`. Upper-cased at parse time
/// and matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HideList {
    names: BTreeSet<String>,
}

impl HideList {
    /// Parse a `|`-separated list such as `"promotion | TRENDING"`.
    /// An empty string hides nothing.
    pub fn parse(list: &str) -> Self {
        static SEP: OnceLock<Regex> = OnceLock::new();
        let sep = SEP.get_or_init(|| Regex::new(r"\s*\|\s*").expect("static separator regex"));

        if list.is_empty() {
            return Self::default();
        }
        let names = sep
            .split(list.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_uppercase)
            .collect();
        Self { names }
    }

    /// Case-insensitive membership.
    pub fn contains(&self, label: &str) -> bool {
        self.names.contains(&label.to_uppercase())
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Whether an item carrying `label` should be suppressed.
pub fn should_hide(label: &str, hide: &HideList) -> bool {
    match label {
        ORGANIC => false,
        SPONSORED => true,
        other => hide.contains(other),
    }
}

// ── Suppression ──

/// Applies the visual-suppression marker to a node.
pub trait Suppressor: Send + Sync {
    fn suppress(&self, handle: &NodeHandle, label: &CategoryLabel);
}

/// Records suppressed handles in memory.
#[derive(Debug, Default)]
pub struct CollectSuppressor {
    hidden: Mutex<Vec<(NodeHandle, CategoryLabel)>>,
}

impl CollectSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hidden(&self) -> Vec<(NodeHandle, CategoryLabel)> {
        self.hidden
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn handles(&self) -> Vec<NodeHandle> {
        self.hidden().into_iter().map(|(h, _)| h).collect()
    }
}

impl Suppressor for CollectSuppressor {
    fn suppress(&self, handle: &NodeHandle, label: &CategoryLabel) {
        self.hidden
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((handle.clone(), label.clone()));
    }
}

// ── Dispatch ──

pub struct Dispatcher {
    hide: HideList,
    suppressor: Arc<dyn Suppressor>,
}

impl Dispatcher {
    pub fn new(hide: HideList, suppressor: Arc<dyn Suppressor>) -> Self {
        Self { hide, suppressor }
    }

    /// Decide for one classified item and suppress it if needed.
    /// Returns whether the item was hidden.
    pub fn dispatch(&self, handle: &NodeHandle, label: &CategoryLabel) -> bool {
        let hide = should_hide(label.as_str(), &self.hide);
        tracing::debug!(%handle, %label, hide, "dispatch");
        if hide {
            self.suppressor.suppress(handle, label);
        }
        hide
    }
}
