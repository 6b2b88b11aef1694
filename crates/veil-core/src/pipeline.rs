use crate::dispatch::Dispatcher;
use crate::extract::Extractor;
use crate::locate::{locate, locate_value};
use crate::resolve::DigestResolver;
use crate::types::{CategoryLabel, NodeHandle};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

const FEED_DEPTH: usize = 4;
const POST_ID_DEPTH: usize = 2;

/// Content-root paths, tried in order before falling back to `props` and the bag itself.
const CONTENT_ROOT_PATHS: &[&str] = &[
    "/children/props/children/props/children/props",
    "/children/props/children",
];

/// What a single pipeline pass did with a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    AlreadyProcessed,
    /// Not a feed item, or no category could be read.
    NotApplicable,
    /// An obfuscated category was present but could not be recovered.
    Unresolved,
    Dispatched { label: CategoryLabel, hidden: bool },
}

// ── Processed set ──

/// Handles that have already been dispatched.
#[derive(Debug, Default)]
pub struct ProcessedSet {
    handles: Mutex<HashSet<NodeHandle>>,
}

impl ProcessedSet {
    pub fn contains(&self, handle: &NodeHandle) -> bool {
        self.lock().contains(handle)
    }

    /// Returns `false` if the handle was already present.
    pub fn insert(&self, handle: NodeHandle) -> bool {
        self.lock().insert(handle)
    }

    /// Drop a handle whose node has left the tree.
    pub fn forget(&self, handle: &NodeHandle) -> bool {
        self.lock().remove(handle)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<NodeHandle>> {
        self.handles.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ── Field patterns ──

struct FieldPatterns {
    feed: Regex,
    category: Regex,
    sensitive: Regex,
    enc: Regex,
    post_id: Regex,
    loose_cat: Regex,
}

impl FieldPatterns {
    fn new() -> Self {
        let re = |p: &str| Regex::new(p).expect("static field pattern");
        Self {
            feed: re("feed"),
            category: re("category"),
            sensitive: re("cat.*[sS]ens"),
            enc: re("enc"),
            post_id: re("post_id"),
            loose_cat: re("cat"),
        }
    }
}

enum Classification {
    Plain(CategoryLabel),
    Obfuscated { item_id: String, digest: Option<String> },
    Unknown,
}

// ── Pipeline ──

/// Classifies candidate nodes and dispatches the ones it can label.
pub struct CategoryPipeline {
    extractor: Arc<dyn Extractor>,
    resolver: DigestResolver,
    dispatcher: Dispatcher,
    processed: ProcessedSet,
    patterns: FieldPatterns,
}

impl CategoryPipeline {
    pub fn new(
        extractor: Arc<dyn Extractor>,
        resolver: DigestResolver,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            extractor,
            resolver,
            dispatcher,
            processed: ProcessedSet::default(),
            patterns: FieldPatterns::new(),
        }
    }

    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    pub fn resolver(&self) -> &DigestResolver {
        &self.resolver
    }

    /// Classify one node. Never fails: anything that cannot be classified is
    /// left visible and unmarked.
    pub async fn process(&self, handle: &NodeHandle) -> Outcome {
        if self.processed.contains(handle) {
            return Outcome::AlreadyProcessed;
        }
        let Some(graph) = self.extractor.extract(handle) else {
            return Outcome::NotApplicable;
        };

        match self.classify(&graph) {
            Classification::Plain(label) => self.finish(handle, label),
            Classification::Obfuscated {
                item_id,
                digest: Some(digest),
            } => match self.resolver.resolve(&item_id, &digest).await {
                Ok(Some(label)) if self.resolver.catalog().contains(label.as_str()) => {
                    self.finish(handle, label)
                }
                Ok(_) => Outcome::Unresolved,
                Err(e) => {
                    tracing::debug!(%handle, error = %e, "digest service failed, dropping item");
                    Outcome::Unresolved
                }
            },
            Classification::Obfuscated { digest: None, .. } => Outcome::Unresolved,
            Classification::Unknown => {
                tracing::trace!(%handle, "no category found");
                Outcome::NotApplicable
            }
        }
    }

    /// Fire-and-forget variant of [`process`](Self::process).
    pub fn submit(self: &Arc<Self>, handle: NodeHandle) -> JoinHandle<Outcome> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.process(&handle).await })
    }

    fn finish(&self, handle: &NodeHandle, label: CategoryLabel) -> Outcome {
        // A concurrent pass may have dispatched this handle while we were resolving.
        if !self.processed.insert(handle.clone()) {
            return Outcome::AlreadyProcessed;
        }
        let hidden = self.dispatcher.dispatch(handle, &label);
        Outcome::Dispatched { label, hidden }
    }

    fn classify(&self, graph: &Value) -> Classification {
        let p = &self.patterns;
        let Some(root) = content_root(graph) else {
            return Classification::Unknown;
        };
        let Some(feed) = locate_value(root, &p.feed, FEED_DEPTH).filter(|v| truthy(v)) else {
            return Classification::Unknown;
        };

        if let Some(label) = locate_value(feed, &p.category, 0)
            .and_then(Value::as_str)
            .and_then(|s| self.known(s))
        {
            return Classification::Plain(label);
        }

        let enc = locate(feed, &p.sensitive, |x| locate_value(x, &p.enc, 0), 0)
            .filter(|v| truthy(v));
        let item_id = locate_value(feed, &p.post_id, POST_ID_DEPTH)
            .filter(|v| truthy(v))
            .and_then(item_id_text);

        match (enc, item_id) {
            (Some(enc), Some(item_id)) => Classification::Obfuscated {
                item_id,
                digest: enc.as_str().map(str::to_string),
            },
            (Some(_), None) => Classification::Unknown,
            (None, _) => locate(feed, &p.sensitive, |x| locate_value(x, &p.loose_cat, 0), 0)
                .and_then(Value::as_str)
                .and_then(|s| self.known(s))
                .map_or(Classification::Unknown, Classification::Plain),
        }
    }

    fn known(&self, name: &str) -> Option<CategoryLabel> {
        self.resolver.catalog().label(name).cloned()
    }
}

/// Best-effort descent to the sub-object that holds the rendered feed unit.
fn content_root(bag: &Value) -> Option<&Value> {
    CONTENT_ROOT_PATHS
        .iter()
        .filter_map(|path| bag.pointer(path))
        .chain(bag.get("props"))
        .chain(std::iter::once(bag))
        .find(|v| truthy(v))
}

/// Item ids arrive as strings or as bare numbers.
fn item_id_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Presence test used for every located field: null, false, 0 and "" count as absent.
fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
