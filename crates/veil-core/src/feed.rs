//! Change-feed records and an in-memory node table backing extraction.

use crate::extract::{props_bag, Extractor};
use crate::types::NodeHandle;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// A node inserted into the observed tree, with its inserted descendants.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedNode {
    pub handle: NodeHandle,
    /// The node's own properties, including the suffixed property bag.
    #[serde(default)]
    pub props: Value,
    #[serde(default)]
    pub children: Vec<FeedNode>,
}

/// One change-feed event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeBatch {
    #[serde(default)]
    pub added: Vec<FeedNode>,
    #[serde(default)]
    pub removed: Vec<NodeHandle>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedLine {
    Node(FeedNode),
    Batch(ChangeBatch),
}

impl ChangeBatch {
    /// Parse one JSONL line: either a batch or a bare inserted node.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        Ok(match serde_json::from_str::<FeedLine>(line)? {
            FeedLine::Node(node) => ChangeBatch {
                added: vec![node],
                removed: vec![],
            },
            FeedLine::Batch(batch) => batch,
        })
    }

    /// Every added node followed by its descendants, parent first, in document order.
    pub fn expand(self) -> Vec<(NodeHandle, Value)> {
        let mut out = Vec::new();
        for node in self.added {
            flatten_into(node, &mut out);
        }
        out
    }
}

fn flatten_into(node: FeedNode, out: &mut Vec<(NodeHandle, Value)>) {
    out.push((node.handle, node.props));
    for child in node.children {
        flatten_into(child, out);
    }
}

#[derive(Default)]
struct Slots {
    next: u64,
    nodes: HashMap<NodeHandle, (u64, Value)>,
}

/// Nodes reported by the change feed and still awaiting their pipeline pass.
///
/// Each insert gets a generation so a finished pass only releases the entry it
/// was started for, not a newer report of the same handle.
pub struct NodeTable {
    prefix: String,
    slots: Mutex<Slots>,
}

impl NodeTable {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            slots: Mutex::new(Slots::default()),
        }
    }

    /// Store `props` for `handle`, replacing any earlier report. Returns its generation.
    pub fn insert(&self, handle: NodeHandle, props: Value) -> u64 {
        let mut slots = self.lock();
        slots.next += 1;
        let generation = slots.next;
        slots.nodes.insert(handle, (generation, props));
        generation
    }

    pub fn remove(&self, handle: &NodeHandle) -> bool {
        self.lock().nodes.remove(handle).is_some()
    }

    /// Drop `handle` if it still holds the entry from `generation`.
    pub fn release(&self, handle: &NodeHandle, generation: u64) -> bool {
        let mut slots = self.lock();
        match slots.nodes.get(handle) {
            Some((g, _)) if *g == generation => slots.nodes.remove(handle).is_some(),
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().nodes.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Extractor for NodeTable {
    fn extract(&self, handle: &NodeHandle) -> Option<Value> {
        let slots = self.lock();
        let (_, node) = slots.nodes.get(handle)?;
        props_bag(node, &self.prefix).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DEFAULT_PROPS_PREFIX;
    use serde_json::json;

    #[test]
    fn bare_node_line_becomes_single_addition() {
        let b = ChangeBatch::parse(r#"{"handle":"n1","props":{"k":1}}"#).unwrap();
        assert_eq!(b.added.len(), 1);
        assert!(b.removed.is_empty());
        assert_eq!(b.added[0].handle.as_str(), "n1");
    }

    #[test]
    fn batch_line_with_removals() {
        let b = ChangeBatch::parse(r#"{"added":[],"removed":["n1","n2"]}"#).unwrap();
        assert!(b.added.is_empty());
        assert_eq!(b.removed, vec![NodeHandle::new("n1"), NodeHandle::new("n2")]);
    }

    #[test]
    fn malformed_line_is_error() {
        assert!(ChangeBatch::parse("not json").is_err());
        assert!(ChangeBatch::parse("[1,2]").is_err());
    }

    #[test]
    fn object_without_handle_or_batch_keys_is_error() {
        assert!(ChangeBatch::parse(r#"{"handel":"x","props":{}}"#).is_err());
        assert!(ChangeBatch::parse(r#"{"added":[],"removd":["a"]}"#).is_err());
        assert!(ChangeBatch::parse(r#"{"removed":["a"]}"#).is_ok());
    }

    #[test]
    fn expand_is_parent_first_document_order() {
        let b = ChangeBatch::parse(
            r#"{"added":[
                {"handle":"a","children":[
                    {"handle":"a1","children":[{"handle":"a1x"}]},
                    {"handle":"a2"}
                ]},
                {"handle":"b"}
            ]}"#,
        )
        .unwrap();
        let order: Vec<_> = b
            .expand()
            .into_iter()
            .map(|(h, _)| h.as_str().to_string())
            .collect();
        assert_eq!(order, vec!["a", "a1", "a1x", "a2", "b"]);
    }

    #[test]
    fn table_extracts_props_bag_by_prefix() {
        let t = NodeTable::new(DEFAULT_PROPS_PREFIX);
        t.insert("n".into(), json!({"__reactProps$q1": {"children": {}}}));
        t.insert("bare".into(), json!({"id": "x"}));

        assert_eq!(t.extract(&"n".into()), Some(json!({"children": {}})));
        assert_eq!(t.extract(&"bare".into()), None);
        assert_eq!(t.extract(&"unknown".into()), None);

        assert!(t.remove(&"n".into()));
        assert_eq!(t.extract(&"n".into()), None);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn release_only_drops_matching_generation() {
        let t = NodeTable::new(DEFAULT_PROPS_PREFIX);
        let first = t.insert("n".into(), json!({"v": 1}));
        let second = t.insert("n".into(), json!({"v": 2}));
        assert_ne!(first, second);

        assert!(!t.release(&"n".into(), first));
        assert_eq!(t.len(), 1);
        assert!(t.release(&"n".into(), second));
        assert!(t.is_empty());
        assert!(!t.release(&"n".into(), second));
    }
}
