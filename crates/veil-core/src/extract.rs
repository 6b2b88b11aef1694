use crate::types::NodeHandle;
use serde_json::Value;

/// Key prefix of the component property bag attached to rendered nodes.
/// The full key carries a random per-page suffix.
pub const DEFAULT_PROPS_PREFIX: &str = "__reactProps";

/// Looks up the internal property bag of a node.
pub trait Extractor: Send + Sync {
    /// `None` when the node is unknown or has no single property bag.
    fn extract(&self, handle: &NodeHandle) -> Option<Value>;
}

/// The value of the only key of `node` starting with `prefix`.
/// Zero or several such keys yield `None`.
pub fn props_bag<'a>(node: &'a Value, prefix: &str) -> Option<&'a Value> {
    let map = node.as_object()?;
    let mut found = map.iter().filter(|(k, _)| k.starts_with(prefix));
    let (_, bag) = found.next()?;
    if found.next().is_some() {
        return None;
    }
    Some(bag)
}
