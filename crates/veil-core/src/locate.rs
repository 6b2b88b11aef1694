//! Depth-bounded breadth-first search for a uniquely named field.
//!
//! The component trees this runs over are rebuilt with randomized key
//! suffixes, so fields are found by pattern rather than by path. A level
//! only "matches" when exactly one of a node's own keys fits the pattern;
//! ambiguous nodes are walked through like any other.

use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::VecDeque;

/// Search `root` for a node with exactly one key matching `pattern` and apply
/// `transform` to that key's value.
///
/// Levels `0..=max_depth` are inspected, shallowest first; within a level
/// nodes are visited in key insertion order. The first qualifying node ends
/// the search. If `transform` returns `None` the whole call yields `None`
/// without looking further.
pub fn locate<'a, T, F>(
    root: &'a Value,
    pattern: &Regex,
    transform: F,
    max_depth: usize,
) -> Option<T>
where
    F: FnOnce(&'a Value) -> Option<T>,
{
    let value = find_unique(root, pattern, max_depth)?;
    transform(value)
}

/// [`locate`] with the identity transform.
pub fn locate_value<'a>(root: &'a Value, pattern: &Regex, max_depth: usize) -> Option<&'a Value> {
    find_unique(root, pattern, max_depth)
}

/// [`locate`] returning the matched value only when it is a string.
pub fn locate_str<'a>(root: &'a Value, pattern: &Regex, max_depth: usize) -> Option<&'a str> {
    locate(root, pattern, Value::as_str, max_depth)
}

fn find_unique<'a>(root: &'a Value, pattern: &Regex, max_depth: usize) -> Option<&'a Value> {
    let mut queue: VecDeque<&'a Value> = VecDeque::from([root]);
    let mut depth = 0;

    while !queue.is_empty() {
        for _ in 0..queue.len() {
            let Some(node) = queue.pop_front() else {
                break;
            };
            let mut matched = None;
            let mut count = 0usize;
            for (key, child) in entries(node) {
                if pattern.is_match(&key) {
                    count += 1;
                    matched = Some(child);
                }
            }
            if count == 1 {
                return matched;
            }
            for (_, child) in entries(node) {
                if child.is_object() || child.is_array() {
                    queue.push_back(child);
                }
            }
        }
        if depth >= max_depth {
            break;
        }
        depth += 1;
    }
    None
}

/// Own keys of a node. Arrays are keyed by decimal index; scalars have none.
fn entries(node: &Value) -> Box<dyn Iterator<Item = (Cow<'_, str>, &Value)> + '_> {
    match node {
        Value::Object(map) => Box::new(map.iter().map(|(k, v)| (Cow::Borrowed(k.as_str()), v))),
        Value::Array(items) => Box::new(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| (Cow::Owned(i.to_string()), v)),
        ),
        _ => Box::new(std::iter::empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn re(p: &str) -> Regex {
        Regex::new(p).unwrap()
    }

    #[test]
    fn depth_zero_inspects_only_root_keys() {
        let g = json!({"a": {"feed": 1}, "feed_x": 2});
        assert_eq!(locate_value(&g, &re("feed"), 0), Some(&json!(2)));

        let g = json!({"a": {"feed": 1}});
        assert_eq!(locate_value(&g, &re("feed"), 0), None);
        assert_eq!(locate_value(&g, &re("feed"), 1), Some(&json!(1)));
    }

    #[test]
    fn finds_single_match_at_depth_two_among_noise() {
        let g = json!({
            "x": 1,
            "y": {"noise": true, "z": {"target_key": "hit", "other": 3}},
            "w": [{"deep": {"deeper": {"target": "too deep"}}}],
        });
        assert_eq!(locate_str(&g, &re("target"), 3), Some("hit"));
    }

    #[test]
    fn ambiguous_level_is_skipped_but_traversed() {
        // Two matches at the root: not a match, but children are still enqueued.
        let g = json!({"feed_a": {"feed": "inner"}, "feed_b": 1});
        assert_eq!(locate_str(&g, &re("feed"), 1), Some("inner"));
    }

    #[test]
    fn two_matches_at_same_depth_hide_deeper_single_match() {
        let g = json!({
            "n": {"cat_one": 1, "cat_two": 2, "sub": {"cat": 3}},
        });
        // Depth 1 holds the ambiguous node; the single match sits at depth 2.
        assert_eq!(locate_value(&g, &re("cat"), 1), None);
        assert_eq!(locate_value(&g, &re("cat"), 2), Some(&json!(3)));
    }

    #[test]
    fn shallowest_level_wins_over_earlier_subtree() {
        let g = json!({
            "a": {"b": {"key": "deep"}},
            "c": {"key": "shallow"},
        });
        assert_eq!(locate_str(&g, &re("key"), 4), Some("shallow"));
    }

    #[test]
    fn insertion_order_decides_within_a_level() {
        let g = json!({"z": {"key": "first"}, "a": {"key": "second"}});
        assert_eq!(locate_str(&g, &re("key"), 1), Some("first"));
    }

    #[test]
    fn transform_failure_stops_search() {
        let g = json!({"key": 5, "nested": {"key": "string"}});
        // Root match is a number; as_str fails and the deeper string is never tried.
        assert_eq!(locate_str(&g, &re("key"), 3), None);
    }

    #[test]
    fn nested_transform_composes() {
        let g = json!({"category_sensitive": {"enc": "abc", "other": 1}});
        let enc = locate(&g, &re("cat.*[sS]ens"), |x| locate_str(x, &re("enc"), 0), 0);
        assert_eq!(enc, Some("abc"));
    }

    #[test]
    fn tolerates_scalars_and_nulls() {
        let g = json!({"a": null, "b": [1, "two", null, {"want": true}], "c": 3.5});
        assert_eq!(locate_value(&g, &re("want"), 2), Some(&json!(true)));
        assert_eq!(locate_value(&json!(null), &re("x"), 3), None);
        assert_eq!(locate_value(&json!("text"), &re("x"), 3), None);
    }

    #[test]
    fn array_indices_are_keys() {
        let g = json!(["a", "b"]);
        assert_eq!(locate_str(&g, &re("^1$"), 0), Some("b"));
    }

    #[test]
    fn exhausted_graph_is_not_found() {
        let g = json!({"a": {"b": {}}});
        assert_eq!(locate_value(&g, &re("missing"), 10), None);
    }
}
