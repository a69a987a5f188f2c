//! Top-level key comparison between the two documents.

use serde_json::Value;
use std::collections::BTreeSet;

/// Three-way partition of the top-level keys of two documents.
///
/// Computed once per run and consumed by the merge gate: keys only in the
/// new document need an explicit decision before they are discarded, keys
/// only in the old document mean the new one is incomplete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySetDiff {
    pub common: BTreeSet<String>,
    pub only_in_new: BTreeSet<String>,
    pub only_in_old: BTreeSet<String>,
}

impl KeySetDiff {
    /// Partitions the top-level keys of `old` and `new`. A non-object root
    /// contributes no keys.
    pub fn between(old: &Value, new: &Value) -> KeySetDiff {
        let old_keys = keys_of(old);
        let new_keys = keys_of(new);
        KeySetDiff {
            common: old_keys.intersection(&new_keys).cloned().collect(),
            only_in_new: new_keys.difference(&old_keys).cloned().collect(),
            only_in_old: old_keys.difference(&new_keys).cloned().collect(),
        }
    }
}

fn keys_of(doc: &Value) -> BTreeSet<String> {
    doc.as_object()
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}
