//! Merge engine - applies a replacement table to the old document.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::rules::{KeyRule, ReplacementRules};

/// Severity of a merge event, for renderers picking a log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// A single decision taken while merging.
///
/// The engine never swallows a decision: everything it does or declines to
/// do lands in the report, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MergeEvent {
    /// The whole value of `key` was taken from the new document.
    KeyReplaced { key: String },
    /// `key` was absent from one of the documents; nothing changed.
    KeySkipped { key: String },
    /// `key.subkey` was taken from the new document.
    SubkeyReplaced { key: String, subkey: String },
    /// `key.subkey` was absent from one side's nested object.
    SubkeySkipped { key: String, subkey: String },
    /// A subkey rule met a non-object value, so the whole value of `key`
    /// was replaced instead.
    TypeMismatchFallback { key: String },
    /// The resolved type has no replacement table; the merge was a no-op.
    NoRulesForType { type_name: String },
}

impl MergeEvent {
    pub fn severity(&self) -> Severity {
        match self {
            MergeEvent::KeyReplaced { .. }
            | MergeEvent::SubkeyReplaced { .. }
            | MergeEvent::TypeMismatchFallback { .. } => Severity::Info,
            MergeEvent::KeySkipped { .. }
            | MergeEvent::SubkeySkipped { .. }
            | MergeEvent::NoRulesForType { .. } => Severity::Warning,
        }
    }
}

/// Ordered record of every decision the merge engine took.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MergeReport {
    events: Vec<MergeEvent>,
}

impl MergeReport {
    pub fn new() -> Self {
        MergeReport::default()
    }

    /// Creates a report holding a single event.
    pub fn from_event(event: MergeEvent) -> Self {
        MergeReport {
            events: vec![event],
        }
    }

    pub fn push(&mut self, event: MergeEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[MergeEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MergeEvent> {
        self.events.iter()
    }
}

impl IntoIterator for MergeReport {
    type Item = MergeEvent;
    type IntoIter = std::vec::IntoIter<MergeEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

/// Applies the replacement table, copying selected fields of `new` into
/// `old` in place.
///
/// Only keys named by the table are ever touched; a named key is copied
/// only when it exists in both documents. Rules asking for subkey
/// replacement fall back to wholesale replacement when either side is not
/// an object.
pub fn apply(old: &mut Value, new: &Value, rules: &ReplacementRules) -> MergeReport {
    let mut report = MergeReport::new();

    let (old_map, new_map) = match (old.as_object_mut(), new.as_object()) {
        (Some(old_map), Some(new_map)) => (old_map, new_map),
        // A non-object root has no keys, so every rule lands as a skip.
        _ => {
            for (key, _) in rules.iter() {
                report.push(MergeEvent::KeySkipped {
                    key: key.to_string(),
                });
            }
            return report;
        }
    };

    for (key, rule) in rules.iter() {
        let new_value = match new_map.get(key) {
            Some(value) if old_map.contains_key(key) => value,
            _ => {
                debug!(key, "key absent from one side, skipping");
                report.push(MergeEvent::KeySkipped {
                    key: key.to_string(),
                });
                continue;
            }
        };

        match rule {
            KeyRule::Full => {
                old_map.insert(key.to_string(), new_value.clone());
                report.push(MergeEvent::KeyReplaced {
                    key: key.to_string(),
                });
            }
            KeyRule::Subkeys(subkeys) => {
                let mut fallback = true;
                if let (Some(old_obj), Some(new_obj)) = (
                    old_map.get_mut(key).and_then(Value::as_object_mut),
                    new_value.as_object(),
                ) {
                    merge_subkeys(key, subkeys, old_obj, new_obj, &mut report);
                    fallback = false;
                }
                if fallback {
                    debug!(key, "type mismatch, replacing whole value");
                    old_map.insert(key.to_string(), new_value.clone());
                    report.push(MergeEvent::TypeMismatchFallback {
                        key: key.to_string(),
                    });
                }
            }
        }
    }

    report
}

fn merge_subkeys(
    key: &str,
    subkeys: &[String],
    old_obj: &mut Map<String, Value>,
    new_obj: &Map<String, Value>,
    report: &mut MergeReport,
) {
    for subkey in subkeys {
        match new_obj.get(subkey) {
            Some(new_value) if old_obj.contains_key(subkey) => {
                old_obj.insert(subkey.clone(), new_value.clone());
                report.push(MergeEvent::SubkeyReplaced {
                    key: key.to_string(),
                    subkey: subkey.clone(),
                });
            }
            _ => {
                debug!(key, subkey = subkey.as_str(), "subkey absent from one side");
                report.push(MergeEvent::SubkeySkipped {
                    key: key.to_string(),
                    subkey: subkey.clone(),
                });
            }
        }
    }
}
