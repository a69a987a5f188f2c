//! End-to-end tests for the patch pipeline.

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::catalog::SchemaCatalog;
use crate::merge::MergeEvent;
use crate::patch::{AlwaysConfirm, Confirm, DocRole, NeverConfirm, PatchError, Patcher};
use crate::rules::ReplacementRules;

/// Records the keys it was asked about and answers as configured.
struct RecordingConfirm {
    answer: bool,
    asked: Vec<String>,
}

impl RecordingConfirm {
    fn new(answer: bool) -> Self {
        RecordingConfirm {
            answer,
            asked: Vec::new(),
        }
    }
}

impl Confirm for RecordingConfirm {
    fn confirm_discard(&mut self, keys: &BTreeSet<String>) -> bool {
        self.asked.extend(keys.iter().cloned());
        self.answer
    }
}

/// Catalog with a single type "A" requiring `x` with a nested `y`.
fn catalog_a() -> SchemaCatalog {
    let schema = json!({"properties": {"x": {"properties": {"y": {}}}}});
    SchemaCatalog::builder()
        .register(
            "A",
            schema,
            Some(ReplacementRules::new().subkeys("x", &["y"])),
        )
        .unwrap()
        .build()
}

#[test]
fn test_subkey_scenario() {
    let catalog = catalog_a();
    let old = json!({"x": {"y": 1}, "z": 5});
    let new = json!({"x": {"y": 2}, "z": 9});

    let outcome = Patcher::new(&catalog)
        .patch(old, &new, &mut AlwaysConfirm)
        .unwrap();

    assert_eq!(outcome.patched, json!({"x": {"y": 2}, "z": 5}));
    assert_eq!(outcome.type_name, "A");
    assert_eq!(
        outcome.report.events(),
        &[MergeEvent::SubkeyReplaced {
            key: "x".into(),
            subkey: "y".into()
        }]
    );
}

#[test]
fn test_missing_key_in_new_is_fatal() {
    let catalog = catalog_a();
    let old = json!({"x": {"y": 1}, "z": 5});
    let new = json!({"x": {"y": 2}});

    // Fatal regardless of how confirmation would answer.
    let err = Patcher::new(&catalog)
        .patch(old, &new, &mut AlwaysConfirm)
        .unwrap_err();

    assert_eq!(
        err,
        PatchError::MissingInNew {
            keys: ["z"].map(String::from).into()
        }
    );
}

#[test]
fn test_extra_key_in_new_declined() {
    let catalog = catalog_a();
    let old = json!({"x": {"y": 1}});
    let new = json!({"x": {"y": 2}, "w": 7});

    let err = Patcher::new(&catalog)
        .patch(old, &new, &mut NeverConfirm)
        .unwrap_err();

    assert_eq!(
        err,
        PatchError::Aborted {
            keys: ["w"].map(String::from).into()
        }
    );
}

#[test]
fn test_extra_key_in_new_confirmed_and_discarded() {
    let catalog = catalog_a();
    let old = json!({"x": {"y": 1}});
    let new = json!({"x": {"y": 2}, "w": 7});

    let mut confirm = RecordingConfirm::new(true);
    let outcome = Patcher::new(&catalog).patch(old, &new, &mut confirm).unwrap();

    assert_eq!(confirm.asked, vec!["w"]);
    // The extra key is never merged in, confirmed or not.
    assert_eq!(outcome.patched, json!({"x": {"y": 2}}));
}

#[test]
fn test_confirmation_evaluated_before_missing_key_abort() {
    let catalog = catalog_a();
    let old = json!({"x": {"y": 1}, "z": 5});
    let new = json!({"x": {"y": 2}, "w": 7});

    // Declining wins first,
    let err = Patcher::new(&catalog)
        .patch(old.clone(), &new, &mut NeverConfirm)
        .unwrap_err();
    assert!(matches!(err, PatchError::Aborted { .. }));

    // accepting still trips over the missing key.
    let err = Patcher::new(&catalog)
        .patch(old, &new, &mut AlwaysConfirm)
        .unwrap_err();
    assert!(matches!(err, PatchError::MissingInNew { .. }));
}

#[test]
fn test_unknown_type_is_fatal() {
    let catalog = catalog_a();
    let old = json!({"unrelated": 1});
    let new = json!({"x": {"y": 2}});

    let err = Patcher::new(&catalog)
        .patch(old, &new, &mut AlwaysConfirm)
        .unwrap_err();
    assert_eq!(err, PatchError::UnknownType { role: DocRole::Old });

    let err = Patcher::new(&catalog)
        .patch(json!({"x": {"y": 1}}), &json!({"nope": 1}), &mut AlwaysConfirm)
        .unwrap_err();
    assert_eq!(err, PatchError::UnknownType { role: DocRole::New });
}

#[test]
fn test_type_mismatch_is_fatal() {
    let catalog = SchemaCatalog::builder()
        .register("A", json!({"properties": {"a": {}}}), None)
        .unwrap()
        .register("B", json!({"properties": {"b": {}}}), None)
        .unwrap()
        .build();

    let err = Patcher::new(&catalog)
        .patch(json!({"a": 1}), &json!({"b": 2}), &mut AlwaysConfirm)
        .unwrap_err();

    assert_eq!(
        err,
        PatchError::TypeMismatch {
            old_type: "A".into(),
            new_type: "B".into()
        }
    );
}

#[test]
fn test_identification_tie_break_is_catalog_order() {
    // Both types are satisfied by the same document; the first registered
    // one must win.
    let schema = json!({"properties": {"x": {}}});
    let catalog = SchemaCatalog::builder()
        .register("first", schema.clone(), Some(ReplacementRules::new()))
        .unwrap()
        .register("second", schema, Some(ReplacementRules::new()))
        .unwrap()
        .build();

    let outcome = Patcher::new(&catalog)
        .patch(json!({"x": 1}), &json!({"x": 2}), &mut AlwaysConfirm)
        .unwrap();
    assert_eq!(outcome.type_name, "first");
}

#[test]
fn test_type_without_rules_is_a_noop_with_warning() {
    let catalog = SchemaCatalog::builder()
        .register("A", json!({"properties": {"x": {}}}), None)
        .unwrap()
        .build();
    let old = json!({"x": 1, "other": true});
    let new = json!({"x": 2, "other": false});

    let outcome = Patcher::new(&catalog)
        .patch(old.clone(), &new, &mut AlwaysConfirm)
        .unwrap();

    assert_eq!(outcome.patched, old);
    assert_eq!(
        outcome.report.events(),
        &[MergeEvent::NoRulesForType {
            type_name: "A".into()
        }]
    );
}

#[test]
fn test_determinism() {
    let catalog = catalog_a();
    let old = json!({"x": {"y": 1, "pad": 3}, "z": 5});
    let new = json!({"x": {"y": 2, "pad": 4}, "z": 9});

    let run = |old: Value, new: &Value| -> String {
        let outcome = Patcher::new(&catalog)
            .patch(old, new, &mut AlwaysConfirm)
            .unwrap();
        serde_json::to_string(&outcome.patched).unwrap()
    };

    assert_eq!(run(old.clone(), &new), run(old, &new));
}

#[test]
fn test_old_key_order_preserved() {
    let catalog = SchemaCatalog::builder()
        .register(
            "A",
            json!({"properties": {"x": {}}}),
            Some(ReplacementRules::new().full("x")),
        )
        .unwrap()
        .build();
    let old: Value = serde_json::from_str(r#"{"z": 5, "x": 1, "a": 2}"#).unwrap();
    let new: Value = serde_json::from_str(r#"{"a": 9, "x": 7, "z": 9}"#).unwrap();

    let outcome = Patcher::new(&catalog)
        .patch(old, &new, &mut AlwaysConfirm)
        .unwrap();

    assert_eq!(
        serde_json::to_string(&outcome.patched).unwrap(),
        r#"{"z":5,"x":7,"a":2}"#
    );
}
