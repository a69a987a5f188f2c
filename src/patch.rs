//! Patch pipeline - identification, the merge gate, and rule dispatch.

use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::SchemaCatalog;
use crate::identify::identify;
use crate::keyset::KeySetDiff;
use crate::merge::{apply, MergeEvent, MergeReport};

/// Which of the two input documents a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocRole {
    Old,
    New,
}

impl fmt::Display for DocRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocRole::Old => write!(f, "old"),
            DocRole::New => write!(f, "new"),
        }
    }
}

/// Fatal conditions that abort a patch run.
///
/// None of these leaves partial output behind: the patched document exists
/// only on success.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatchError {
    #[error("{role} document matches no known type")]
    UnknownType { role: DocRole },

    #[error("documents are of different types: old is '{old_type}', new is '{new_type}'")]
    TypeMismatch { old_type: String, new_type: String },

    #[error("new document is missing keys present in the old one: {keys:?}")]
    MissingInNew { keys: BTreeSet<String> },

    #[error("discarding keys only present in the new document was declined: {keys:?}")]
    Aborted { keys: BTreeSet<String> },
}

/// Decision point for discarding keys that exist only in the new document.
///
/// The prompt itself is the caller's concern; the pipeline only consumes
/// the decision.
pub trait Confirm {
    /// Returns true if the listed keys may be discarded.
    fn confirm_discard(&mut self, keys: &BTreeSet<String>) -> bool;
}

/// Allows discarding unconditionally.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm_discard(&mut self, _keys: &BTreeSet<String>) -> bool {
        true
    }
}

/// Declines unconditionally.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm_discard(&mut self, _keys: &BTreeSet<String>) -> bool {
        false
    }
}

/// The product of a successful run.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    /// The old document with the type's replacement rules applied.
    pub patched: Value,
    /// Name of the type both documents resolved to.
    pub type_name: String,
    /// Top-level key partition computed for the merge gate.
    pub diff: KeySetDiff,
    /// Every decision the merge engine took.
    pub report: MergeReport,
}

/// Patcher runs the whole reconciliation: identify both documents, gate on
/// their key sets, then apply the resolved type's replacement rules.
///
/// The catalog is explicit configuration handed in at construction; there
/// is no process-wide state.
#[derive(Debug)]
pub struct Patcher<'a> {
    catalog: &'a SchemaCatalog,
}

impl<'a> Patcher<'a> {
    pub fn new(catalog: &'a SchemaCatalog) -> Self {
        Patcher { catalog }
    }

    /// Patches `old` from `new`, consuming the old document and returning
    /// it merged on success.
    ///
    /// Extra keys in the new document are put to `confirm` before they are
    /// discarded; keys missing from the new document abort unconditionally,
    /// in that order.
    pub fn patch(
        &self,
        mut old: Value,
        new: &Value,
        confirm: &mut dyn Confirm,
    ) -> Result<PatchOutcome, PatchError> {
        let old_type = identify(&old, self.catalog)
            .ok_or(PatchError::UnknownType { role: DocRole::Old })?;
        let new_type = identify(new, self.catalog)
            .ok_or(PatchError::UnknownType { role: DocRole::New })?;
        if old_type.name() != new_type.name() {
            return Err(PatchError::TypeMismatch {
                old_type: old_type.name().to_string(),
                new_type: new_type.name().to_string(),
            });
        }
        debug!(type_name = old_type.name(), "documents identified");

        let diff = KeySetDiff::between(&old, new);
        if !diff.only_in_new.is_empty() {
            debug!(keys = ?diff.only_in_new, "new document has keys the old one lacks");
            if !confirm.confirm_discard(&diff.only_in_new) {
                return Err(PatchError::Aborted {
                    keys: diff.only_in_new,
                });
            }
        }
        if !diff.only_in_old.is_empty() {
            return Err(PatchError::MissingInNew {
                keys: diff.only_in_old,
            });
        }

        let report = match old_type.rules() {
            Some(rules) => apply(&mut old, new, rules),
            None => {
                warn!(type_name = old_type.name(), "no replacement rules for type");
                MergeReport::from_event(MergeEvent::NoRulesForType {
                    type_name: old_type.name().to_string(),
                })
            }
        };

        Ok(PatchOutcome {
            patched: old,
            type_name: old_type.name().to_string(),
            diff,
            report,
        })
    }
}
