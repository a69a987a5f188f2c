//! # Font Patch
//!
//! Schema-driven JSON patching for regenerated font assets.
//!
//! A font-regeneration pipeline rewrites the metric and glyph fields of a
//! font-description document, but must not clobber fields that were tuned
//! by hand. This crate reconciles the two copies: it identifies the shared
//! document type of an old and a new JSON file against a catalog of JSON
//! Schemas, gates on their top-level key sets, then copies only the type's
//! regeneration-owned fields from the new document into the old one.
//!
//! ## Modules
//!
//! - [`catalog`] - The closed set of known document types (schema, compiled validator, rules)
//! - [`identify`] - Schema-based type identification with the minimum-structure check
//! - [`keyset`] - Top-level key comparison feeding the merge gate
//! - [`merge`] - The rule-driven merge engine and its event stream
//! - [`rules`] - Replacement rule tables, including the built-in font types
//! - [`patch`] - The pipeline tying identification, gate, and merge together

pub mod catalog;
pub mod identify;
pub mod keyset;
pub mod merge;
pub mod patch;
pub mod rules;

#[cfg(test)]
mod patch_test;

pub use catalog::{load_dir, CatalogBuilder, CatalogError, DocType, SchemaCatalog};
pub use identify::{has_minimum_structure, identify};
pub use keyset::KeySetDiff;
pub use merge::{apply, MergeEvent, MergeReport, Severity};
pub use patch::{
    AlwaysConfirm, Confirm, DocRole, NeverConfirm, PatchError, PatchOutcome, Patcher,
};
pub use rules::{builtin_rules, KeyRule, ReplacementRules, BUILTIN_TYPE_ORDER};
