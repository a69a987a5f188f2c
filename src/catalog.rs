//! Schema catalog - the closed set of known document types.

use once_cell::sync::OnceCell;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::rules::ReplacementRules;

/// A named document type.
///
/// Bundles everything identification and merging need for one type: the raw
/// schema document, the validator compiled from it, and the replacement
/// rules applied when two documents of this type are merged. A type without
/// rules can still be identified; merging it is a logged no-op.
pub struct DocType {
    name: String,
    schema: Value,
    validator: jsonschema::Validator,
    rules: Option<ReplacementRules>,
}

impl DocType {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema document as registered. Identification reads its
    /// `properties` tree for the minimum-structure check.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub fn validator(&self) -> &jsonschema::Validator {
        &self.validator
    }

    pub fn rules(&self) -> Option<&ReplacementRules> {
        self.rules.as_ref()
    }
}

impl fmt::Debug for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocType")
            .field("name", &self.name)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

/// SchemaCatalog is an ordered list of document types.
///
/// Catalog order is significant: identification returns the first type all
/// of whose checks pass. Types are indexed by name before the first lookup,
/// so the catalog should be considered immutable once built.
#[derive(Debug, Default)]
pub struct SchemaCatalog {
    types: Vec<DocType>,
    index: OnceCell<HashMap<String, usize>>,
}

/// Error raised while building a catalog.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("schema for type '{name}' does not compile: {message}")]
    InvalidSchema { name: String, message: String },

    #[error("duplicate type name '{name}' in catalog")]
    DuplicateType { name: String },

    #[error("failed to read schema file {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("failed to parse schema file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl SchemaCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Iterates types in catalog order.
    pub fn types(&self) -> impl Iterator<Item = &DocType> {
        self.types.iter()
    }

    /// Looks a type up by name.
    pub fn get(&self, name: &str) -> Option<&DocType> {
        let index = self.index.get_or_init(|| {
            self.types
                .iter()
                .enumerate()
                .map(|(i, ty)| (ty.name.clone(), i))
                .collect()
        });
        index.get(name).map(|&i| &self.types[i])
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// CatalogBuilder assembles a SchemaCatalog, compiling each schema as it is
/// registered. Registration order becomes catalog order.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    types: Vec<DocType>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        CatalogBuilder::default()
    }

    /// Registers a document type under `name`.
    pub fn register(
        mut self,
        name: impl Into<String>,
        schema: Value,
        rules: Option<ReplacementRules>,
    ) -> Result<Self, CatalogError> {
        let name = name.into();
        if self.types.iter().any(|ty| ty.name == name) {
            return Err(CatalogError::DuplicateType { name });
        }
        let validator = jsonschema::validator_for(&schema).map_err(|e| {
            CatalogError::InvalidSchema {
                name: name.clone(),
                message: e.to_string(),
            }
        })?;
        self.types.push(DocType {
            name,
            schema,
            validator,
            rules,
        });
        Ok(self)
    }

    pub fn build(self) -> SchemaCatalog {
        SchemaCatalog {
            types: self.types,
            index: OnceCell::new(),
        }
    }
}

/// Loads a catalog from a directory of schema files.
///
/// Type names listed in `preferred` come first, in the given order, when a
/// matching `<name>.json`/`.yaml`/`.yml` file exists; remaining schema
/// files follow sorted by path, so catalog order stays deterministic with
/// user-supplied schemas present. Each type picks up its replacement rules
/// from `rules` by name; types without an entry are identifiable but merge
/// as a no-op.
pub fn load_dir(
    dir: &Path,
    preferred: &[&str],
    rules: &HashMap<String, ReplacementRules>,
) -> Result<SchemaCatalog, CatalogError> {
    let mut builder = SchemaCatalog::builder();
    let mut seen = Vec::new();

    for name in preferred {
        if let Some(path) = find_schema_file(dir, name) {
            let schema = read_schema(&path)?;
            builder = builder.register(*name, schema, rules.get(*name).cloned())?;
            seen.push(path);
        }
    }

    let mut extras = Vec::new();
    if dir.is_dir() {
        let entries = fs::read_dir(dir).map_err(|e| CatalogError::Io {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        for entry in entries {
            let path = entry
                .map_err(|e| CatalogError::Io {
                    path: dir.to_path_buf(),
                    message: e.to_string(),
                })?
                .path();
            if is_schema_file(&path) && !seen.contains(&path) {
                extras.push(path);
            }
        }
    }
    extras.sort();
    for path in extras {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let schema = read_schema(&path)?;
        builder = builder.register(&stem, schema, rules.get(stem.as_str()).cloned())?;
    }

    Ok(builder.build())
}

fn find_schema_file(dir: &Path, name: &str) -> Option<PathBuf> {
    ["json", "yaml", "yml"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", name, ext)))
        .find(|path| path.is_file())
}

fn is_schema_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("yaml") | Some("yml")
    )
}

fn read_schema(path: &Path) -> Result<Value, CatalogError> {
    let content = fs::read_to_string(path).map_err(|e| CatalogError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let parsed = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|e| CatalogError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        }
        _ => serde_json::from_str(&content).map_err(|e| CatalogError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
    };
    Ok(parsed)
}
