//! Document type identification.

use serde_json::Value;

use crate::catalog::{DocType, SchemaCatalog};

/// Identifies a document against the catalog.
///
/// Each type is tried in catalog order and must pass two independent checks:
/// the document validates against the type's schema, and it carries every
/// property the schema names (see [`has_minimum_structure`]). A validation
/// failure just disqualifies that type and the scan moves on. The first type
/// passing both checks wins; `None` means the document matches no known
/// type.
pub fn identify<'a>(doc: &Value, catalog: &'a SchemaCatalog) -> Option<&'a DocType> {
    catalog
        .types()
        .find(|ty| ty.validator().is_valid(doc) && has_minimum_structure(doc, ty.schema()))
}

/// Checks that `doc` contains every property named in the schema's
/// `properties` object, recursing into properties whose subschema declares
/// `properties` of its own when the document value is an object.
///
/// Presence only, no type checking. Permissive schema dialects accept
/// documents that omit optional branches entirely; this walk closes that
/// gap.
pub fn has_minimum_structure(doc: &Value, schema: &Value) -> bool {
    let props = match schema.get("properties").and_then(Value::as_object) {
        Some(props) => props,
        None => return true,
    };
    let obj = match doc.as_object() {
        Some(obj) => obj,
        None => return props.is_empty(),
    };
    for (key, subschema) in props {
        let value = match obj.get(key) {
            Some(value) => value,
            None => return false,
        };
        if value.is_object()
            && subschema.get("properties").is_some()
            && !has_minimum_structure(value, subschema)
        {
            return false;
        }
    }
    true
}
