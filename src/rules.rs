//! Replacement rules - which fields a merge is allowed to overwrite.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// How a single top-level key is treated during a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRule {
    /// Replace the whole value with the one from the new document.
    Full,
    /// Replace only the named subkeys inside an object-typed value.
    Subkeys(Vec<String>),
}

// On disk a rule is `null` (full replacement) or a list of subkey names,
// so the table reads as `{"key": null, "other": ["sub", ...]}`.
impl Serialize for KeyRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            KeyRule::Full => serializer.serialize_none(),
            KeyRule::Subkeys(subkeys) => subkeys.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for KeyRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<Vec<String>>::deserialize(deserializer)? {
            Some(subkeys) => KeyRule::Subkeys(subkeys),
            None => KeyRule::Full,
        })
    }
}

/// Ordered table of the top-level keys a merge may touch, and how.
///
/// Entry order is application order. The table is the sole authority on what
/// may change: keys it does not name are never modified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplacementRules {
    entries: IndexMap<String, KeyRule>,
}

impl ReplacementRules {
    pub fn new() -> Self {
        ReplacementRules::default()
    }

    /// Adds a wholesale-replacement rule for `key`.
    pub fn full(mut self, key: impl Into<String>) -> Self {
        self.entries.insert(key.into(), KeyRule::Full);
        self
    }

    /// Adds a rule replacing only the named subkeys of `key`.
    pub fn subkeys(mut self, key: impl Into<String>, subkeys: &[&str]) -> Self {
        self.entries.insert(
            key.into(),
            KeyRule::Subkeys(subkeys.iter().map(|s| (*s).to_string()).collect()),
        );
        self
    }

    pub fn get(&self, key: &str) -> Option<&KeyRule> {
        self.entries.get(key)
    }

    /// Iterates entries in application order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &KeyRule)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Catalog order for the built-in font document types.
pub const BUILTIN_TYPE_ORDER: [&str; 4] = [
    "UnityDefaultFont_Ext",
    "TextMeshPro_MonoBehavior",
    "NGUI_MonoBehavior",
    "NGUI_Sprite_MonoBehavior",
];

static BUILTIN: Lazy<HashMap<String, ReplacementRules>> = Lazy::new(|| {
    let mut rules = HashMap::new();
    rules.insert(
        "UnityDefaultFont_Ext".to_string(),
        ReplacementRules::new()
            .full("m_CharacterRects")
            .full("m_KerningValues")
            .full("m_PixelScale")
            .full("m_FontData"),
    );
    rules.insert(
        "TextMeshPro_MonoBehavior".to_string(),
        ReplacementRules::new()
            .subkeys(
                "m_fontInfo",
                &[
                    "PointSize",
                    "Scale",
                    "CharacterCount",
                    "LineHeight",
                    "Baseline",
                    "Ascender",
                    "CapHeight",
                    "Descender",
                    "CenterLine",
                    "SuperscriptOffset",
                    "SubscriptOffset",
                    "SubSize",
                    "Underline",
                    "UnderlineThickness",
                    "strikethrough",
                    "strikethroughThickness",
                    "TabWidth",
                    "Padding",
                    "AtlasWidth",
                    "AtlasHeight",
                ],
            )
            .full("m_glyphInfoList")
            .full("m_kerningInfo")
            .full("m_kerningPair")
            .full("normalStyle")
            .full("normalSpacingOffset")
            .full("boldStyle")
            .full("boldSpacing")
            .full("italicStyle")
            .full("tabSize"),
    );
    rules.insert(
        "NGUI_MonoBehavior".to_string(),
        ReplacementRules::new().full("mUVRect").full("mFont"),
    );
    rules.insert(
        "NGUI_Sprite_MonoBehavior".to_string(),
        ReplacementRules::new().full("mSprites").full("mPixelSize"),
    );
    rules
});

/// Replacement tables for the built-in font document types, keyed by type
/// name. The field lists are exactly what font regeneration rewrites.
pub fn builtin_rules() -> &'static HashMap<String, ReplacementRules> {
    &BUILTIN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules_cover_all_types() {
        let rules = builtin_rules();
        for name in BUILTIN_TYPE_ORDER {
            assert!(rules.contains_key(name), "missing rules for {}", name);
        }
    }

    #[test]
    fn test_builtin_textmeshpro_shape() {
        let rules = &builtin_rules()["TextMeshPro_MonoBehavior"];
        match rules.get("m_fontInfo") {
            Some(KeyRule::Subkeys(subkeys)) => {
                assert_eq!(subkeys.len(), 20);
                assert!(subkeys.contains(&"PointSize".to_string()));
            }
            other => panic!("unexpected rule for m_fontInfo: {:?}", other),
        }
        assert_eq!(rules.get("m_glyphInfoList"), Some(&KeyRule::Full));
    }

    #[test]
    fn test_rules_preserve_order() {
        let rules = ReplacementRules::new().full("b").full("a").subkeys("c", &["x"]);
        let keys: Vec<&str> = rules.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_rules_from_json() {
        let rules: ReplacementRules =
            serde_json::from_str(r#"{"whole": null, "partial": ["x", "y"]}"#).unwrap();
        assert_eq!(rules.get("whole"), Some(&KeyRule::Full));
        assert_eq!(
            rules.get("partial"),
            Some(&KeyRule::Subkeys(vec!["x".to_string(), "y".to_string()]))
        );
        let keys: Vec<&str> = rules.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["whole", "partial"]);
    }
}
