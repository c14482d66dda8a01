//! Manifest text lookup over toolkit responses.
//!
//! Toolkit releases wrap the same `manifest.instructions.value` leaf at
//! different depths. Templates are tried in order, newest (most deeply
//! wrapped) shape first. New shapes get appended with
//! [`ManifestExtractor::with_prefix`]; existing templates stay so older
//! toolkit builds keep decoding.

use serde_json::Value;

/// Field sequence every template ends with.
pub const MANIFEST_SUFFIX: [&str; 3] = ["manifest", "instructions", "value"];

/// Known prefixes, in precedence order.
pub const DEFAULT_PREFIXES: [&[&str]; 3] = [&["signed_intent", "intent"], &["intent"], &[]];

/// Walk `path` through nested objects. Missing keys, non-objects and
/// `null` anywhere along the way (leaf included) all yield `None`.
pub fn resolve_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, key| current.get(key))
        .filter(|leaf| !leaf.is_null())
}

#[derive(Debug, Clone)]
pub struct ManifestExtractor {
    templates: Vec<Vec<String>>,
}

impl Default for ManifestExtractor {
    fn default() -> Self {
        let mut extractor = Self {
            templates: Vec::new(),
        };
        for prefix in DEFAULT_PREFIXES {
            extractor = extractor.with_prefix(prefix);
        }
        extractor
    }
}

impl ManifestExtractor {
    /// Append a template `prefix + manifest.instructions.value` after the existing ones.
    pub fn with_prefix(mut self, prefix: &[&str]) -> Self {
        let template = prefix
            .iter()
            .chain(MANIFEST_SUFFIX.iter())
            .map(|segment| segment.to_string())
            .collect();
        self.templates.push(template);
        self
    }

    pub fn templates(&self) -> &[Vec<String>] {
        &self.templates
    }

    /// First template that resolves to a string leaf.
    pub fn extract(&self, response: &Value) -> Option<String> {
        self.templates.iter().find_map(|template| {
            let path: Vec<&str> = template.iter().map(String::as_str).collect();
            resolve_path(response, &path)
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
    }
}

/// [`ManifestExtractor::default`] applied to `response`.
pub fn extract_manifest_text(response: &Value) -> Option<String> {
    ManifestExtractor::default().extract(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_template_order() {
        let extractor = ManifestExtractor::default();
        let joined: Vec<String> = extractor.templates().iter().map(|t| t.join(".")).collect();
        assert_eq!(
            joined,
            vec![
                "signed_intent.intent.manifest.instructions.value",
                "intent.manifest.instructions.value",
                "manifest.instructions.value",
            ]
        );
    }

    #[test]
    fn test_signed_intent_wins_over_bare_manifest() {
        let response = json!({
            "signed_intent": { "intent": { "manifest": { "instructions": { "value": "A" } } } },
            "manifest": { "instructions": { "value": "B" } }
        });
        assert_eq!(extract_manifest_text(&response).as_deref(), Some("A"));
    }

    #[test]
    fn test_bare_manifest_alone() {
        let response = json!({ "manifest": { "instructions": { "value": "B" } } });
        assert_eq!(extract_manifest_text(&response).as_deref(), Some("B"));
    }

    #[test]
    fn test_intent_prefix() {
        let response = json!({
            "intent": { "manifest": { "instructions": { "kind": "String", "value": "CALL_METHOD ..." } } }
        });
        assert_eq!(
            extract_manifest_text(&response).as_deref(),
            Some("CALL_METHOD ...")
        );
    }

    #[test]
    fn test_absent_is_not_error() {
        assert_eq!(extract_manifest_text(&json!({ "foo": 1 })), None);
        assert_eq!(extract_manifest_text(&json!(null)), None);
        assert_eq!(extract_manifest_text(&json!([1, 2, 3])), None);
    }

    #[test]
    fn test_null_intermediate_falls_through() {
        let response = json!({
            "signed_intent": null,
            "intent": { "manifest": null },
            "manifest": { "instructions": { "value": "B" } }
        });
        assert_eq!(extract_manifest_text(&response).as_deref(), Some("B"));
    }

    #[test]
    fn test_non_string_leaf_falls_through() {
        // Parsed 格式下 value 是数组，不算命中
        let response = json!({
            "intent": { "manifest": { "instructions": { "value": [{ "instruction": "CALL_METHOD" }] } } },
            "manifest": { "instructions": { "value": "B" } }
        });
        assert_eq!(extract_manifest_text(&response).as_deref(), Some("B"));
    }

    #[test]
    fn test_appended_prefix_is_tried_last() {
        let extractor = ManifestExtractor::default().with_prefix(&["result", "transaction"]);
        let response = json!({
            "result": { "transaction": { "manifest": { "instructions": { "value": "C" } } } }
        });
        assert_eq!(extractor.extract(&response).as_deref(), Some("C"));

        let both = json!({
            "result": { "transaction": { "manifest": { "instructions": { "value": "C" } } } },
            "manifest": { "instructions": { "value": "B" } }
        });
        assert_eq!(extractor.extract(&both).as_deref(), Some("B"));
    }

    #[test]
    fn test_resolve_path() {
        let value = json!({ "a": { "b": { "c": 3 } }, "n": null });
        assert_eq!(resolve_path(&value, &["a", "b", "c"]), Some(&json!(3)));
        assert_eq!(resolve_path(&value, &["a", "x"]), None);
        assert_eq!(resolve_path(&value, &["n"]), None);
        assert_eq!(resolve_path(&value, &[]), Some(&value));
    }
}
