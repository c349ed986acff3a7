//! Exports recovered by running a CSS module.

use css_module_sandbox::Exports;
use serde_json::Value;

/// Name of the export carrying the stylesheet itself.
pub const CSS_EXPORT: &str = "$css";

/// Keys the CSS loader's runtime helper leaves on `exports`.
const RUNTIME_KEYS: [&str; 2] = ["toString", "i"];

/// The decoded `$css` export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssMetadata {
    pub content: String,
    /// Source name of `content`.
    pub file: Option<String>,
    pub source_map: Option<Value>,
}

/// Exports of one compiled module. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledExports {
    exports: Exports,
    css: Option<CssMetadata>,
}

impl CompiledExports {
    /// Strips loader runtime keys and decodes `$css`.
    pub fn new(mut exports: Exports) -> Self {
        for key in RUNTIME_KEYS {
            exports.shift_remove(key);
        }
        let css = exports.get(CSS_EXPORT).and_then(decode_css);
        Self { exports, css }
    }

    /// All exports, as seen by importing modules.
    pub fn exports(&self) -> &Exports {
        &self.exports
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.exports.get(name)
    }

    /// The stylesheet, if the module exported a well-formed `$css`.
    pub fn css(&self) -> Option<&CssMetadata> {
        self.css.as_ref()
    }

    /// Every string export except `$css`, as `(name, value)`.
    pub fn string_exports(&self) -> impl Iterator<Item = (&str, &str)> {
        self.exports
            .iter()
            .filter(|(name, _)| name.as_str() != CSS_EXPORT)
            .filter_map(|(name, value)| Some((name.as_str(), value.as_str()?)))
    }
}

fn decode_css(value: &Value) -> Option<CssMetadata> {
    let object = value.as_object()?;
    let content = object.get("content")?.as_str()?.to_string();
    let file = object
        .get("file")
        .and_then(Value::as_str)
        .map(str::to_string);
    let source_map = object
        .get("sourceMap")
        .filter(|map| !map.is_null())
        .cloned();
    Some(CssMetadata {
        content,
        file,
        source_map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smol_str::SmolStr;

    fn exports(value: Value) -> Exports {
        value
            .as_object()
            .into_iter()
            .flatten()
            .map(|(k, v)| (SmolStr::new(k), v.clone()))
            .collect()
    }

    #[test]
    fn test_strips_runtime_keys_and_decodes_css() {
        let compiled = CompiledExports::new(exports(json!({
            "toString": "x",
            "i": "y",
            "$css": { "id": 1, "content": ".a{}", "file": "a.css", "sourceMap": null },
            "a": "a-hash b-hash",
            "n": 1
        })));
        assert!(compiled.get("toString").is_none());
        assert!(compiled.get("i").is_none());
        assert_eq!(
            compiled.css(),
            Some(&CssMetadata {
                content: ".a{}".into(),
                file: Some("a.css".into()),
                source_map: None,
            })
        );
        assert_eq!(
            compiled.string_exports().collect::<Vec<_>>(),
            vec![("a", "a-hash b-hash")]
        );
    }

    #[test]
    fn test_css_without_content_is_absent() {
        let compiled = CompiledExports::new(exports(json!({ "$css": { "id": 1 } })));
        assert_eq!(compiled.css(), None);
    }
}
