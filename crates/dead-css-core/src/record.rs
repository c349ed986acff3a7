//! The host's view of a CSS module, as handed to a run.

use camino::Utf8PathBuf;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable numeric identity of a module within one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(pub u32);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One module of the host's graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    pub id: ModuleId,
    /// Directory relative references are resolved against.
    pub context: Utf8PathBuf,
    /// Resource name, possibly behind a loader chain (`loader!./a.css`).
    pub name: String,
    /// Full request; names the pruned stylesheet in its source map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    /// Generated module code. Replaced when the module is pruned.
    pub source: String,
    /// Loader stages applied to the module, outermost first.
    #[serde(default)]
    pub stages: Vec<String>,
    #[serde(default)]
    pub used_exports: UsedExports,
}

/// Which exports of a module the rest of the build references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UsedExportsRepr", into = "UsedExportsRepr")]
pub enum UsedExports {
    /// Usage is unknown or total; nothing may be removed.
    #[default]
    All,
    /// Exactly these names are used.
    Names(IndexSet<String>),
}

impl UsedExports {
    /// Builds a usage list from names.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        UsedExports::Names(names.into_iter().map(Into::into).collect())
    }
}

/// Wire form: `true` for all, `false` for none, or a list of names.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum UsedExportsRepr {
    Flag(bool),
    Names(IndexSet<String>),
}

impl From<UsedExportsRepr> for UsedExports {
    fn from(repr: UsedExportsRepr) -> Self {
        match repr {
            UsedExportsRepr::Flag(true) => UsedExports::All,
            UsedExportsRepr::Flag(false) => UsedExports::Names(IndexSet::new()),
            UsedExportsRepr::Names(names) => UsedExports::Names(names),
        }
    }
}

impl From<UsedExports> for UsedExportsRepr {
    fn from(used: UsedExports) -> Self {
        match used {
            UsedExports::All => UsedExportsRepr::Flag(true),
            UsedExports::Names(names) => UsedExportsRepr::Names(names),
        }
    }
}

/// A stylesheet emitted as a separate file (extracted-asset mode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CssAsset {
    pub name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_used_exports_wire_forms() {
        let parse = |value| serde_json::from_value::<UsedExports>(value).unwrap();
        assert_eq!(parse(json!(true)), UsedExports::All);
        assert_eq!(parse(json!(false)), UsedExports::Names(IndexSet::new()));
        assert_eq!(parse(json!(["b", "a"])), UsedExports::names(["b", "a"]));
        assert_eq!(
            serde_json::to_value(UsedExports::names(["x"])).unwrap(),
            json!(["x"])
        );
    }

    #[test]
    fn test_module_record_defaults() {
        let record: ModuleRecord = serde_json::from_value(json!({
            "id": 4,
            "context": "/app/src",
            "name": "/app/node_modules/css-loader/index.js!/app/src/a.css",
            "source": ""
        }))
        .unwrap();
        assert_eq!(record.id, ModuleId(4));
        assert_eq!(record.used_exports, UsedExports::All);
        assert!(record.stages.is_empty());
        assert_eq!(record.id.to_string(), "#4");
    }
}
