//! Options of a pruning run.

use crate::record::ModuleRecord;
use camino::Utf8Path;
use css_pruner::SelectorPolicy;
use serde::{Deserialize, Serialize};

/// Stage that marks a module as generated by the CSS loader.
pub const DEFAULT_LOADER: &str = "css-loader";

/// Options accepted by [`DeadCss`](crate::DeadCss), in the camelCase JSON
/// shape of a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DeadCssOptions {
    /// Export names or literal selectors that are never removed.
    pub ignore: Vec<String>,
    pub allow_ids: bool,
    pub allow_non_class_selectors: bool,
    pub allow_non_class_combinators: bool,
    /// Prune this extracted asset once instead of patching each module.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Stage identifier a module must carry to be pruned.
    pub loader: String,
}

impl Default for DeadCssOptions {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            allow_ids: false,
            allow_non_class_selectors: false,
            allow_non_class_combinators: false,
            filename: None,
            loader: DEFAULT_LOADER.to_string(),
        }
    }
}

impl DeadCssOptions {
    /// The selector policy forwarded to the pruner.
    pub fn policy(&self) -> SelectorPolicy {
        SelectorPolicy {
            allow_ids: self.allow_ids,
            allow_non_class_selectors: self.allow_non_class_selectors,
            allow_non_class_combinators: self.allow_non_class_combinators,
        }
    }

    /// Whether `module` went through the configured loader.
    ///
    /// A stage matches when it is the loader name itself or a path with a
    /// component of that name (`/app/node_modules/css-loader/index.js`).
    pub fn qualifies(&self, module: &ModuleRecord) -> bool {
        module.stages.iter().any(|stage| {
            stage == &self.loader
                || Utf8Path::new(stage)
                    .components()
                    .any(|component| component.as_str() == self.loader)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ModuleId, UsedExports};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn with_stages(stages: &[&str]) -> ModuleRecord {
        ModuleRecord {
            id: ModuleId(1),
            context: "/".into(),
            name: "a.css".into(),
            request: None,
            source: String::new(),
            stages: stages.iter().map(|s| s.to_string()).collect(),
            used_exports: UsedExports::All,
        }
    }

    #[test]
    fn test_defaults_from_empty_object() {
        let options: DeadCssOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(options, DeadCssOptions::default());
        assert_eq!(options.loader, "css-loader");
        assert_eq!(options.policy(), SelectorPolicy::default());
    }

    #[test]
    fn test_camel_case_keys() {
        let options: DeadCssOptions = serde_json::from_value(json!({
            "ignore": ["title"],
            "allowIds": true,
            "allowNonClassCombinators": true,
            "filename": "main.css"
        }))
        .unwrap();
        assert_eq!(options.ignore, vec!["title"]);
        assert_eq!(
            options.policy(),
            SelectorPolicy {
                allow_ids: true,
                allow_non_class_selectors: false,
                allow_non_class_combinators: true,
            }
        );
        assert_eq!(options.filename.as_deref(), Some("main.css"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(serde_json::from_value::<DeadCssOptions>(json!({ "allowId": true })).is_err());
    }

    #[test]
    fn test_qualifies() {
        let options = DeadCssOptions::default();
        assert!(options.qualifies(&with_stages(&["css-loader"])));
        assert!(options.qualifies(&with_stages(&[
            "/app/node_modules/style-loader/index.js",
            "/app/node_modules/css-loader/index.js",
        ])));
        assert!(!options.qualifies(&with_stages(&["/app/node_modules/css-loader-extra/index.js"])));
        assert!(!options.qualifies(&with_stages(&[])));
    }
}
