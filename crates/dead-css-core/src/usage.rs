//! Turns "which exports are used" into "which selectors are used".

use crate::error::{DeadCssError, MismatchReason};
use crate::exports::{CompiledExports, CSS_EXPORT};
use crate::record::{ModuleRecord, UsedExports};
use css_pruner::SelectorSet;

/// Export name meaning the whole module object escapes.
const DEFAULT_EXPORT: &str = "default";

/// Usage of one module's stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Usage {
    /// Every selector must stay; the module is left untouched.
    KeepAll,
    /// Only these selector tokens are referenced.
    Selectors(SelectorSet),
}

/// Flattens the used exports of `module` into selector tokens.
pub fn used_selectors(
    module: &ModuleRecord,
    exports: &CompiledExports,
) -> Result<Usage, DeadCssError> {
    let names = match &module.used_exports {
        UsedExports::All => return Ok(Usage::KeepAll),
        UsedExports::Names(names) if names.contains(DEFAULT_EXPORT) => return Ok(Usage::KeepAll),
        UsedExports::Names(names) => names,
    };

    let mismatch = |export: &str, reason: MismatchReason| DeadCssError::UsageMismatch {
        module: module.id,
        export: export.to_string(),
        reason,
    };

    let mut selectors = SelectorSet::new();
    for name in names.iter().filter(|name| name.as_str() != CSS_EXPORT) {
        let value = exports
            .get(name)
            .ok_or_else(|| mismatch(name, MismatchReason::Missing))?;
        let value = value
            .as_str()
            .ok_or_else(|| mismatch(name, MismatchReason::NotAString))?;
        if tokens(value).next().is_none() {
            return Err(mismatch(name, MismatchReason::NoSelectors));
        }
        selectors.extend(tokens(value));
    }
    Ok(Usage::Selectors(selectors))
}

/// Resolves configured ignore entries: export names become their selector
/// tokens, anything else is taken as a literal selector.
pub fn ignored_selectors(ignore: &[String], exports: &CompiledExports) -> SelectorSet {
    let mut selectors = SelectorSet::new();
    for entry in ignore {
        match exports.get(entry).and_then(|value| value.as_str()) {
            Some(value) if entry != CSS_EXPORT => selectors.extend(tokens(value)),
            _ => {
                selectors.insert(entry.clone());
            }
        }
    }
    selectors
}

/// Every selector token exported by a module.
pub fn all_selectors(exports: &CompiledExports) -> SelectorSet {
    exports
        .string_exports()
        .flat_map(|(_, value)| tokens(value))
        .collect()
}

fn tokens(value: &str) -> impl Iterator<Item = String> + '_ {
    value.split_whitespace().map(str::to_string)
}
