//! The sandbox's only connection to other modules.

use indexmap::IndexMap;
use smol_str::SmolStr;

/// Exports of an evaluated module, in declaration order.
pub type Exports = IndexMap<SmolStr, serde_json::Value>;

/// Answers `import`/`require` requests made by a module under evaluation.
pub trait ModuleResolver {
    /// Returns the exports for `specifier` exactly as written in the source,
    /// or `None` when the module is unknown (observed as `undefined`).
    fn resolve(&self, specifier: &str) -> Option<Exports>;
}

impl<F> ModuleResolver for F
where
    F: Fn(&str) -> Option<Exports>,
{
    fn resolve(&self, specifier: &str) -> Option<Exports> {
        self(specifier)
    }
}
