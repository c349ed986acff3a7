//! Runs generated module code in the sandbox and caches its exports.

use crate::cache::ModuleCache;
use crate::error::CompileError;
use crate::exports::CompiledExports;
use crate::path::{normalize, resolve_reference, strip_loader_prefix};
use crate::record::ModuleRecord;
use camino::{Utf8Path, Utf8PathBuf};
use css_module_sandbox::{Exports, ModuleResolver, Sandbox};
use std::sync::Arc;

/// Compiles modules one at a time against a shared [`ModuleCache`].
#[derive(Debug, Default)]
pub struct SandboxCompiler {
    cache: ModuleCache,
    last_error: Option<CompileError>,
}

impl SandboxCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key of a module: its de-prefixed name resolved from its context.
    pub fn module_key(module: &ModuleRecord) -> Utf8PathBuf {
        normalize(&module.context.join(strip_loader_prefix(&module.name)))
    }

    /// Compiles `module` unless it is already cached.
    ///
    /// Returns false when evaluation failed; the error is kept as
    /// [`last_error`](Self::last_error) and the cache is left untouched.
    pub fn compile(&mut self, module: &ModuleRecord) -> bool {
        let key = Self::module_key(module);
        if self.cache.contains_path(&key) {
            return true;
        }

        let resolver = CacheResolver {
            cache: &self.cache,
            context: &module.context,
        };
        let result = Sandbox::new(&resolver)
            .module_id(module.id.0)
            .run(key.as_str(), &module.source);

        match result {
            Ok(exports) => {
                tracing::trace!(module = %module.id, path = %key, "compiled");
                let compiled = Arc::new(CompiledExports::new(exports));
                self.cache.insert(key, module.id, compiled);
                true
            }
            Err(source) => {
                tracing::trace!(module = %module.id, error = %source, "compile failed");
                self.last_error = Some(CompileError {
                    module: module.id,
                    name: module.name.clone(),
                    source,
                });
                false
            }
        }
    }

    /// The most recent compile failure.
    pub fn last_error(&self) -> Option<&CompileError> {
        self.last_error.as_ref()
    }

    pub fn take_last_error(&mut self) -> Option<CompileError> {
        self.last_error.take()
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    pub fn into_cache(self) -> ModuleCache {
        self.cache
    }
}

/// Answers imports from the cache, relative to the importing module.
struct CacheResolver<'a> {
    cache: &'a ModuleCache,
    context: &'a Utf8Path,
}

impl ModuleResolver for CacheResolver<'_> {
    fn resolve(&self, specifier: &str) -> Option<Exports> {
        // The loader's runtime helper; its behavior is irrelevant here.
        if specifier.contains("css-base") {
            return Some(Exports::new());
        }
        let path = resolve_reference(self.context, specifier);
        self.cache
            .get_path(&path)
            .map(|compiled| compiled.exports().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ModuleId, UsedExports};

    fn module(id: u32, name: &str, source: &str) -> ModuleRecord {
        ModuleRecord {
            id: ModuleId(id),
            context: "/app/src".into(),
            name: format!("/app/node_modules/css-loader/index.js!/app/src/{name}"),
            request: None,
            source: source.to_string(),
            stages: vec!["css-loader".into()],
            used_exports: UsedExports::All,
        }
    }

    #[test]
    fn test_module_key_strips_loaders() {
        assert_eq!(
            SandboxCompiler::module_key(&module(1, "a.css", "")),
            "/app/src/a.css"
        );
    }

    #[test]
    fn test_compile_is_idempotent() {
        let mut compiler = SandboxCompiler::new();
        let a = module(1, "a.css", r#"export const a = "a-hash";"#);
        assert!(compiler.compile(&a));
        let snapshot = compiler.cache().clone();

        // A different body under the same key is not re-run.
        let changed = module(1, "a.css", r#"export const a = "other";"#);
        assert!(compiler.compile(&changed));
        assert_eq!(compiler.cache(), &snapshot);
    }

    #[test]
    fn test_failure_leaves_cache_untouched() {
        let mut compiler = SandboxCompiler::new();
        let b = module(2, "b.css", r#"import * as a from "./a.css"; export const b = a.a;"#);
        assert!(!compiler.compile(&b));
        assert!(compiler.cache().is_empty());
        assert_eq!(compiler.last_error().map(|e| e.module), Some(ModuleId(2)));

        assert!(compiler.compile(&module(1, "a.css", r#"export const a = "a-hash";"#)));
        assert!(compiler.compile(&b));
        let compiled = compiler.cache().get_id(ModuleId(2)).unwrap();
        assert_eq!(compiled.get("b").and_then(|v| v.as_str()), Some("a-hash"));
    }

    #[test]
    fn test_css_base_resolves_to_empty_runtime() {
        let mut compiler = SandboxCompiler::new();
        let source = r#"
            exports = module.exports = require("../node_modules/css-loader/lib/css-base.js");
            exports.locals = { a: "a-hash" };
        "#;
        assert!(compiler.compile(&module(3, "c.css", source)));
        let compiled = compiler.cache().get_id(ModuleId(3)).unwrap();
        assert_eq!(compiled.get("locals"), Some(&serde_json::json!({ "a": "a-hash" })));
    }
}
