//! Removal of unused CSS-module selectors from a bundled module graph.
//!
//! A run has four stages:
//!
//! 1. [`SandboxCompiler`] evaluates each generated CSS module in a sandbox
//!    to recover its exports (class name to selector string, plus `$css`).
//! 2. [`compile_all`] repeats compile passes until modules that import each
//!    other have all been evaluated.
//! 3. [`used_selectors`] turns the host's "used export names" into the set
//!    of selector tokens that must survive.
//! 4. [`patch`] splices the pruned stylesheet back into the module without
//!    changing its length or line count.
//!
//! [`DeadCss`] drives the stages over a whole graph:
//!
//! ```
//! use css_pruner::DeadSelectorPruner;
//! use dead_css_core::{DeadCss, DeadCssOptions, ModuleId, ModuleRecord, UsedExports};
//!
//! let source = "// module\n\
//! export const $css = {\n\
//! \t id: module.id,\n\
//! \t content: \".a_x{color:red}\\n.b_x{color:blue}\",\n\
//! \t imports: []\n\
//! }\n\
//! // exports\n\
//! export const a = \"a_x\";\n\
//! export const b = \"b_x\";\n";
//!
//! let mut modules = vec![ModuleRecord {
//!     id: ModuleId(1),
//!     context: "/app".into(),
//!     name: "css-loader!./styles.css".into(),
//!     request: None,
//!     source: source.to_string(),
//!     stages: vec!["css-loader".into()],
//!     used_exports: UsedExports::names(["a"]),
//! }];
//!
//! let run = DeadCss::new(DeadCssOptions::default(), DeadSelectorPruner);
//! let summary = run.run(&mut modules, &mut []).unwrap();
//! assert_eq!(summary.patched, 1);
//! assert!(!modules[0].source.contains("b_x{"));
//! assert_eq!(modules[0].source.len(), source.len());
//! ```

mod cache;
mod compiler;
mod error;
mod exports;
mod options;
mod patch;
mod path;
mod record;
mod run;
mod scheduler;
mod usage;

pub use cache::ModuleCache;
pub use compiler::SandboxCompiler;
pub use error::{CompileError, DeadCssError, MismatchReason};
pub use exports::{CompiledExports, CssMetadata, CSS_EXPORT};
pub use options::{DeadCssOptions, DEFAULT_LOADER};
pub use patch::{build_css_block, patch, rewrite_map_sources, EXPORTS_MARKER, MODULE_MARKER};
pub use path::{normalize, resolve_reference, strip_loader_prefix};
pub use record::{CssAsset, ModuleId, ModuleRecord, UsedExports};
pub use run::{DeadCss, RunSummary};
pub use scheduler::{compile_all, ModuleState, SchedulerReport};
pub use usage::{all_selectors, ignored_selectors, used_selectors, Usage};
