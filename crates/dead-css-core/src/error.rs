//! Error types for a pruning run.

use crate::record::ModuleId;
use css_module_sandbox::SandboxError;
use css_pruner::PruneError;
use source_map::SourceMapError;
use std::fmt;
use thiserror::Error;

/// A module's generated code failed to evaluate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to compile module {module} ({name})")]
pub struct CompileError {
    pub module: ModuleId,
    pub name: String,
    #[source]
    pub source: SandboxError,
}

/// Why a used export could not be turned into selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchReason {
    /// The module does not export the name.
    Missing,
    /// The export is not a string.
    NotAString,
    /// The export is a string without any selector in it.
    NoSelectors,
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MismatchReason::Missing => "is not exported",
            MismatchReason::NotAString => "is not a selector string",
            MismatchReason::NoSelectors => "contains no selector",
        })
    }
}

/// Errors produced by a pruning run. Only `Compile` is ever retried; every
/// other variant aborts the run before any module is modified.
#[derive(Debug, Error)]
pub enum DeadCssError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Compilation stopped making progress.
    #[error("{} module(s) did not compile after {passes} pass(es): {}", pending.len(), pending.join(", "))]
    Convergence {
        passes: usize,
        /// Names of the modules still failing.
        pending: Vec<String>,
        #[source]
        last: Option<CompileError>,
    },

    /// Usage data names an export the compiled module cannot back.
    #[error("module {module}: used export `{export}` {reason}")]
    UsageMismatch {
        module: ModuleId,
        export: String,
        reason: MismatchReason,
    },

    /// The module source lacks the `// module` ... `// exports` markers.
    #[error("module {module}: `// module` / `// exports` markers not found")]
    PatchSentinelMissing { module: ModuleId },

    /// The rebuilt block does not fit into the original one.
    #[error(
        "module {module}: pruned block needs {new_bytes} bytes / {new_lines} lines \
         but only {old_bytes} bytes / {old_lines} lines are available"
    )]
    PatchOverflow {
        module: ModuleId,
        old_bytes: usize,
        old_lines: usize,
        new_bytes: usize,
        new_lines: usize,
    },

    /// A module to prune has no `$css` export.
    #[error("module {module} does not export a `$css` object with string content")]
    MissingCssMetadata { module: ModuleId },

    /// The source map carried by `$css` or an asset is unusable.
    #[error("{origin}: invalid source map")]
    InvalidSourceMap {
        origin: String,
        #[source]
        source: SourceMapError,
    },

    /// The pruning transform failed.
    #[error("failed to prune {origin}")]
    Prune {
        origin: String,
        #[source]
        source: PruneError,
    },

    /// Extracted-asset mode names an asset that does not exist.
    #[error("asset `{name}` not found")]
    AssetNotFound { name: String },
}
