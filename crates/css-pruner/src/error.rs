//! Pruning error types.

use source_map::SourceMapError;
use thiserror::Error;

/// Why a stylesheet could not be pruned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PruneError {
    /// The stylesheet is not well formed.
    #[error("{file}:{line}:{column}: {message}")]
    Syntax {
        /// Source name of the stylesheet.
        file: String,
        /// 1-indexed line.
        line: u32,
        /// 1-indexed byte column.
        column: u32,
        /// What went wrong.
        message: String,
    },

    /// A selector is outside what the selector policy allows.
    #[error("{file}:{line}:{column}: selector `{selector}` {reason}")]
    DisallowedSelector {
        /// Source name of the stylesheet.
        file: String,
        /// 1-indexed line.
        line: u32,
        /// 1-indexed byte column.
        column: u32,
        /// The offending selector text.
        selector: String,
        /// Which policy it breaks.
        reason: SelectorViolation,
    },

    /// The previous source map could not be applied.
    #[error(transparent)]
    SourceMap(#[from] SourceMapError),
}

/// The policy a disallowed selector breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorViolation {
    /// No class name at all (`div`, `*`, `[type=text]`).
    NoClass,
    /// Contains an id (`#main .a`).
    Id,
    /// A compound without a class next to one with a class (`.a > div`).
    NonClassCombinator,
}

impl std::fmt::Display for SelectorViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SelectorViolation::NoClass => {
                "has no class name (set allowNonClassSelectors to keep it)"
            }
            SelectorViolation::Id => "contains an id (set allowIds to keep it)",
            SelectorViolation::NonClassCombinator => {
                "combines a class with a non-class compound (set allowNonClassCombinators to keep it)"
            }
        };
        f.write_str(text)
    }
}
