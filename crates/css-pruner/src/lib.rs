//! Dead-selector removal for CSS-module stylesheets.
//!
//! A [`CssPruner`] receives a stylesheet together with the class names that
//! are known to be used and returns the stylesheet without the rules nobody
//! can match, plus a source map back to the input. [`DeadSelectorPruner`] is
//! the default implementation; callers that want a different notion of
//! "unused" implement the trait themselves.
//!
//! ```
//! use css_pruner::{CssPruner, DeadSelectorPruner, PruneRequest, SelectorSet};
//!
//! let used = SelectorSet::from(["title_x".to_string()]);
//! let ignore = SelectorSet::new();
//! let request = PruneRequest::new(".title_x{color:red}\n.body_x{color:blue}", &used, &ignore);
//! let output = DeadSelectorPruner.prune(request).unwrap();
//! assert_eq!(output.css, ".title_x{color:red}");
//! ```

mod error;
mod lexer;
mod parser;
mod prune;
mod selector;

pub use error::{PruneError, SelectorViolation};
pub use lexer::{Lexer, Token, TokenKind};
pub use prune::DeadSelectorPruner;

use indexmap::IndexSet;
use source_map::SourceMapV3;

/// An ordered set of selector tokens (class names or literal selectors).
pub type SelectorSet = IndexSet<String>;

/// Which selector shapes may appear in a pruned stylesheet.
///
/// Selectors that are not plain class selectors cannot be judged by class
/// usage alone, so by default they are rejected instead of silently kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectorPolicy {
    /// Allow selectors containing an id (`#main .a`).
    pub allow_ids: bool,
    /// Keep selectors without any class (`body`, `*`).
    pub allow_non_class_selectors: bool,
    /// Allow class selectors combined with non-class compounds (`.a > div`).
    pub allow_non_class_combinators: bool,
}

/// Input of one pruning call.
#[derive(Debug, Clone, Copy)]
pub struct PruneRequest<'a> {
    /// The stylesheet text.
    pub css: &'a str,
    /// Source name of `css`, used in errors and as the map's source.
    pub from: &'a str,
    /// Name of the output, recorded as the map's `file`.
    pub to: &'a str,
    /// Map from `css` back to the files it was generated from.
    pub prev_map: Option<&'a SourceMapV3>,
    /// Class names in use.
    pub used: &'a SelectorSet,
    /// Class names or literal selectors that are always kept.
    pub ignore: &'a SelectorSet,
    pub policy: SelectorPolicy,
    /// Produce a source map.
    pub emit_map: bool,
}

impl<'a> PruneRequest<'a> {
    /// A request with default policy, no source names and no map.
    pub fn new(css: &'a str, used: &'a SelectorSet, ignore: &'a SelectorSet) -> Self {
        Self {
            css,
            from: "",
            to: "",
            prev_map: None,
            used,
            ignore,
            policy: SelectorPolicy::default(),
            emit_map: false,
        }
    }
}

/// Result of one pruning call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneOutput {
    /// The pruned stylesheet.
    pub css: String,
    /// Present when the request asked for a map.
    pub map: Option<SourceMapV3>,
}

/// A stylesheet transform that drops unused selectors.
///
/// Implementations must be shareable across threads: modules are pruned in
/// parallel against the same pruner.
pub trait CssPruner: Sync {
    /// Prunes `request.css`.
    fn prune(&self, request: PruneRequest<'_>) -> Result<PruneOutput, PruneError>;
}

impl<P: CssPruner + ?Sized> CssPruner for &P {
    fn prune(&self, request: PruneRequest<'_>) -> Result<PruneOutput, PruneError> {
        (**self).prune(request)
    }
}

impl<P: CssPruner + ?Sized + Send> CssPruner for Box<P> {
    fn prune(&self, request: PruneRequest<'_>) -> Result<PruneOutput, PruneError> {
        (**self).prune(request)
    }
}
