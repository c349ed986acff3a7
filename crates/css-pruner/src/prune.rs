//! The default pruning transform.

use crate::error::{PruneError, SelectorViolation};
use crate::parser::{self, Node, Rule, Selector, Stylesheet};
use crate::selector::analyze;
use crate::{CssPruner, PruneOutput, PruneRequest};
use source_map::{LineIndex, SourceMapBuilder, Span};
use text_size::TextSize;

/// Removes rules whose selectors reference unused classes.
///
/// A selector survives when its trimmed text is in the ignore set, or when
/// every class it names outside functional pseudo-classes is used or
/// ignored. Rules keep their surviving selectors, joined by `, `; rules with
/// none are removed along with the whitespace before them. `@media`,
/// `@supports`, `@document`, `@layer` and `@container` blocks are pruned
/// recursively and removed once empty. Every other at-rule and the ICSS
/// `:export`/`:import` blocks are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadSelectorPruner;

impl CssPruner for DeadSelectorPruner {
    #[tracing::instrument(level = "debug", skip_all, fields(from = request.from))]
    fn prune(&self, request: PruneRequest<'_>) -> Result<PruneOutput, PruneError> {
        let sheet = parser::parse(request.css).map_err(|e| {
            let (line, column) = position(request.css, e.offset);
            PruneError::Syntax {
                file: request.from.to_string(),
                line,
                column,
                message: e.message,
            }
        })?;

        let mut pass = Pass {
            request: &request,
            sheet: &sheet,
            removed: 0,
        };
        let mut pieces = Vec::new();
        pass.plan(&sheet.nodes, &mut pieces)?;
        tracing::debug!(removed = pass.removed, "pruned stylesheet");

        let (css, builder) = emit(request.css, &pieces);
        let map = if request.emit_map {
            let mut map = builder.build().to_v3(request.css, &css, request.from)?;
            if let Some(previous) = request.prev_map {
                map = map.compose(previous)?;
            }
            map.file = Some(request.to.to_string());
            Some(map)
        } else {
            None
        };

        Ok(PruneOutput { css, map })
    }
}

/// Output plan, produced before any text is written so that empty groups can
/// be dropped together with their head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Whitespace(Span),
    Copy(Span),
    /// `, ` between surviving selectors.
    Separator,
    /// A removed node; swallows the whitespace before it.
    Drop,
}

struct Pass<'r, 'a> {
    request: &'r PruneRequest<'a>,
    sheet: &'r Stylesheet,
    removed: usize,
}

impl Pass<'_, '_> {
    /// Appends the plan for `nodes`; returns whether anything but trivia
    /// survived.
    fn plan(&mut self, nodes: &[Node], pieces: &mut Vec<Piece>) -> Result<bool, PruneError> {
        let mut live = false;
        for node in nodes {
            match node {
                Node::Whitespace(span) => pieces.push(Piece::Whitespace(*span)),
                Node::Comment(span) => pieces.push(Piece::Copy(*span)),
                Node::Verbatim(span) => {
                    pieces.push(Piece::Copy(*span));
                    live = true;
                }
                Node::Rule(rule) => live |= self.plan_rule(rule, pieces)?,
                Node::Group(group) => {
                    let mut inner = Vec::new();
                    if self.plan(&group.children, &mut inner)? {
                        pieces.push(Piece::Copy(group.head));
                        pieces.extend(inner);
                        pieces.push(Piece::Copy(group.close));
                        live = true;
                    } else {
                        pieces.push(Piece::Drop);
                    }
                }
            }
        }
        Ok(live)
    }

    fn plan_rule(&mut self, rule: &Rule, pieces: &mut Vec<Piece>) -> Result<bool, PruneError> {
        let css = self.request.css;
        if is_icss(rule, css) {
            pieces.push(Piece::Copy(rule.span));
            return Ok(true);
        }

        let mut kept = Vec::with_capacity(rule.selectors.len());
        for selector in &rule.selectors {
            if self.keep(selector)? {
                kept.push(selector);
            } else {
                tracing::trace!(selector = selector.span.text(css), "removing selector");
                self.removed += 1;
            }
        }

        match (kept.as_slice(), rule.selectors.last()) {
            ([], _) | (_, None) => {
                pieces.push(Piece::Drop);
                Ok(false)
            }
            (kept, Some(_)) if kept.len() == rule.selectors.len() => {
                pieces.push(Piece::Copy(rule.span));
                Ok(true)
            }
            (kept, Some(last)) => {
                for (i, selector) in kept.iter().enumerate() {
                    if i > 0 {
                        pieces.push(Piece::Separator);
                    }
                    pieces.push(Piece::Copy(selector.span));
                }
                // Whitespace before `{` and the declaration block.
                pieces.push(Piece::Copy(Span::new(last.span.end, rule.span.end)));
                Ok(true)
            }
        }
    }

    fn keep(&self, selector: &Selector) -> Result<bool, PruneError> {
        let request = self.request;
        let text = selector.span.text(request.css);
        if request.ignore.contains(text) {
            return Ok(true);
        }

        let info = analyze(request.css, &self.sheet.tokens[selector.tokens.clone()]);
        let policy = request.policy;
        if info.classes.is_empty() {
            return if policy.allow_non_class_selectors {
                Ok(true)
            } else {
                Err(self.disallowed(selector, SelectorViolation::NoClass))
            };
        }
        if info.has_id && !policy.allow_ids {
            return Err(self.disallowed(selector, SelectorViolation::Id));
        }
        if info.has_classless_compound && !policy.allow_non_class_combinators {
            return Err(self.disallowed(selector, SelectorViolation::NonClassCombinator));
        }

        Ok(info.classes.iter().all(|class| {
            request.used.contains(class.as_str()) || request.ignore.contains(class.as_str())
        }))
    }

    fn disallowed(&self, selector: &Selector, reason: SelectorViolation) -> PruneError {
        let (line, column) = position(self.request.css, selector.span.range().start);
        PruneError::DisallowedSelector {
            file: self.request.from.to_string(),
            line,
            column,
            selector: selector.span.text(self.request.css).to_string(),
            reason,
        }
    }
}

/// `:export { ... }` and `:import("...") { ... }` blocks carry ICSS data.
fn is_icss(rule: &Rule, css: &str) -> bool {
    rule.selectors.first().is_some_and(|selector| {
        let text = selector.span.text(css);
        text == ":export" || text.starts_with(":import")
    })
}

/// Writes the planned output, recording every copied span.
fn emit(css: &str, pieces: &[Piece]) -> (String, SourceMapBuilder) {
    let mut emitter = Emitter {
        css,
        out: String::with_capacity(css.len()),
        builder: SourceMapBuilder::new(),
        pending: None,
    };
    for piece in pieces {
        match *piece {
            Piece::Whitespace(span) => {
                if let Some(previous) = emitter.pending.replace(span) {
                    emitter.copy(previous);
                }
            }
            Piece::Drop => emitter.pending = None,
            Piece::Copy(span) => {
                emitter.flush();
                emitter.copy(span);
            }
            Piece::Separator => {
                emitter.flush();
                emitter.out.push_str(", ");
                emitter.builder.add_generated(", ");
            }
        }
    }
    emitter.flush();
    (emitter.out, emitter.builder)
}

struct Emitter<'a> {
    css: &'a str,
    out: String,
    builder: SourceMapBuilder,
    /// Whitespace that is written only if the next node survives.
    pending: Option<Span>,
}

impl Emitter<'_> {
    fn copy(&mut self, span: Span) {
        self.out.push_str(span.text(self.css));
        self.builder.add_source(span);
    }

    fn flush(&mut self) {
        if let Some(span) = self.pending.take() {
            self.copy(span);
        }
    }
}

/// 1-indexed line and byte column of `offset`.
fn position(css: &str, offset: usize) -> (u32, u32) {
    let at = LineIndex::new(css).line_col(TextSize::from(offset as u32));
    (at.line + 1, at.col + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SelectorPolicy, SelectorSet};
    use pretty_assertions::assert_eq;

    fn set(items: &[&str]) -> SelectorSet {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn prune(css: &str, used: &[&str], ignore: &[&str]) -> String {
        let used = set(used);
        let ignore = set(ignore);
        DeadSelectorPruner
            .prune(PruneRequest::new(css, &used, &ignore))
            .unwrap()
            .css
    }

    #[test]
    fn test_removes_rule_with_leading_whitespace() {
        assert_eq!(
            prune(".a{x:1}\n.b{x:2}\n.c{x:3}\n", &["a", "c"], &[]),
            ".a{x:1}\n.c{x:3}\n"
        );
    }

    #[test]
    fn test_partial_rule_rejoins_selectors() {
        assert_eq!(
            prune(".a,\n.b , .c {x:1}", &["a", "c"], &[]),
            ".a, .c {x:1}"
        );
    }

    #[test]
    fn test_compound_needs_every_class() {
        assert_eq!(prune(".a.b{x:1} .a{x:2}", &["a"], &[]), " .a{x:2}");
    }

    #[test]
    fn test_ignore_by_class_and_literal() {
        assert_eq!(prune(".a{x:1} .b{x:2}", &[], &["b"]), " .b{x:2}");
        let policy = SelectorPolicy {
            allow_non_class_combinators: true,
            ..SelectorPolicy::default()
        };
        let used = set(&[]);
        let ignore = set(&[".a > span"]);
        let request = PruneRequest {
            policy,
            ..PruneRequest::new(".a > span{x:1}", &used, &ignore)
        };
        assert_eq!(DeadSelectorPruner.prune(request).unwrap().css, ".a > span{x:1}");
    }

    #[test]
    fn test_empty_media_is_removed() {
        let css = "@media (x) {\n  .a{x:1}\n}\n@media (y) {\n  .b{x:1}\n}\n";
        assert_eq!(prune(css, &["b"], &[]), "\n@media (y) {\n  .b{x:1}\n}\n");
    }

    #[test]
    fn test_keeps_other_at_rules_and_icss() {
        let css = "@keyframes spin { from { x: 1 } }\n:export { a: b; }\n.gone{}";
        assert_eq!(
            prune(css, &[], &[]),
            "@keyframes spin { from { x: 1 } }\n:export { a: b; }"
        );
    }

    #[test]
    fn test_policy_errors() {
        let used = set(&["a"]);
        let ignore = set(&[]);
        let error = |css: &str| {
            DeadSelectorPruner
                .prune(PruneRequest::new(css, &used, &ignore))
                .unwrap_err()
        };
        assert!(matches!(
            error("body{}"),
            PruneError::DisallowedSelector { reason: SelectorViolation::NoClass, .. }
        ));
        assert!(matches!(
            error("\n#x .a{}"),
            PruneError::DisallowedSelector { reason: SelectorViolation::Id, line: 2, column: 1, .. }
        ));
        assert!(matches!(
            error(".a > div{}"),
            PruneError::DisallowedSelector { reason: SelectorViolation::NonClassCombinator, .. }
        ));
    }

    #[test]
    fn test_allow_non_class_selectors_keeps_them() {
        let used = set(&[]);
        let ignore = set(&[]);
        let request = PruneRequest {
            policy: SelectorPolicy {
                allow_non_class_selectors: true,
                ..SelectorPolicy::default()
            },
            ..PruneRequest::new("html{x:1}\n.a{x:2}", &used, &ignore)
        };
        assert_eq!(DeadSelectorPruner.prune(request).unwrap().css, "html{x:1}");
    }

    #[test]
    fn test_syntax_error_position() {
        let used = set(&[]);
        let ignore = set(&[]);
        let request = PruneRequest {
            from: "a.css",
            ..PruneRequest::new(".a{}\n  }", &used, &ignore)
        };
        let err = DeadSelectorPruner.prune(request).unwrap_err();
        assert_eq!(err.to_string(), "a.css:2:3: unexpected '}'");
    }
}
