//! What the pruner needs to know about one complex selector.

use crate::lexer::{Token, TokenKind};

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SelectorInfo {
    /// Class names outside functional pseudo-classes, unescaped, in order.
    pub classes: Vec<String>,
    pub has_id: bool,
    /// Some compound (between combinators) has no class of its own.
    pub has_classless_compound: bool,
}

#[derive(Default)]
struct Compound {
    non_empty: bool,
    has_class: bool,
}

fn close_compound(compound: &mut Compound, info: &mut SelectorInfo) {
    if compound.non_empty && !compound.has_class {
        info.has_classless_compound = true;
    }
    *compound = Compound::default();
}

pub(crate) fn analyze(source: &str, tokens: &[Token]) -> SelectorInfo {
    let mut info = SelectorInfo::default();
    let mut compound = Compound::default();
    let mut depth = 0usize;
    let mut iter = tokens.iter().peekable();
    while let Some(token) = iter.next() {
        match token.kind {
            TokenKind::LParen | TokenKind::LBracket => {
                depth += 1;
                compound.non_empty = true;
            }
            TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::Combinator => {
                close_compound(&mut compound, &mut info);
            }
            TokenKind::Dot => {
                compound.non_empty = true;
                if let Some(name) = iter.next_if(|t| t.kind == TokenKind::Ident) {
                    compound.has_class = true;
                    info.classes.push(unescape(name.span.text(source)));
                }
            }
            TokenKind::Hash => {
                compound.non_empty = true;
                info.has_id = true;
            }
            _ => compound.non_empty = true,
        }
    }
    close_compound(&mut compound, &mut info);
    info
}

/// Resolves CSS escapes in an identifier (`sm\:flex` → `sm:flex`).
pub(crate) fn unescape(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    let mut chars = ident.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let mut hex = String::new();
        while hex.len() < 6 {
            match chars.next_if(char::is_ascii_hexdigit) {
                Some(digit) => hex.push(digit),
                None => break,
            }
        }
        if hex.is_empty() {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
            continue;
        }
        // A single whitespace terminates a hex escape.
        chars.next_if(|c| c.is_ascii_whitespace());
        let code = u32::from_str_radix(&hex, 16).unwrap_or(0xFFFD);
        out.push(
            char::from_u32(code)
                .filter(|c| *c != '\0')
                .unwrap_or('\u{FFFD}'),
        );
    }
    out
}
