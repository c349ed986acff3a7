//! Splits a stylesheet into the top-level pieces the pruner works on.
//!
//! Declaration blocks and non-conditional at-rules are not looked into; the
//! parser only has to find where each rule starts and ends, which selectors a
//! rule has, and which at-rules contain further rules.

use crate::lexer::{Lexer, Token, TokenKind};
use source_map::Span;
use std::ops::Range;

/// A parsed stylesheet.
#[derive(Debug)]
pub(crate) struct Stylesheet {
    pub tokens: Vec<Token>,
    pub nodes: Vec<Node>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Node {
    Whitespace(Span),
    Comment(Span),
    /// Copied as-is: statement at-rules, non-conditional block at-rules,
    /// stray semicolons.
    Verbatim(Span),
    Rule(Rule),
    /// `@media`, `@supports`, ... whose children are pruned in turn.
    Group(Group),
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Rule {
    /// Selector list with surrounding trivia trimmed, in source order.
    pub selectors: Vec<Selector>,
    /// From the start of the prelude to the closing `}`.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Selector {
    pub span: Span,
    /// Token indices of the selector.
    pub tokens: Range<usize>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Group {
    /// `@media screen {`
    pub head: Span,
    pub children: Vec<Node>,
    /// `}`
    pub close: Span,
}

/// A syntax error at a byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

/// At-rules whose block holds rules rather than declarations.
const CONDITIONAL_GROUPS: &[&str] = &["media", "supports", "document", "layer", "container"];

pub(crate) fn parse(source: &str) -> Result<Stylesheet, SyntaxError> {
    let tokens: Vec<Token> = Lexer::new(source).collect();
    let mut parser = Parser {
        source,
        tokens: &tokens,
        pos: 0,
    };
    let nodes = parser.nodes(false)?;
    Ok(Stylesheet { tokens, nodes })
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn current(&self) -> Token {
        // The lexer always ends with an Eof token.
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let token = self.current();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn error(&self, token: Token, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            offset: token.span.range().start,
            message: message.into(),
        }
    }

    fn nodes(&mut self, nested: bool) -> Result<Vec<Node>, SyntaxError> {
        let mut nodes = Vec::new();
        loop {
            let token = self.current();
            let node = match token.kind {
                TokenKind::Eof if nested => return Err(self.error(token, "unclosed block")),
                TokenKind::Eof => break,
                TokenKind::RBrace if nested => break,
                TokenKind::RBrace => return Err(self.error(token, "unexpected '}'")),
                TokenKind::Whitespace => Node::Whitespace(self.bump().span),
                TokenKind::Comment => Node::Comment(self.bump().span),
                TokenKind::Semicolon => Node::Verbatim(self.bump().span),
                TokenKind::AtKeyword => self.at_rule()?,
                _ => Node::Rule(self.rule()?),
            };
            nodes.push(node);
        }
        Ok(nodes)
    }

    fn at_rule(&mut self) -> Result<Node, SyntaxError> {
        let keyword = self.bump();
        let name = keyword.span.text(self.source)[1..].to_ascii_lowercase();
        let start = keyword.span.start;

        let end = self.prelude_end()?;
        match end.kind {
            TokenKind::LBrace if CONDITIONAL_GROUPS.contains(&name.as_str()) => {
                let open = self.bump();
                let children = self.nodes(true)?;
                let close = self.bump();
                Ok(Node::Group(Group {
                    head: Span::new(start, open.span.end),
                    children,
                    close: close.span,
                }))
            }
            TokenKind::LBrace => {
                let close = self.block()?;
                Ok(Node::Verbatim(Span::new(start, close.span.end)))
            }
            TokenKind::Semicolon => {
                let semi = self.bump();
                Ok(Node::Verbatim(Span::new(start, semi.span.end)))
            }
            // `@import "x"` at the end of the file, or right before `}`.
            _ => Ok(Node::Verbatim(Span::new(start, end.span.start))),
        }
    }

    fn rule(&mut self) -> Result<Rule, SyntaxError> {
        let first = self.pos;
        let start = self.current().span.start;
        let end = self.prelude_end()?;
        if end.kind != TokenKind::LBrace {
            return Err(self.error(end, format!("expected '{{', found {}", end.kind.name())));
        }
        let selectors = self.selectors(first..self.pos);
        let close = self.block()?;
        Ok(Rule {
            selectors,
            span: Span::new(start, close.span.end),
        })
    }

    /// Advances to the `{`, `;`, `}` or end of file that ends a prelude,
    /// skipping over parenthesized and bracketed groups. Does not consume it.
    fn prelude_end(&mut self) -> Result<Token, SyntaxError> {
        let mut depth = 0usize;
        loop {
            let token = self.current();
            match token.kind {
                TokenKind::Eof => return Ok(token),
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| self.error(token, "unbalanced closing bracket"))?;
                }
                TokenKind::LBrace | TokenKind::Semicolon | TokenKind::RBrace if depth == 0 => {
                    return Ok(token);
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// Consumes a `{ ... }` block including nested blocks, returning the `}`.
    fn block(&mut self) -> Result<Token, SyntaxError> {
        let open = self.bump();
        let mut depth = 1usize;
        loop {
            let token = self.bump();
            match token.kind {
                TokenKind::Eof => return Err(self.error(open, "unclosed block")),
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(token);
                    }
                }
                _ => {}
            }
        }
    }

    /// Splits a prelude on top-level commas.
    fn selectors(&self, range: Range<usize>) -> Vec<Selector> {
        let mut selectors = Vec::new();
        let mut depth = 0usize;
        let mut start = range.start;
        for i in range.clone() {
            match self.tokens[i].kind {
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
                TokenKind::Comma if depth == 0 => {
                    selectors.extend(self.trimmed(start..i));
                    start = i + 1;
                }
                _ => {}
            }
        }
        selectors.extend(self.trimmed(start..range.end));
        selectors
    }

    fn trimmed(&self, mut range: Range<usize>) -> Option<Selector> {
        while range.start < range.end && self.tokens[range.start].kind.is_trivia() {
            range.start += 1;
        }
        while range.end > range.start && self.tokens[range.end - 1].kind.is_trivia() {
            range.end -= 1;
        }
        if range.is_empty() {
            return None;
        }
        Some(Selector {
            span: Span::new(
                self.tokens[range.start].span.start,
                self.tokens[range.end - 1].span.end,
            ),
            tokens: range,
        })
    }
}
