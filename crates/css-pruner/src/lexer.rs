//! CSS lexer using logos.
//!
//! Only the tokens that matter for finding rule boundaries and reading
//! selectors are distinguished. Declaration blocks are treated as opaque
//! token runs by the parser, so numbers, units and operators all fall into
//! [`TokenKind::Delim`].

use logos::Logos;
use source_map::Span;

/// A token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The span of the token in the source.
    pub span: Span,
}

/// Token kinds for CSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Logos, Default)]
pub enum TokenKind {
    /// Spaces, tabs and newlines.
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    /// `/* ... */`
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    Comment,

    /// A quoted string.
    #[regex(r#""([^"\\\n]|\\(.|\n))*""#)]
    #[regex(r#"'([^'\\\n]|\\(.|\n))*'"#)]
    String,

    /// `{`
    #[token("{")]
    LBrace,

    /// `}`
    #[token("}")]
    RBrace,

    /// `;`
    #[token(";")]
    Semicolon,

    /// `,`
    #[token(",")]
    Comma,

    /// `(`
    #[token("(")]
    LParen,

    /// `)`
    #[token(")")]
    RParen,

    /// `[`
    #[token("[")]
    LBracket,

    /// `]`
    #[token("]")]
    RBracket,

    /// `@media`, `@keyframes`, ...
    #[regex(r"@-?([a-zA-Z_]|[^\x00-\x7F])([a-zA-Z0-9_-]|[^\x00-\x7F])*")]
    AtKeyword,

    /// `#name`
    #[regex(r"#([a-zA-Z0-9_-]|[^\x00-\x7F]|\\[^\n])+")]
    Hash,

    /// `.`
    #[token(".")]
    Dot,

    /// `:`
    #[token(":")]
    Colon,

    /// A name, including escapes and custom-property names.
    #[regex(r"-?-?([a-zA-Z_]|[^\x00-\x7F]|\\[^\n])([a-zA-Z0-9_-]|[^\x00-\x7F]|\\[^\n])*")]
    Ident,

    /// `>`, `+` or `~`.
    #[token(">")]
    #[token("+")]
    #[token("~")]
    Combinator,

    /// Any other single code point (`*`, `=`, digits, ...).
    #[default]
    Delim,

    /// End of file
    Eof,
}

impl TokenKind {
    /// Returns true for whitespace and comments.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }

    /// Returns a human-readable name for this token kind.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Whitespace => "whitespace",
            TokenKind::Comment => "comment",
            TokenKind::String => "string",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Semicolon => "';'",
            TokenKind::Comma => "','",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::AtKeyword => "at-keyword",
            TokenKind::Hash => "hash",
            TokenKind::Dot => "'.'",
            TokenKind::Colon => "':'",
            TokenKind::Ident => "identifier",
            TokenKind::Combinator => "combinator",
            TokenKind::Delim => "delimiter",
            TokenKind::Eof => "end of file",
        }
    }
}

/// A lexer for CSS source code.
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, TokenKind>,
    source: &'src str,
    finished: bool,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source.
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            source,
            finished: false,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.inner.next() {
            Some(result) => {
                let span = self.inner.span();
                Some(Token {
                    kind: result.unwrap_or(TokenKind::Delim),
                    span: Span::from_usize(span.start, span.end),
                })
            }
            None => {
                self.finished = true;
                let end = self.source.len();
                Some(Token {
                    kind: TokenKind::Eof,
                    span: Span::from_usize(end, end),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .map(|t| t.kind)
            .filter(|k| *k != TokenKind::Eof)
            .collect()
    }

    #[test]
    fn test_class_rule() {
        assert_eq!(
            tokenize(".a-b{color:red}"),
            vec![
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::LBrace,
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Ident,
                TokenKind::RBrace
            ]
        );
    }

    #[test]
    fn test_combinators_and_ids() {
        assert_eq!(
            tokenize("#main > .x ~ *"),
            vec![
                TokenKind::Hash,
                TokenKind::Whitespace,
                TokenKind::Combinator,
                TokenKind::Whitespace,
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::Whitespace,
                TokenKind::Combinator,
                TokenKind::Whitespace,
                TokenKind::Delim
            ]
        );
    }

    #[test]
    fn test_comments_and_strings_hide_braces() {
        assert_eq!(
            tokenize(r#"/* { */ "}" '\'{'"#),
            vec![
                TokenKind::Comment,
                TokenKind::Whitespace,
                TokenKind::String,
                TokenKind::Whitespace,
                TokenKind::String
            ]
        );
    }

    #[test]
    fn test_at_keyword() {
        assert_eq!(
            tokenize("@media (x){}"),
            vec![
                TokenKind::AtKeyword,
                TokenKind::Whitespace,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace
            ]
        );
    }

    #[test]
    fn test_escaped_class_name_is_one_ident() {
        let tokens: Vec<_> = Lexer::new(r".sm\:flex").collect();
        assert_eq!(tokens[1].kind, TokenKind::Ident);
        assert_eq!(tokens[1].span.range(), 1..9);
    }

    #[test]
    fn test_eof_token_terminates() {
        let mut lexer = Lexer::new("a");
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Ident));
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Eof));
        assert_eq!(lexer.next(), None);
    }
}
