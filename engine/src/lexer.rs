// Lexer for Lumen scripts.
//
// Uses the `logos` crate for DFA-based lexing. Whitespace, `//` line comments
// and `/* */` block comments are skipped. Lexical errors are fatal: the first
// one aborts tokenization and is reported with its 1-based line.
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns all tokens with byte-offset spans, or the first error.
// Failure modes: see `LexErrorKind`.
// Side effects: none (except `Lexer::from_reader`, which reads the stream).

use std::fmt;
use std::io::Read;

use logos::{FilterResult, Logos};

/// Longest lexeme the lexer accepts, in bytes.
pub const MAX_TOKEN_LEN: usize = 256;

/// Byte-offset span in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Why lexing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, thiserror::Error)]
pub enum LexErrorKind {
    #[default]
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("token exceeds {} bytes", MAX_TOKEN_LEN)]
    TokenTooLong,
    #[error("malformed number")]
    MalformedNumber,
    #[error("integer literal out of range")]
    IntegerOverflow,
    #[error("hexadecimal literal exceeds 32 bits")]
    HexOverflow,
    #[error("invalid escape sequence in string")]
    InvalidEscape,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
}

/// A fatal lexer error with location.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("line {line}: {kind}: {text:?}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
    pub line: u32,
    pub text: String,
}

/// Lumen token types.
///
/// Literals carry parsed values. Identifiers carry no value; use the span
/// to retrieve the text from the source.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t\r\n\f]+|//[^\n]*")]
pub enum Token {
    // ── Symbols ──
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("=")]
    Equals,

    // ── Literals ──
    //
    // `true`/`false` are fixed tokens and win over the identifier regex for
    // the same length; `trueish` is still an identifier.
    #[token("true", |_| true)]
    #[token("false", |_| false)]
    Bool(bool),

    /// Decimal or `0x` hexadecimal integer.
    #[regex(r"[0-9]+", parse_decimal)]
    #[regex(r"0[xX][0-9a-fA-F]+", parse_hex)]
    Int(i64),

    /// Real literal: `digits.digits`.
    #[regex(r"[0-9]+\.[0-9]+", parse_real)]
    Real(f64),

    /// String literal with `\n`, `\\` and `\"` escapes.
    #[regex(r#""([^"\\]|\\(.|\n))*""#, parse_string)]
    StringLit(String),

    /// Opening quote with no closing quote before end of input. Never emitted.
    #[regex(r#""([^"\\]|\\(.|\n))*"#, unterminated_string)]
    UnterminatedString,

    /// Block comment. Never emitted: skipped or reported as unterminated.
    #[token("/*", block_comment)]
    BlockComment,

    // ── Identifier ──
    /// Identifier: `[a-zA-Z_][a-zA-Z0-9_-]*`
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_\-]*", check_length)]
    Ident,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Dot => write!(f, "."),
            Token::Equals => write!(f, "="),
            Token::Bool(b) => write!(f, "{b}"),
            Token::Int(v) => write!(f, "{v}"),
            Token::Real(v) => write!(f, "{}", crate::ast::format_real(*v)),
            Token::StringLit(s) => write!(f, "\"{}\"", crate::ast::escape_string(s)),
            Token::UnterminatedString => write!(f, "<unterminated string>"),
            Token::BlockComment => write!(f, "<comment>"),
            Token::Ident => write!(f, "<ident>"),
        }
    }
}

// ── Callbacks ──

fn check_length(lex: &mut logos::Lexer<'_, Token>) -> Result<(), LexErrorKind> {
    if lex.slice().len() > MAX_TOKEN_LEN {
        Err(LexErrorKind::TokenTooLong)
    } else {
        Ok(())
    }
}

fn parse_decimal(lex: &mut logos::Lexer<'_, Token>) -> Result<i64, LexErrorKind> {
    check_length(lex)?;
    let slice = lex.slice();
    if slice.len() > 1 && slice.starts_with('0') {
        return Err(LexErrorKind::MalformedNumber);
    }
    slice.parse().map_err(|_| LexErrorKind::IntegerOverflow)
}

fn parse_hex(lex: &mut logos::Lexer<'_, Token>) -> Result<i64, LexErrorKind> {
    check_length(lex)?;
    let digits = &lex.slice()[2..];
    u32::from_str_radix(digits, 16)
        .map(i64::from)
        .map_err(|_| LexErrorKind::HexOverflow)
}

fn parse_real(lex: &mut logos::Lexer<'_, Token>) -> Result<f64, LexErrorKind> {
    check_length(lex)?;
    lex.slice().parse().map_err(|_| LexErrorKind::MalformedNumber)
}

fn unterminated_string(_: &mut logos::Lexer<'_, Token>) -> Result<(), LexErrorKind> {
    Err(LexErrorKind::UnterminatedString)
}

fn parse_string(lex: &mut logos::Lexer<'_, Token>) -> Result<String, LexErrorKind> {
    check_length(lex)?;
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1]; // strip quotes
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('"') => result.push('"'),
                Some('\\') => result.push('\\'),
                _ => return Err(LexErrorKind::InvalidEscape),
            }
        } else {
            result.push(c);
        }
    }
    Ok(result)
}

fn block_comment(lex: &mut logos::Lexer<'_, Token>) -> FilterResult<(), LexErrorKind> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            FilterResult::Skip
        }
        None => {
            lex.bump(lex.remainder().len());
            FilterResult::Error(LexErrorKind::UnterminatedComment)
        }
    }
}

// ── Line index ──

/// Maps byte offsets to 1-based line numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        LineIndex { starts }
    }

    pub fn line(&self, offset: usize) -> u32 {
        let idx = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        idx as u32 + 1
    }
}

// ── Streaming interface ──

/// A token with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub span: Span,
    pub line: u32,
}

/// Pull-based lexer over a source buffer.
///
/// After the input is exhausted every call returns `Ok(None)`; after an error
/// the same error is returned again.
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, Token>,
    lines: LineIndex,
    failed: Option<LexError>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            inner: Token::lexer(source),
            lines: LineIndex::new(source),
            failed: None,
        }
    }

    /// Read the whole stream into `buf` and lex it.
    pub fn from_reader<R: Read>(mut reader: R, buf: &'src mut String) -> std::io::Result<Self> {
        buf.clear();
        reader.read_to_string(buf)?;
        let text: &'src String = buf;
        Ok(Lexer::new(text))
    }

    pub fn next_token(&mut self) -> Result<Option<Lexeme>, LexError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        let Some(result) = self.inner.next() else {
            return Ok(None);
        };
        let range = self.inner.span();
        let span = Span {
            start: range.start,
            end: range.end,
        };
        let line = self.lines.line(span.start);
        match result {
            Ok(token) => Ok(Some(Lexeme { token, span, line })),
            Err(kind) => {
                let err = LexError {
                    kind,
                    span,
                    line,
                    text: truncate(self.inner.slice()),
                };
                self.failed = Some(err.clone());
                Err(err)
            }
        }
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(32).collect()
}

// ── Public API ──

/// Lex a whole source string. The first lexical error is fatal.
pub fn lex(source: &str) -> Result<Vec<(Token, Span)>, LexError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    while let Some(lexeme) = lexer.next_token()? {
        tokens.push((lexeme.token, lexeme.span));
    }
    Ok(tokens)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: lex and assert no errors, return token list.
    fn lex_ok(source: &str) -> Vec<Token> {
        match lex(source) {
            Ok(tokens) => tokens.into_iter().map(|(t, _)| t).collect(),
            Err(e) => panic!("unexpected lex error: {e}"),
        }
    }

    fn lex_err(source: &str) -> LexError {
        match lex(source) {
            Ok(tokens) => panic!("expected lex error, got {tokens:?}"),
            Err(e) => e,
        }
    }

    // ── Symbols ──

    #[test]
    fn symbols() {
        let tokens = lex_ok("( ) , . =");
        assert_eq!(
            tokens,
            vec![
                Token::LParen,
                Token::RParen,
                Token::Comma,
                Token::Dot,
                Token::Equals,
            ]
        );
    }

    // ── Identifiers ──

    #[test]
    fn identifiers_with_dashes() {
        let result = lex("mouse-motion _x a1_b-2").unwrap();
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|(t, _)| *t == Token::Ident));
        assert_eq!(result[0].1, Span { start: 0, end: 12 });
    }

    #[test]
    fn bool_vs_ident() {
        let tokens = lex_ok("true false trueish");
        assert_eq!(
            tokens,
            vec![Token::Bool(true), Token::Bool(false), Token::Ident]
        );
    }

    // ── Numbers ──

    #[test]
    fn integers() {
        assert_eq!(lex_ok("0 7 1234"), vec![Token::Int(0), Token::Int(7), Token::Int(1234)]);
    }

    #[test]
    fn hex_integers() {
        assert_eq!(
            lex_ok("0x1F 0XfF 0xFFFFFFFF"),
            vec![Token::Int(31), Token::Int(255), Token::Int(0xFFFF_FFFF)]
        );
    }

    #[test]
    fn hex_overflow_is_fatal() {
        let err = lex_err("x = 0x100000000");
        assert_eq!(err.kind, LexErrorKind::HexOverflow);
        assert_eq!(err.line, 1);
    }

    #[test]
    fn leading_zero_rejected() {
        assert_eq!(lex_err("007").kind, LexErrorKind::MalformedNumber);
    }

    #[test]
    fn decimal_overflow_rejected() {
        assert_eq!(
            lex_err("99999999999999999999").kind,
            LexErrorKind::IntegerOverflow
        );
    }

    #[test]
    fn reals() {
        assert_eq!(lex_ok("1.5 0.25"), vec![Token::Real(1.5), Token::Real(0.25)]);
    }

    #[test]
    fn integer_then_dot_is_not_real() {
        assert_eq!(lex_ok("1.a"), vec![Token::Int(1), Token::Dot, Token::Ident]);
    }

    // ── Strings ──

    #[test]
    fn string_simple() {
        assert_eq!(lex_ok(r#""hello""#), vec![Token::StringLit("hello".into())]);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            lex_ok(r#""a\nb\\c\"d""#),
            vec![Token::StringLit("a\nb\\c\"d".into())]
        );
    }

    #[test]
    fn string_bad_escape() {
        assert_eq!(lex_err(r#""tab\t""#).kind, LexErrorKind::InvalidEscape);
    }

    #[test]
    fn backslash_newline_is_a_bad_escape() {
        let err = lex_err("s = \"a\\\nb\"");
        assert_eq!(err.kind, LexErrorKind::InvalidEscape);
    }

    #[test]
    fn unterminated_string() {
        let err = lex_err("a = b(title=\"oops)\n");
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        assert_eq!(err.line, 1);
    }

    // ── Comments ──

    #[test]
    fn comments_skipped() {
        let tokens = lex_ok("a // line\n/* block\n comment */ b");
        assert_eq!(tokens, vec![Token::Ident, Token::Ident]);
    }

    #[test]
    fn unterminated_comment() {
        let err = lex_err("a\n/* never closed");
        assert_eq!(err.kind, LexErrorKind::UnterminatedComment);
        assert_eq!(err.line, 2);
    }

    // ── Limits ──

    #[test]
    fn overlong_identifier() {
        let long = "x".repeat(MAX_TOKEN_LEN + 1);
        assert_eq!(lex_err(&long).kind, LexErrorKind::TokenTooLong);
        let ok = "x".repeat(MAX_TOKEN_LEN);
        assert_eq!(lex_ok(&ok), vec![Token::Ident]);
    }

    #[test]
    fn unexpected_character_reports_line() {
        let err = lex_err("a = b\n\nc ~ d");
        assert_eq!(err.kind, LexErrorKind::UnexpectedCharacter);
        assert_eq!(err.line, 3);
        assert_eq!(err.span, Span { start: 9, end: 10 });
    }

    // ── Streaming ──

    #[test]
    fn eof_is_persistent() {
        let mut lexer = Lexer::new("a");
        let first = lexer.next_token().unwrap().unwrap();
        assert_eq!(first.token, Token::Ident);
        assert_eq!(first.line, 1);
        assert_eq!(lexer.next_token().unwrap(), None);
        assert_eq!(lexer.next_token().unwrap(), None);
    }

    #[test]
    fn error_is_sticky() {
        let mut lexer = Lexer::new("~ a");
        let e1 = lexer.next_token().unwrap_err();
        let e2 = lexer.next_token().unwrap_err();
        assert_eq!(e1, e2);
    }

    #[test]
    fn from_reader_reads_stream() {
        let mut buf = String::new();
        let mut lexer = Lexer::from_reader("x = y".as_bytes(), &mut buf).unwrap();
        let mut count = 0;
        while lexer.next_token().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn line_index() {
        let idx = LineIndex::new("a\nbc\n\nd");
        assert_eq!(idx.line(0), 1);
        assert_eq!(idx.line(2), 2);
        assert_eq!(idx.line(3), 2);
        assert_eq!(idx.line(5), 3);
        assert_eq!(idx.line(6), 4);
    }

    // ── Full statement ──

    #[test]
    fn instantiation_statement() {
        let tokens = lex_ok(r#"a = window(width=64, title="x")"#);
        assert_eq!(
            tokens,
            vec![
                Token::Ident, // a
                Token::Equals,
                Token::Ident, // window
                Token::LParen,
                Token::Ident, // width
                Token::Equals,
                Token::Int(64),
                Token::Comma,
                Token::Ident, // title
                Token::Equals,
                Token::StringLit("x".into()),
                Token::RParen,
            ]
        );
    }
}
