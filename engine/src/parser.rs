// Parser for Lumen scripts.
//
// Parses the token stream from the lexer into a `Unit`. Uses chumsky
// combinators (recursive descent). Grammar:
//
//   unit       := statement*
//   statement  := path '=' path ['(' paramlist ')']
//   paramlist  := (param (',' param)*)?
//   param      := IDENT '=' literal
//   path       := IDENT ('.' IDENT)*
//
// A lexical error aborts immediately. The token stream is split at statement
// boundaries and each statement is parsed on its own: a malformed statement is
// reported and dropped, parsing resumes at the next one. After `MAX_ERRORS`
// syntax errors parsing is abandoned.
//
// Preconditions: none.
// Postconditions: `errors` is empty iff the whole script parsed.
// Failure modes: lexical errors (fatal), syntax errors (recoverable).
// Side effects: none.

use std::ops::Range;

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::diag::{codes, Diagnostic};
use crate::lexer::{LineIndex, Span as LexSpan, Token};

/// Syntax errors tolerated before parsing is abandoned.
pub const MAX_ERRORS: usize = 16;

/// Result of parsing: the unit (if any) plus diagnostics.
#[derive(Debug)]
pub struct ParseResult {
    pub unit: Option<Unit>,
    pub errors: Vec<Diagnostic>,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty() && self.unit.is_some()
    }
}

/// Parse a Lumen source string. Lexes then parses.
pub fn parse(source: &str) -> ParseResult {
    let lines = LineIndex::new(source);

    let tokens = match crate::lexer::lex(source) {
        Ok(tokens) => tokens,
        Err(e) => {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            let diag = Diagnostic::error(span, format!("{}: {:?}", e.kind, e.text))
                .with_code(codes::E0001)
                .with_line(e.line);
            return ParseResult {
                unit: None,
                errors: vec![diag],
            };
        }
    };

    let mut statements = Vec::new();
    let mut errors: Vec<Diagnostic> = Vec::new();
    for range in statement_bounds(&tokens) {
        let eoi = tokens.get(range.end).map_or(source.len(), |(_, span)| span.start);
        match parse_statement(source, &tokens[range], eoi) {
            Ok(mut stmt) => {
                stmt.line = lines.line(stmt.span.start());
                statements.push(stmt);
            }
            Err(found) => errors.extend(found.into_iter().map(|e| {
                let line = lines.line(e.span.start());
                e.with_line(line)
            })),
        }
    }

    if errors.len() > MAX_ERRORS {
        let total = errors.len();
        let span = errors[MAX_ERRORS].span;
        errors.truncate(MAX_ERRORS);
        errors.push(
            Diagnostic::error(span, format!("too many errors ({total}), giving up"))
                .with_code(codes::E0101)
                .with_line(lines.line(span.start())),
        );
        return ParseResult { unit: None, errors };
    }

    let unit = Unit {
        statements,
        span: (0..source.len()).into(),
    };
    ParseResult {
        unit: Some(unit),
        errors,
    }
}

// ── Statement boundaries ──
//
// Each statement is parsed on its own so a malformed one never swallows or
// truncates its neighbours. A statement starts at a path followed by `=`
// that does not continue a dotted path. Inside an unclosed parameter list a
// `name = literal` pair is a parameter, so there only `path = path` starts a
// new statement.

fn statement_bounds(tokens: &[(Token, LexSpan)]) -> Vec<Range<usize>> {
    let mut starts = Vec::new();
    let mut depth = 0usize;
    for (i, (tok, _)) in tokens.iter().enumerate() {
        match tok {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Ident => {
                let continues_path = i > 0 && tokens[i - 1].0 == Token::Dot;
                let Some(eq) = assignment_at(tokens, i) else { continue };
                let value_is_path = matches!(tokens.get(eq + 1), Some((Token::Ident, _)));
                if !continues_path && (depth == 0 || value_is_path) {
                    starts.push(i);
                    depth = 0;
                }
            }
            _ => {}
        }
    }

    if !tokens.is_empty() && starts.first() != Some(&0) {
        starts.insert(0, 0);
    }
    let mut bounds = Vec::with_capacity(starts.len());
    for (k, &start) in starts.iter().enumerate() {
        let end = starts.get(k + 1).copied().unwrap_or(tokens.len());
        bounds.push(start..end);
    }
    bounds
}

/// Index of the `=` when `tokens[i..]` begins with `IDENT ('.' IDENT)* '='`.
fn assignment_at(tokens: &[(Token, LexSpan)], i: usize) -> Option<usize> {
    let mut j = i + 1;
    loop {
        match (tokens.get(j).map(|t| &t.0), tokens.get(j + 1).map(|t| &t.0)) {
            (Some(Token::Equals), _) => return Some(j),
            (Some(Token::Dot), Some(Token::Ident)) => j += 2,
            _ => return None,
        }
    }
}

/// Parse exactly one statement from its tokens; `eoi` is the offset where
/// the statement's region ends.
fn parse_statement(
    source: &str,
    tokens: &[(Token, LexSpan)],
    eoi: usize,
) -> Result<Statement, Vec<Diagnostic>> {
    let token_iter = tokens.iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok.clone(), cspan)
    });
    let eoi: SimpleSpan = (eoi..eoi).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let (stmt, parse_errors) = statement_parser(source)
        .then_ignore(end())
        .parse(stream)
        .into_output_errors();

    let errors: Vec<Diagnostic> = parse_errors
        .iter()
        .map(|e| Diagnostic::error(*e.span(), e.to_string()).with_code(codes::E0100))
        .collect();
    match stmt {
        Some(stmt) if errors.is_empty() => Ok(stmt),
        _ if errors.is_empty() => Err(vec![
            Diagnostic::error(eoi, "malformed statement").with_code(codes::E0100)
        ]),
        _ => Err(errors),
    }
}

// ── Parser builder ──
//
// All grammar rules are built inside `statement_parser` so that the `source`
// reference is captured once and shared by all combinators.

fn statement_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, Statement, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    // ── Identifier ──

    let ident = just(Token::Ident).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        Ident {
            name: source[span.start()..span.end()].to_string(),
            span,
        }
    });

    // ── Path ──

    let path = ident
        .clone()
        .separated_by(just(Token::Dot))
        .at_least(1)
        .collect::<Vec<_>>()
        .map_with(|segments, e| Path {
            segments,
            span: e.span(),
        });

    // ── Literal ──

    let literal = select! {
        Token::Bool(b) = e => Literal::Bool(b, e.span()),
        Token::Int(v) = e => Literal::Int(v, e.span()),
        Token::Real(v) = e => Literal::Real(v, e.span()),
        Token::StringLit(s) = e => Literal::StringLit(s, e.span()),
    };

    // ── Parameter list ──

    let param = ident
        .then_ignore(just(Token::Equals))
        .then(literal)
        .map_with(|(name, value), e| ParamAssign {
            name,
            value,
            span: e.span(),
        });

    let params = param
        .separated_by(just(Token::Comma))
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LParen), just(Token::RParen));

    // ── Statement ──

    path
        .clone()
        .then_ignore(just(Token::Equals))
        .then(path)
        .then(params.or_not())
        .map_with(|((target, src), params), e| {
            let kind = match params {
                Some(params) => StatementKind::Instantiate(Instantiation {
                    target,
                    source: src,
                    params,
                }),
                None => StatementKind::Connect(Connection {
                    target,
                    source: src,
                }),
            };
            Statement {
                kind,
                span: e.span(),
                line: 0,
            }
        })
}

// ── Tests ──
