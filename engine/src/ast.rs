// AST node types for Lumen scripts.
//
// Mirrors the grammar in parser.rs. Every node carries a `SimpleSpan` for
// error reporting; statements also carry their 1-based source line.
//
// Preconditions: produced by the parser from a valid or partially-valid token stream.
// Postconditions: each node's span covers the source range of the construct.
// Failure modes: none (data-only module).
// Side effects: none.

use std::fmt;

use chumsky::span::SimpleSpan;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

// ── Root ──

/// A complete script: statements in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub statements: Vec<Statement>,
    pub span: Span,
}

// ── Statements ──

/// A statement with its source span and line.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Instantiate(Instantiation),
    Connect(Connection),
}

// ── instantiation: path '=' path '(' paramlist ')' ──

#[derive(Debug, Clone, PartialEq)]
pub struct Instantiation {
    pub target: Path,
    pub source: Path,
    pub params: Vec<ParamAssign>,
}

// ── connection: path '=' path ──

#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub target: Path,
    pub source: Path,
}

// ── param: IDENT '=' literal ──

#[derive(Debug, Clone, PartialEq)]
pub struct ParamAssign {
    pub name: Ident,
    pub value: Literal,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool, Span),
    Int(i64, Span),
    Real(f64, Span),
    StringLit(String, Span),
}

impl Literal {
    pub fn span(&self) -> Span {
        match self {
            Literal::Bool(_, s) | Literal::Int(_, s) | Literal::Real(_, s) => *s,
            Literal::StringLit(_, s) => *s,
        }
    }
}

// ── path: IDENT ('.' IDENT)* ──

/// A non-empty dotted path.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub segments: Vec<Ident>,
    pub span: Span,
}

impl Path {
    pub fn names(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn last(&self) -> &Ident {
        // The grammar requires at least one segment.
        &self.segments[self.segments.len() - 1]
    }

    /// All segments except the last.
    pub fn prefix(&self) -> &[Ident] {
        &self.segments[..self.segments.len() - 1]
    }
}

// ── Identifier ──

/// An identifier with its source text and span.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

// ── Canonical printing ──
//
// Printing a unit and parsing it back yields the same statements (spans aside).

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            writeln!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StatementKind::Instantiate(inst) => {
                write!(f, "{} = {}(", inst.target, inst.source)?;
                for (i, p) in inst.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", p.name.name, p.value)?;
                }
                write!(f, ")")
            }
            StatementKind::Connect(conn) => write!(f, "{} = {}", conn.target, conn.source),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", seg.name)?;
        }
        Ok(())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b, _) => write!(f, "{b}"),
            Literal::Int(i, _) => write!(f, "{i}"),
            Literal::Real(r, _) => write!(f, "{}", format_real(*r)),
            Literal::StringLit(s, _) => write!(f, "\"{}\"", escape_string(s)),
        }
    }
}

/// Shortest round-trip decimal form that always lexes as a real literal.
pub fn format_real(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

/// Escape a string body using the three escapes the lexer understands.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp() -> Span {
        (0..0).into()
    }

    fn ident(name: &str) -> Ident {
        Ident {
            name: name.to_string(),
            span: sp(),
        }
    }

    fn path(segs: &[&str]) -> Path {
        Path {
            segments: segs.iter().map(|s| ident(s)).collect(),
            span: sp(),
        }
    }

    #[test]
    fn real_always_has_fraction() {
        assert_eq!(format_real(1.0), "1.0");
        assert_eq!(format_real(0.25), "0.25");
        assert_eq!(format_real(1e20), "100000000000000000000.0");
    }

    #[test]
    fn escapes_round_trip_set() {
        assert_eq!(escape_string("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }

    #[test]
    fn path_helpers() {
        let p = path(&["a", "display", "source"]);
        assert_eq!(p.names(), vec!["a", "display", "source"]);
        assert_eq!(p.last().name, "source");
        assert_eq!(p.prefix().len(), 2);
        assert_eq!(p.to_string(), "a.display.source");
    }

    #[test]
    fn statement_display() {
        let inst = Statement {
            kind: StatementKind::Instantiate(Instantiation {
                target: path(&["a"]),
                source: path(&["window"]),
                params: vec![ParamAssign {
                    name: ident("width"),
                    value: Literal::Int(64, sp()),
                    span: sp(),
                }],
            }),
            span: sp(),
            line: 1,
        };
        assert_eq!(inst.to_string(), "a = window(width=64)");

        let conn = Statement {
            kind: StatementKind::Connect(Connection {
                target: path(&["a", "display", "source"]),
                source: path(&["b"]),
            }),
            span: sp(),
            line: 2,
        };
        assert_eq!(conn.to_string(), "a.display.source = b");
    }
}
