// diag.rs — Unified diagnostics model
//
// Shared diagnostic types used by the parser and statement application.
// Diagnostics are values; `emit` hands them to the `tracing` subscriber.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: `emit` / `emit_all` log through `tracing`.

use std::fmt;

use crate::ast::Span;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0001`, `E0201`).
///
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub mod codes {
    use super::DiagCode;

    // Lexical
    pub const E0001: DiagCode = DiagCode("E0001"); // lexical error (fatal)

    // Syntax
    pub const E0100: DiagCode = DiagCode("E0100"); // unexpected token
    pub const E0101: DiagCode = DiagCode("E0101"); // too many syntax errors

    // Semantic
    pub const E0200: DiagCode = DiagCode("E0200"); // unresolved path
    pub const E0201: DiagCode = DiagCode("E0201"); // name already defined
    pub const E0202: DiagCode = DiagCode("E0202"); // not instantiable
    pub const E0203: DiagCode = DiagCode("E0203"); // unknown parameter
    pub const E0204: DiagCode = DiagCode("E0204"); // duplicate parameter
    pub const E0205: DiagCode = DiagCode("E0205"); // parameter type mismatch
    pub const E0206: DiagCode = DiagCode("E0206"); // unknown input slot
    pub const E0207: DiagCode = DiagCode("E0207"); // not a node
    pub const E0208: DiagCode = DiagCode("E0208"); // incompatible wiring
    pub const E0209: DiagCode = DiagCode("E0209"); // scope setup failed
    pub const E0210: DiagCode = DiagCode("E0210"); // invalid target path
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Related span ─────────────────────────────────────────────────────────

/// A secondary source location providing context for a diagnostic.
#[derive(Debug, Clone)]
pub struct RelatedSpan {
    pub span: Span,
    pub label: String,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic emitted by the parser or during statement application.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub span: Span,
    /// 1-based source line, when known.
    pub line: Option<u32>,
    pub message: String,
    pub hint: Option<String>,
    pub related_spans: Vec<RelatedSpan>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, line, hint, or related spans.
    pub fn new(level: DiagLevel, span: Span, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            span,
            line: None,
            message: message.into(),
            hint: None,
            related_spans: Vec::new(),
        }
    }

    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, span, message)
    }

    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, span, message)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach the 1-based source line.
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a related span.
    pub fn with_related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.related_spans.push(RelatedSpan {
            span,
            label: label.into(),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(line) = self.line {
            write!(f, "line {}: ", line)?;
        }
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

/// Number of error-level diagnostics.
pub fn error_count(diags: &[Diagnostic]) -> usize {
    diags.iter().filter(|d| d.is_error()).count()
}

/// Log one diagnostic through the `tracing` subscriber.
pub fn emit(diag: &Diagnostic) {
    match diag.level {
        DiagLevel::Error => tracing::error!(
            code = diag.code.map(|c| c.0),
            line = diag.line,
            "{}",
            diag.message
        ),
        DiagLevel::Warning => tracing::warn!(
            code = diag.code.map(|c| c.0),
            line = diag.line,
            "{}",
            diag.message
        ),
    }
    if let Some(hint) = &diag.hint {
        tracing::info!("  hint: {}", hint);
    }
}

pub fn emit_all(diags: &[Diagnostic]) {
    for d in diags {
        emit(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_span() -> Span {
        (0..1).into()
    }

    #[test]
    fn display_without_code() {
        let d = Diagnostic::error(dummy_span(), "something failed");
        assert_eq!(format!("{d}"), "error: something failed");
    }

    #[test]
    fn display_with_code_and_line() {
        let d = Diagnostic::warning(dummy_span(), "unused window")
            .with_code(DiagCode("W0001"))
            .with_line(7);
        assert_eq!(format!("{d}"), "line 7: warning[W0001]: unused window");
    }

    #[test]
    fn builder_chain() {
        let d = Diagnostic::error(dummy_span(), "'x' is already defined")
            .with_code(codes::E0201)
            .with_hint("pick another name")
            .with_related(dummy_span(), "first defined here");

        assert_eq!(d.code, Some(codes::E0201));
        assert_eq!(d.hint.as_deref(), Some("pick another name"));
        assert_eq!(d.related_spans.len(), 1);
        assert!(d.is_error());
    }

    #[test]
    fn counts_only_errors() {
        let diags = vec![
            Diagnostic::error(dummy_span(), "a"),
            Diagnostic::warning(dummy_span(), "b"),
            Diagnostic::error(dummy_span(), "c"),
        ];
        assert_eq!(error_count(&diags), 2);
    }
}
