//! Diagnostic values produced while parsing and rewriting.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Output was produced, but part of the input was left unmodified.
    Warning,
    /// No output was produced.
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// The input is not valid script syntax.
    ParseError,
    /// The rewriter met a construct whose scoping it cannot classify.
    UnsupportedConstruct,
    /// Expression nesting exceeded the configured depth limit.
    DepthLimit,
    /// A configured helper name or receiver expression is unusable.
    InvalidOption,
    /// An input file could not be read or an output could not be written.
    IoError,
}

impl DiagnosticCode {
    pub const ALL: [DiagnosticCode; 5] = [
        DiagnosticCode::ParseError,
        DiagnosticCode::UnsupportedConstruct,
        DiagnosticCode::DepthLimit,
        DiagnosticCode::InvalidOption,
        DiagnosticCode::IoError,
    ];

    /// Short code printed in brackets, e.g. `U001`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "P001",
            Self::UnsupportedConstruct => "U001",
            Self::DepthLimit => "U002",
            Self::InvalidOption => "C001",
            Self::IoError => "I001",
        }
    }

    /// Look a code up by its short form, case-insensitively.
    pub fn parse(code: &str) -> Option<DiagnosticCode> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(code.trim()))
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            Self::ParseError | Self::InvalidOption | Self::IoError => Severity::Error,
            Self::UnsupportedConstruct | Self::DepthLimit => Severity::Warning,
        }
    }

    /// One-line title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::ParseError => "input could not be parsed",
            Self::UnsupportedConstruct => "construct left unmodified",
            Self::DepthLimit => "nesting depth limit reached",
            Self::InvalidOption => "invalid transform option",
            Self::IoError => "file could not be read or written",
        }
    }

    /// Long explanation shown by `bindpath explain`.
    pub fn explanation(&self) -> &'static str {
        match self {
            Self::ParseError => {
                "The source text is not a valid script. No output is produced for the \
                 file; fix the syntax error at the reported position and run again."
            }
            Self::UnsupportedConstruct => {
                "The rewriter cannot tell which names are local inside this construct \
                 (for example the body of a `with` statement, JSX, or TypeScript-only \
                 syntax). The construct is copied to the output unchanged, so reads \
                 inside it are not tracked. The rest of the file is rewritten normally."
            }
            Self::DepthLimit => {
                "The expression is nested deeper than the configured `max_depth`. The \
                 deeper part is copied to the output unchanged so that the rewrite \
                 cannot exhaust the stack. Input nested four times deeper than \
                 `max_depth` is rejected as an error before parsing. Raise `max_depth` \
                 if the input is trusted."
            }
            Self::InvalidOption => {
                "The helper name must be a valid identifier and the receiver must parse \
                 as a single expression. Check the command-line flags and the \
                 `bindpath.toml` file."
            }
            Self::IoError => "The file could not be read or the output could not be written.",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reported problem.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    /// Primary location; [`Span::DUMMY`] when unknown.
    pub span: Span,
    /// Optional hint on how to address the problem.
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Error, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Warning, message)
    }

    /// Diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, code.default_severity(), message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

/// Fluent constructor for [`Diagnostic`].
pub struct DiagnosticBuilder {
    inner: Diagnostic,
}

impl DiagnosticBuilder {
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            inner: Diagnostic {
                code,
                severity,
                message: message.into(),
                span: Span::DUMMY,
                help: None,
            },
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.inner.span = span;
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.help = Some(help.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        self.inner
    }
}

/// Diagnostics gathered over a run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_warning()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
