//! Rendering of diagnostics for terminals, tools and logs.

use crate::diagnostic::{Diagnostic, Diagnostics, Severity};
use crate::source_cache::SourceCache;
use std::io::Write;

/// Sink for diagnostics.
pub trait DiagnosticEmitter {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()>;

    fn emit_all(&mut self, diagnostics: &Diagnostics, cache: &SourceCache) -> std::io::Result<()> {
        for diag in diagnostics {
            self.emit(diag, cache)?;
        }
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()>;
}

/// Human-readable output with an optional colour and a source snippet.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colored: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, colored: bool) -> Self {
        Self { writer, colored }
    }

    fn paint(&self, code: &'static str) -> &'static str {
        if self.colored {
            code
        } else {
            ""
        }
    }

    fn severity_color(&self, severity: Severity) -> &'static str {
        match severity {
            Severity::Error => self.paint("\x1b[31m"),
            Severity::Warning => self.paint("\x1b[33m"),
        }
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let color = self.severity_color(diagnostic.severity);
        let reset = self.paint("\x1b[0m");
        let bold = self.paint("\x1b[1m");
        let cyan = self.paint("\x1b[36m");

        // warning[U001]: message
        writeln!(
            self.writer,
            "{bold}{color}{}[{}]{reset}: {}",
            diagnostic.severity,
            diagnostic.code,
            diagnostic.message
        )?;

        if let Some(loc) = cache.location(diagnostic.span) {
            writeln!(self.writer, "  {cyan}-->{reset} {loc}")?;

            let snippet = cache
                .get_file(diagnostic.span.file_id)
                .and_then(|file| file.line_text(loc.line));
            if let Some(line_text) = snippet {
                let gutter = loc.line.to_string();
                let pad = " ".repeat(gutter.len());
                let indent = (loc.column - 1) as usize;
                let room = line_text.len().saturating_sub(indent);
                let carets = "^".repeat((diagnostic.span.len() as usize).min(room).max(1));

                writeln!(self.writer, "{pad} {cyan}|{reset}")?;
                writeln!(self.writer, "{cyan}{gutter} |{reset} {line_text}")?;
                writeln!(
                    self.writer,
                    "{pad} {cyan}|{reset} {}{color}{carets}{reset}",
                    " ".repeat(indent)
                )?;
            }
        }

        if let Some(help) = &diagnostic.help {
            writeln!(self.writer, "  {cyan}= help:{reset} {help}")?;
        }

        writeln!(self.writer)
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let errors = diagnostics.error_count();
        let warnings = diagnostics.warning_count();
        if errors == 0 && warnings == 0 {
            return Ok(());
        }

        let color = if errors > 0 {
            self.severity_color(Severity::Error)
        } else {
            self.severity_color(Severity::Warning)
        };
        let reset = self.paint("\x1b[0m");
        let plural = |n: usize| if n == 1 { "" } else { "s" };

        let mut parts = Vec::new();
        if errors > 0 {
            parts.push(format!("{errors} error{}", plural(errors)));
        }
        if warnings > 0 {
            parts.push(format!("{warnings} warning{}", plural(warnings)));
        }
        writeln!(self.writer, "{color}{} emitted{reset}", parts.join(" and "))
    }
}

/// One JSON object per line, for editors and CI.
pub struct JsonEmitter<W: Write> {
    writer: W,
}

impl<W: Write> JsonEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let span = (!diagnostic.span.is_dummy()).then(|| {
            serde_json::json!({
                "start": diagnostic.span.start,
                "end": diagnostic.span.end,
            })
        });
        let json = serde_json::json!({
            "code": diagnostic.code.as_str(),
            "severity": diagnostic.severity.as_str(),
            "message": diagnostic.message,
            "location": cache.location(diagnostic.span),
            "span": span,
            "help": diagnostic.help,
        });

        serde_json::to_writer(&mut self.writer, &json)?;
        writeln!(self.writer)
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let summary = serde_json::json!({
            "type": "summary",
            "errors": diagnostics.error_count(),
            "warnings": diagnostics.warning_count(),
            "total": diagnostics.len(),
        });
        serde_json::to_writer(&mut self.writer, &summary)?;
        writeln!(self.writer)
    }
}

/// `file:line:col: severity: message [code]`, one per line.
pub struct SimpleEmitter<W: Write> {
    writer: W,
}

impl<W: Write> SimpleEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for SimpleEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        if let Some(loc) = cache.location(diagnostic.span) {
            write!(self.writer, "{loc}: ")?;
        }
        writeln!(
            self.writer,
            "{}: {} [{}]",
            diagnostic.severity, diagnostic.message, diagnostic.code
        )
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "{} error(s), {} warning(s)",
            diagnostics.error_count(),
            diagnostics.warning_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;
    use crate::span::Span;

    fn sample() -> (SourceCache, Diagnostic) {
        let mut cache = SourceCache::new();
        let id = cache.add_file("view.js", "(a);\nwith (o) { b }\n".to_string());
        let diag = Diagnostic::warning(DiagnosticCode::UnsupportedConstruct, "`with` body")
            .with_span(Span::new(id, 5, 9))
            .with_help("move the reads out of the `with` block")
            .build();
        (cache, diag)
    }

    #[test]
    fn test_terminal_snippet_without_color() {
        let (cache, diag) = sample();
        let mut out = Vec::new();
        TerminalEmitter::new(&mut out, false)
            .emit(&diag, &cache)
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("warning[U001]: `with` body\n"));
        assert!(text.contains("--> view.js:2:1"));
        assert!(text.contains("2 | with (o) { b }"));
        assert!(text.contains("| ^^^^"));
        assert!(text.contains("= help: move the reads"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_json_line() {
        let (cache, diag) = sample();
        let mut out = Vec::new();
        JsonEmitter::new(&mut out).emit(&diag, &cache).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(String::from_utf8(out).unwrap().trim()).unwrap();

        assert_eq!(value["code"], "U001");
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["location"]["line"], 2);
        assert_eq!(value["location"]["column"], 1);
        assert_eq!(value["span"]["start"], 5);
    }

    #[test]
    fn test_simple_without_location() {
        let cache = SourceCache::new();
        let diag = Diagnostic::error(DiagnosticCode::InvalidOption, "bad helper").build();
        let mut out = Vec::new();
        SimpleEmitter::new(&mut out).emit(&diag, &cache).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "error: bad helper [C001]\n"
        );
    }

    #[test]
    fn test_summary_pluralisation() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::error(DiagnosticCode::ParseError, "x").build());
        diags.push(Diagnostic::warning(DiagnosticCode::DepthLimit, "y").build());
        diags.push(Diagnostic::warning(DiagnosticCode::DepthLimit, "z").build());

        let mut out = Vec::new();
        TerminalEmitter::new(&mut out, false)
            .emit_summary(&diags)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1 error and 2 warnings emitted\n"
        );
    }
}
