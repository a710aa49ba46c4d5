//! JavaScript parser wrapper using SWC
//!
//! This crate parses render-function source text into an SWC [`Script`],
//! reports parser failures as diagnostics with file-relative spans, and
//! prints a (possibly rewritten) script back to text.

mod print;

use bindpath_diagnostics::{Diagnostic, DiagnosticCode, FileId, SourceCache, Span};
use swc_common::{input::StringInput, sync::Lrc, BytePos, FileName, SourceMap};
use swc_ecma_ast::{EsVersion, Expr, Script};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, Syntax};

pub use print::{print_script, print_script_with};

// Re-export AST types for consumers that need to inspect or rewrite the AST
pub use swc_ecma_ast;

// Re-export atoms so callers can build identifiers and strings
pub use swc_atoms;

// Re-export Spanned trait for getting spans from AST nodes
pub use swc_common::Spanned;

/// A fatal parse failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    /// Location of the failure, relative to the parsed file.
    pub span: Span,
}

/// Result of parsing a script.
pub struct ParseResult {
    /// The parsed AST
    pub script: Script,
    /// The file ID in the source cache
    pub file_id: FileId,
    source_map: Lrc<SourceMap>,
    start_pos: BytePos,
}

impl std::fmt::Debug for ParseResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseResult")
            .field("script", &self.script)
            .field("file_id", &self.file_id)
            .finish_non_exhaustive()
    }
}

impl ParseResult {
    /// Convert an SWC span of this script into a file-relative span.
    pub fn span(&self, swc_span: swc_common::Span) -> Span {
        if swc_span.is_dummy() {
            return Span::DUMMY;
        }
        Span::new(
            self.file_id,
            swc_span.lo.0.saturating_sub(self.start_pos.0),
            swc_span.hi.0.saturating_sub(self.start_pos.0),
        )
    }

    /// Print the current state of `script`.
    pub fn print(&self) -> std::io::Result<String> {
        print_script_with(&self.script, self.source_map.clone())
    }
}

fn es_syntax() -> Syntax {
    Syntax::Es(EsSyntax {
        allow_return_outside_function: true,
        ..Default::default()
    })
}

/// Parse script source code with diagnostic support.
///
/// The source is added to `cache` under `filename`. Any parser error, fatal
/// or recovered, fails the parse: a recovered tree may not match the text the
/// author wrote, so it is never rewritten.
pub fn parse_script_with_cache(
    source: &str,
    filename: &str,
    cache: &mut SourceCache,
) -> Result<ParseResult, ParseError> {
    let file_id = cache.add_file(filename, source.to_string());

    // SWC keeps its own source map; spans are converted back to file offsets
    let source_map: Lrc<SourceMap> = Default::default();
    let source_file = source_map.new_source_file(
        Lrc::new(FileName::Custom(filename.to_string())),
        source.to_string(),
    );
    let start_pos = source_file.start_pos;

    let lexer = Lexer::new(
        es_syntax(),
        EsVersion::latest(),
        StringInput::from(&*source_file),
        None,
    );
    let mut parser = Parser::new_from(lexer);

    let to_error = |error: swc_ecma_parser::error::Error| {
        let span = error.span();
        ParseError {
            message: error.kind().msg().to_string(),
            span: Span::new(
                file_id,
                span.lo.0.saturating_sub(start_pos.0),
                span.hi.0.saturating_sub(start_pos.0),
            ),
        }
    };

    let script = parser.parse_script().map_err(to_error)?;

    if let Some(error) = parser.take_errors().into_iter().next() {
        return Err(to_error(error));
    }

    log::debug!(
        "parsed {} ({} bytes, {} statements)",
        filename,
        source.len(),
        script.body.len()
    );

    Ok(ParseResult {
        script,
        file_id,
        source_map,
        start_pos,
    })
}

/// Parse a standalone expression, such as a configured receiver.
pub fn parse_expression(source: &str) -> Result<Box<Expr>, ParseError> {
    let source_map: Lrc<SourceMap> = Default::default();
    let source_file =
        source_map.new_source_file(Lrc::new(FileName::Anon), source.to_string());

    let lexer = Lexer::new(
        es_syntax(),
        EsVersion::latest(),
        StringInput::from(&*source_file),
        None,
    );
    let mut parser = Parser::new_from(lexer);

    let fail = |message: String| ParseError {
        message,
        span: Span::DUMMY,
    };

    let expr = parser
        .parse_expr()
        .map_err(|e| fail(e.kind().msg().to_string()))?;
    if let Some(error) = parser.take_errors().into_iter().next() {
        return Err(fail(error.kind().msg().to_string()));
    }

    // `parse_expr` stops at the first token it cannot use
    let consumed = (expr.span().hi.0.saturating_sub(source_file.start_pos.0) as usize)
        .min(source.len());
    let rest = source.get(consumed..).unwrap_or_default().trim();
    if !rest.is_empty() {
        return Err(fail(format!("unexpected `{rest}` after expression")));
    }

    Ok(expr)
}

/// Turn a parse failure into a diagnostic.
pub fn parse_error_diagnostic(error: &ParseError) -> Diagnostic {
    Diagnostic::error(DiagnosticCode::ParseError, error.message.clone())
        .with_span(error.span)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_ecma_ast::{Expr, Stmt};

    #[test]
    fn test_parse_simple_script() {
        let source = r#"
            global.inject = function (item) {
                item.linkUrl;
            };
        "#;

        let mut cache = SourceCache::new();
        let result = parse_script_with_cache(source, "test.js", &mut cache).unwrap();
        assert_eq!(result.script.body.len(), 1);
        assert!(cache.get_file(result.file_id).is_some());
    }

    #[test]
    fn test_parse_error_span_is_file_relative() {
        let source = "(a;\n";
        let mut cache = SourceCache::new();

        let err = parse_script_with_cache(source, "bad.js", &mut cache).unwrap_err();
        assert!(!err.message.is_empty());

        let loc = cache.location(err.span).unwrap();
        assert_eq!(loc.file, "bad.js");
        assert_eq!(loc.line, 1);
    }

    #[test]
    fn test_second_file_spans_restart_at_zero() {
        let mut cache = SourceCache::new();
        parse_script_with_cache("first;", "a.js", &mut cache).unwrap();
        let result = parse_script_with_cache("second;", "b.js", &mut cache).unwrap();

        let Stmt::Expr(stmt) = &result.script.body[0] else {
            panic!("expected expression statement");
        };
        let span = result.span(stmt.expr.span());
        assert_eq!((span.start, span.end), (0, 6));
    }

    #[test]
    fn test_parse_expression() {
        let expr = parse_expression("this").unwrap();
        assert!(matches!(*expr, Expr::This(_)));

        let expr = parse_expression(" ctx.state ").unwrap();
        assert!(matches!(*expr, Expr::Member(_)));
    }

    #[test]
    fn test_parse_expression_rejects_trailing_input() {
        assert!(parse_expression("a b").is_err());
        assert!(parse_expression("").is_err());
    }

    #[test]
    fn test_error_diagnostic() {
        let mut cache = SourceCache::new();
        let err = parse_script_with_cache("let = ;", "x.js", &mut cache).unwrap_err();
        let diag = parse_error_diagnostic(&err);
        assert!(diag.is_error());
        assert_eq!(diag.code, DiagnosticCode::ParseError);
    }
}
