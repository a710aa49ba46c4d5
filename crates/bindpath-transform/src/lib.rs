//! Dependency-path rewriting for render-function bodies.
//!
//! [`transform`] parses a script, finds every identifier that is not bound by
//! an enclosing scope and not excluded, and replaces it (together with the
//! longest static access chain rooted at it) with a tracking call:
//!
//! ```text
//! item.list[0]      =>  this._c("item.list[0]", this.item.list[0])
//! item.length       =>  this._c("item", this.item).length
//! item[key]         =>  this._c("item", this.item)[this._c("key", this.key)]
//! ```
//!
//! The receiver (`this`), the helper name (`_c`), and the exclusion and
//! terminator sets are configured through [`TransformOptions`].
//!
//! # Example
//!
//! ```
//! use bindpath_transform::{transform, TransformOptions};
//!
//! let output = transform("(linkUrl);", &TransformOptions::default()).unwrap();
//! assert!(output.code.contains(r#"this._c("linkUrl""#));
//! assert!(output.warnings.is_empty());
//! ```

mod error;
mod nesting;
mod options;
mod path;
mod rewrite;
mod scope;

pub use error::{TransformError, Warning, WarningKind};
pub use options::{
    TransformOptions, DEFAULT_COLLECT_MARKER, DEFAULT_EXCLUSIONS, DEFAULT_HELPER_NAME,
    DEFAULT_MAX_DEPTH, DEFAULT_RECEIVER, DEFAULT_TERMINATORS, MAX_DEPTH_CEILING,
};
pub use path::{is_identifier_name, BindingPath, Segment};
pub use scope::{BindingKind, ScopeId, ScopeKind, ScopeTracker};

use bindpath_diagnostics::{SourceCache, Span};
use bindpath_parser::parse_script_with_cache;
use options::ResolvedOptions;
use serde::Serialize;

/// Name the input is registered under for position lookups.
const INPUT_NAME: &str = "input.js";

/// Result of a successful [`transform`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformOutput {
    /// The rewritten script.
    pub code: String,
    /// Root names wrapped inside collection regions, in encounter order.
    pub prop_keys: Vec<String>,
    /// Sub-trees that were copied through unchanged.
    pub warnings: Vec<Warning>,
}

/// Rewrite `source` so every free identifier chain records its dependency
/// path.
///
/// Fails without output if the options are invalid, `source` does not
/// parse, or its text nests deeper than four times `max_depth`. Parsing,
/// rewriting and printing run on a stack sized for that nesting. Each call is independent of every other, so calls may run
/// concurrently on different threads.
pub fn transform(source: &str, options: &TransformOptions) -> Result<TransformOutput, TransformError> {
    let resolved = options.resolve()?;
    let limit = resolved.max_depth * nesting::LEVELS_PER_DEPTH;

    let mut cache = SourceCache::new();
    if let Some(offset) = nesting::first_excess(source, limit) {
        let file_id = cache.add_file(INPUT_NAME, source.to_string());
        let (line, column) = cache
            .location(Span::new(file_id, offset, offset + 1))
            .map(|loc| (loc.line, loc.column))
            .unwrap_or((1, 1));
        log::debug!("input nests deeper than {} levels at {}:{}", limit, line, column);
        return Err(TransformError::TooDeep {
            limit,
            line,
            column,
            offset,
        });
    }

    let stack = nesting::stack_size(limit);
    stacker::maybe_grow(stack, stack, || transform_parsed(source, &resolved, &mut cache))
}

/// Parse, rewrite and print. Deeply nested trees are also dropped in here,
/// on the grown stack.
fn transform_parsed(
    source: &str,
    resolved: &ResolvedOptions,
    cache: &mut SourceCache,
) -> Result<TransformOutput, TransformError> {
    let mut parsed = parse_script_with_cache(source, INPUT_NAME, cache).map_err(|error| {
        let (line, column) = cache
            .location(error.span)
            .map(|loc| (loc.line, loc.column))
            .unwrap_or((1, 1));
        TransformError::Syntax {
            message: error.message,
            line,
            column,
            offset: error.span.start,
        }
    })?;

    let outcome = rewrite::rewrite_script(resolved, &mut parsed.script);
    let code = parsed.print()?;

    let warnings: Vec<Warning> = outcome
        .warnings
        .into_iter()
        .map(|raw| {
            let span = parsed.span(raw.span);
            let (line, column) = cache
                .location(span)
                .map(|loc| (loc.line, loc.column))
                .unwrap_or((1, 1));
            Warning {
                kind: raw.kind,
                message: raw.message,
                line,
                column,
                offset: span.start,
                len: span.len(),
            }
        })
        .collect();

    log::debug!(
        "transformed {} bytes: {} tracking calls, {} prop keys, {} warnings",
        source.len(),
        outcome.units,
        outcome.prop_keys.len(),
        warnings.len()
    );

    Ok(TransformOutput {
        code,
        prop_keys: outcome.prop_keys,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_has_position() {
        let err = transform("a;\nb +;", &TransformOptions::default()).unwrap_err();
        match err {
            TransformError::Syntax { line, .. } => assert_eq!(line, 2),
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_option_fails_before_parsing() {
        let options = TransformOptions::default().with_helper_name("");
        let err = transform("this is not parsed", &options).unwrap_err();
        assert!(matches!(err, TransformError::InvalidOption { .. }));
    }

    #[test]
    fn test_excess_nesting_fails_before_parsing() {
        let options = TransformOptions::default().with_max_depth(2);
        let err = transform("a;\n((((((((((b))))))))));", &options).unwrap_err();
        match err {
            TransformError::TooDeep {
                limit,
                line,
                column,
                offset,
            } => {
                assert_eq!(limit, 8);
                assert_eq!((line, column, offset), (2, 9, 11));
            }
            other => panic!("expected a nesting error, got {other:?}"),
        }
    }

    #[test]
    fn test_warning_positions_are_resolved() {
        let output = transform("a;\nwith (o) { b; }", &TransformOptions::default()).unwrap();
        assert_eq!(output.warnings.len(), 1);

        let warning = &output.warnings[0];
        assert_eq!(warning.kind, WarningKind::UnsupportedConstruct);
        assert_eq!((warning.line, warning.column), (2, 10));
        assert_eq!(warning.offset, 12);
        assert_eq!(warning.len, 6);
    }

    #[test]
    fn test_output_serializes() {
        let output = transform("this._p(a);", &TransformOptions::default()).unwrap();
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["prop_keys"][0], "a");
        assert!(json["warnings"].as_array().unwrap().is_empty());
    }
}
