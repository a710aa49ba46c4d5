//! Diagnostic infrastructure for the bindpath rewriter.
//!
//! Parse failures and constructs the rewriter leaves untouched are reported
//! as [`Diagnostic`]s. A [`SourceCache`] resolves their byte spans to
//! line/column positions, and an emitter renders them for a terminal, for
//! tooling (JSON lines), or as plain `file:line:col` text.
//!
//! # Example
//!
//! ```
//! use bindpath_diagnostics::{
//!     Diagnostic, DiagnosticCode, DiagnosticEmitter, SimpleEmitter, SourceCache, Span,
//! };
//!
//! let mut cache = SourceCache::new();
//! let file_id = cache.add_file("render.js", "with (scope) { a }".to_string());
//!
//! let diag = Diagnostic::warning(
//!     DiagnosticCode::UnsupportedConstruct,
//!     "`with` body left unmodified",
//! )
//! .with_span(Span::new(file_id, 0, 4))
//! .build();
//!
//! let mut out = Vec::new();
//! SimpleEmitter::new(&mut out).emit(&diag, &cache).unwrap();
//! assert!(String::from_utf8(out).unwrap().starts_with("render.js:1:1: warning"));
//! ```

pub mod diagnostic;
pub mod emitter;
pub mod source_cache;
pub mod span;

pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Diagnostics, Severity};
pub use emitter::{DiagnosticEmitter, JsonEmitter, SimpleEmitter, TerminalEmitter};
pub use source_cache::{SourceCache, SourceFile};
pub use span::{FileId, Location, Span};
