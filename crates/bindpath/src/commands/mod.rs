//! CLI command implementations

pub mod bench;
pub mod check;
pub mod explain;
pub mod transform;

use anyhow::{Context, Result};
use bindpath_diagnostics::{
    Diagnostic, DiagnosticEmitter, Diagnostics, FileId, JsonEmitter, SimpleEmitter, SourceCache,
    Span, TerminalEmitter,
};
use bindpath_transform::{TransformError, TransformOptions, Warning, WarningKind};
use clap::Args;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::{self, Config};
use crate::OutputFormat;

/// Transform options shared by every command that runs the rewriter.
#[derive(Args, Debug, Default)]
pub struct OptionArgs {
    /// Name of the tracking method
    #[arg(long, value_name = "NAME")]
    pub helper: Option<String>,

    /// Expression the tracking method is called on, e.g. `this` or `vm`
    #[arg(long, value_name = "EXPR")]
    pub receiver: Option<String>,

    /// Extra name that is never rewritten (repeatable)
    #[arg(long = "exclude", value_name = "NAME")]
    pub exclusions: Vec<String>,

    /// Extra property name that ends a path (repeatable)
    #[arg(long = "terminator", value_name = "NAME")]
    pub terminators: Vec<String>,

    /// Leave marker calls in place and report no prop keys
    #[arg(long)]
    pub no_collect: bool,

    /// Deepest nesting that is rewritten
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Config file [default: ./bindpath.toml when present]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl OptionArgs {
    /// Defaults, then the config file, then these flags.
    pub fn load(&self) -> Result<(TransformOptions, Config)> {
        let cwd = std::env::current_dir().context("failed to read current directory")?;
        let config = config::discover(self.config.as_deref(), &cwd)?;
        let options = self.apply(config.transform.apply(TransformOptions::default()));
        Ok((options, config))
    }

    fn apply(&self, mut options: TransformOptions) -> TransformOptions {
        if let Some(helper) = &self.helper {
            options.helper_name = helper.clone();
        }
        if let Some(receiver) = &self.receiver {
            options.receiver = receiver.clone();
        }
        options.exclusions.extend(self.exclusions.iter().cloned());
        options.terminators.extend(self.terminators.iter().cloned());
        if self.no_collect {
            options.collect_marker = None;
        }
        if let Some(max_depth) = self.max_depth {
            options.max_depth = max_depth;
        }
        options
    }
}

/// Read a file, or standard input for `-`. Returns the display name and text.
pub fn read_input(path: &Path) -> Result<(String, String)> {
    if path.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("failed to read standard input")?;
        return Ok(("<stdin>".to_string(), source));
    }

    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok((path.display().to_string(), source))
}

pub fn error_diagnostic(error: &TransformError, file_id: FileId) -> Diagnostic {
    match error {
        TransformError::Syntax {
            message, offset, ..
        } => Diagnostic::error(error.code(), message.clone())
            .with_span(Span::new(file_id, *offset, offset + 1))
            .build(),
        TransformError::TooDeep { offset, .. } => Diagnostic::error(error.code(), error.to_string())
            .with_span(Span::new(file_id, *offset, offset + 1))
            .with_help("raise `max_depth` or split the expression")
            .build(),
        TransformError::InvalidOption { .. } => Diagnostic::error(error.code(), error.to_string())
            .with_help("see `bindpath explain C001`")
            .build(),
        TransformError::Print(_) => Diagnostic::error(error.code(), error.to_string()).build(),
    }
}

pub fn warning_diagnostic(warning: &Warning, file_id: FileId) -> Diagnostic {
    let help = match warning.kind {
        WarningKind::UnsupportedConstruct => "reads inside this code are not tracked",
        WarningKind::DepthLimit => "raise `max_depth` or split the expression",
    };
    Diagnostic::warning(warning.kind.code(), warning.message.clone())
        .with_span(Span::new(
            file_id,
            warning.offset,
            warning.offset + warning.len,
        ))
        .with_help(help)
        .build()
}

/// Write diagnostics to stderr in the requested format.
pub fn emit_diagnostics(
    diagnostics: &Diagnostics,
    cache: &SourceCache,
    format: OutputFormat,
    use_color: bool,
) -> Result<()> {
    let stderr = std::io::stderr();
    let mut out = stderr.lock();
    match format {
        OutputFormat::Text => TerminalEmitter::new(&mut out, use_color).emit_all(diagnostics, cache)?,
        OutputFormat::Json => JsonEmitter::new(&mut out).emit_all(diagnostics, cache)?,
        OutputFormat::Short => SimpleEmitter::new(&mut out).emit_all(diagnostics, cache)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = OptionArgs {
            helper: Some("_track".to_string()),
            exclusions: vec!["wx".to_string()],
            no_collect: true,
            max_depth: Some(32),
            ..Default::default()
        };
        let options = args.apply(TransformOptions::default());
        assert_eq!(options.helper_name, "_track");
        assert_eq!(options.receiver, "this");
        assert_eq!(options.exclusions, vec!["wx".to_string()]);
        assert!(options.collect_marker.is_none());
        assert_eq!(options.max_depth, 32);
    }

    #[test]
    fn test_syntax_error_becomes_spanned_diagnostic() {
        let mut cache = SourceCache::new();
        let file_id = cache.add_file("bad.js", "a;\nb c;".to_string());
        let error = bindpath_transform::transform("a;\nb c;", &TransformOptions::default())
            .unwrap_err();

        let diag = error_diagnostic(&error, file_id);
        assert!(diag.is_error());
        let loc = cache.location(diag.span).unwrap();
        assert_eq!((loc.file.as_str(), loc.line), ("bad.js", 2));
    }

    #[test]
    fn test_nesting_error_is_spanned_depth_diagnostic() {
        let source = format!("x = {}0{};", "[".repeat(50), "]".repeat(50));
        let mut cache = SourceCache::new();
        let file_id = cache.add_file("deep.js", source.clone());
        let options = TransformOptions {
            max_depth: 4,
            ..Default::default()
        };
        let error = bindpath_transform::transform(&source, &options).unwrap_err();

        let diag = error_diagnostic(&error, file_id);
        assert!(diag.is_error());
        assert_eq!(diag.code.as_str(), "U002");
        let loc = cache.location(diag.span).unwrap();
        assert_eq!((loc.line, loc.column), (1, 20));
    }

    #[test]
    fn test_warning_diagnostic_keeps_range() {
        let warning = Warning {
            kind: WarningKind::UnsupportedConstruct,
            message: "`with` body left unmodified".to_string(),
            line: 1,
            column: 10,
            offset: 9,
            len: 6,
        };
        let diag = warning_diagnostic(&warning, FileId(0));
        assert!(diag.is_warning());
        assert_eq!((diag.span.start, diag.span.end), (9, 15));
        assert!(diag.help.is_some());
    }
}
