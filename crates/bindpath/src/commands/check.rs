//! Check command - rewrite every script under a path and report what the
//! rewriter could not handle, without writing anything.

use anyhow::{anyhow, Result};
use bindpath_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, SourceCache, Span};
use bindpath_transform::{transform, TransformOptions};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{emit_diagnostics, error_diagnostic, warning_diagnostic, OptionArgs};
use crate::config::CheckSection;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// File or directory to check
    #[arg(default_value = ".")]
    pub input: PathBuf,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,

    /// File extension to pick up (repeatable) [default: js]
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    #[command(flatten)]
    pub options: OptionArgs,
}

/// Collect matching files under `path`, skipping `skip_dirs`.
fn collect_files(path: &Path, extensions: &[String], skip_dirs: &[String]) -> Vec<PathBuf> {
    let matches = |p: &Path| {
        p.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e == ext))
    };

    if path.is_file() {
        return if matches(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !skip_dirs
                    .iter()
                    .any(|dir| entry.file_name().to_str() == Some(dir.as_str()))
        })
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file() && matches(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

struct CheckReport {
    diagnostics: Diagnostics,
    cache: SourceCache,
    files_checked: usize,
    prop_keys: usize,
}

fn check_files(files: &[PathBuf], options: &TransformOptions, progress: &ProgressBar) -> CheckReport {
    let mut report = CheckReport {
        diagnostics: Diagnostics::new(),
        cache: SourceCache::new(),
        files_checked: 0,
        prop_keys: 0,
    };

    for path in files {
        progress.set_message(path.display().to_string());

        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                log::debug!("could not read {}: {}", path.display(), e);
                // Registered empty so the diagnostic still names the file
                let file_id = report.cache.add_file(path, String::new());
                report.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticCode::IoError,
                        format!("could not read {}: {}", path.display(), e),
                    )
                    .with_span(Span::new(file_id, 0, 0))
                    .with_help("see `bindpath explain I001`")
                    .build(),
                );
                report.files_checked += 1;
                progress.inc(1);
                continue;
            }
        };

        let file_id = report.cache.add_file(path, source.clone());
        match transform(&source, options) {
            Ok(output) => {
                report.prop_keys += output.prop_keys.len();
                report.diagnostics.extend(
                    output
                        .warnings
                        .iter()
                        .map(|warning| warning_diagnostic(warning, file_id)),
                );
            }
            Err(err) => {
                log::debug!("{}: {}", path.display(), err);
                report.diagnostics.push(error_diagnostic(&err, file_id));
            }
        }

        report.files_checked += 1;
        progress.inc(1);
    }

    report
}

pub fn run(args: CheckArgs, format: OutputFormat, use_color: bool, quiet: bool) -> Result<()> {
    let (options, config) = args.options.load()?;
    let CheckSection {
        extensions,
        skip_dirs,
        strict,
    } = config.check;
    let extensions = if args.extensions.is_empty() {
        extensions
    } else {
        args.extensions.clone()
    };
    let strict = strict || args.strict;

    let files = collect_files(&args.input, &extensions, &skip_dirs);

    if files.is_empty() {
        match format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({
                    "success": true,
                    "files": 0,
                    "errors": 0,
                    "warnings": 0,
                })
            ),
            _ if !quiet => println!("No matching files found."),
            _ => {}
        }
        return Ok(());
    }

    let progress = if quiet || format != OutputFormat::Text || files.len() < 2 {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );
        bar
    };

    let report = check_files(&files, &options, &progress);
    progress.finish_and_clear();

    emit_diagnostics(&report.diagnostics, &report.cache, format, use_color)?;

    let errors = report.diagnostics.error_count();
    let warnings = report.diagnostics.warning_count();
    let failed = errors > 0 || (strict && warnings > 0);

    match format {
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "type": "summary",
                "success": !failed,
                "files_checked": report.files_checked,
                "errors": errors,
                "warnings": warnings,
                "prop_keys": report.prop_keys,
            });
            println!("{}", serde_json::to_string(&summary)?);
        }
        _ if quiet => {}
        _ => {
            println!();
            let (headline, detail) = if errors > 0 {
                (
                    console::style("Check failed").red().bold(),
                    format!("{} error(s), {} warning(s)", errors, warnings),
                )
            } else if failed {
                (
                    console::style("Check failed").yellow().bold(),
                    format!("{} warning(s) (strict mode)", warnings),
                )
            } else if warnings > 0 {
                (
                    console::style("Check passed").yellow(),
                    format!("{} warning(s)", warnings),
                )
            } else {
                (
                    console::style("All checks passed!").green().bold(),
                    format!("{} file(s) checked", report.files_checked),
                )
            };

            if use_color {
                println!("{} - {}", headline, detail);
            } else {
                println!("{} - {}", headline.force_styling(false), detail);
            }
        }
    }

    if failed {
        Err(anyhow!("Check failed with errors"))
    } else {
        Ok(())
    }
}
