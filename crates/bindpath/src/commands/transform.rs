//! Transform command - rewrite one script

use anyhow::{anyhow, Context, Result};
use bindpath_diagnostics::{Diagnostics, SourceCache};
use bindpath_transform::{transform, TransformOutput};
use clap::Args;
use console::style;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::PathBuf;

use super::{emit_diagnostics, error_diagnostic, read_input, warning_diagnostic, OptionArgs};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Input file, or `-` for standard input
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Write the rewritten code here instead of standard output
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print a unified diff against the input instead of the code
    #[arg(long, conflicts_with = "output")]
    pub diff: bool,

    #[command(flatten)]
    pub options: OptionArgs,
}

pub fn run(args: TransformArgs, format: OutputFormat, use_color: bool, quiet: bool) -> Result<()> {
    let (options, _config) = args.options.load()?;
    let (name, source) = read_input(&args.input)?;

    let mut cache = SourceCache::new();
    let file_id = cache.add_file(&name, source.clone());
    let mut diagnostics = Diagnostics::new();

    let output = match transform(&source, &options) {
        Ok(output) => output,
        Err(err) => {
            diagnostics.push(error_diagnostic(&err, file_id));
            emit_diagnostics(&diagnostics, &cache, format, use_color)?;
            return Err(anyhow!("failed to transform {name}"));
        }
    };

    diagnostics.extend(
        output
            .warnings
            .iter()
            .map(|warning| warning_diagnostic(warning, file_id)),
    );
    if !quiet || format == OutputFormat::Json {
        emit_diagnostics(&diagnostics, &cache, format, use_color)?;
    }

    log::info!(
        "{}: {} prop key(s), {} warning(s)",
        name,
        output.prop_keys.len(),
        output.warnings.len()
    );

    if args.diff {
        let before = normalized(&source, &name)?;
        print_diff(&before, &output.code, &name, use_color);
        return Ok(());
    }

    match (&args.output, format) {
        (Some(path), _) => {
            fs::write(path, &output.code)
                .with_context(|| format!("failed to write {}", path.display()))?;
            if !quiet && format != OutputFormat::Json {
                eprintln!(
                    "{} {} -> {}",
                    style("Rewrote").green().bold(),
                    name,
                    path.display()
                );
            }
            if format == OutputFormat::Json {
                print_json(&output)?;
            }
        }
        (None, OutputFormat::Json) => print_json(&output)?,
        (None, _) => print!("{}", output.code),
    }

    Ok(())
}

fn print_json(output: &TransformOutput) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

/// The input as the printer would lay it out, so the diff shows only rewrites.
fn normalized(source: &str, name: &str) -> Result<String> {
    let mut cache = SourceCache::new();
    let parsed = bindpath_parser::parse_script_with_cache(source, name, &mut cache)?;
    Ok(parsed.print()?)
}

fn print_diff(before: &str, after: &str, name: &str, use_color: bool) {
    let diff = TextDiff::from_lines(before, after);

    if !use_color {
        print!(
            "{}",
            diff.unified_diff()
                .context_radius(3)
                .header(&format!("a/{name}"), &format!("b/{name}"))
        );
        return;
    }

    println!("{}", style(format!("--- a/{name}")).bold());
    println!("{}", style(format!("+++ b/{name}")).bold());
    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        println!("{}", style(hunk.header()).cyan());
        for change in hunk.iter_changes() {
            let line = change.value();
            match change.tag() {
                ChangeTag::Delete => print!("{}", style(format!("-{line}")).red()),
                ChangeTag::Insert => print!("{}", style(format!("+{line}")).green()),
                ChangeTag::Equal => print!(" {line}"),
            }
            if change.missing_newline() {
                println!();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_matches_printer_layout() {
        let before = normalized("a  .  b ;", "input.js").unwrap();
        let after = transform("a  .  b ;", &Default::default()).unwrap().code;
        let diff = TextDiff::from_lines(before.as_str(), after.as_str());
        assert_eq!(diff.ops().len(), 1);
        assert!(before.contains("a.b"));
        assert!(after.contains("this._c"));
    }

    #[test]
    fn test_normalized_rejects_bad_input() {
        assert!(normalized("a b", "input.js").is_err());
    }
}
