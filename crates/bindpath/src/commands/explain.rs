//! Explain command - explain diagnostic codes

use anyhow::{anyhow, Result};
use bindpath_diagnostics::DiagnosticCode;
use clap::Args;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Diagnostic code to explain (e.g., U001). Lists all codes when omitted.
    pub code: Option<String>,
}

struct Extra {
    example: Option<&'static str>,
    suggestion: Option<&'static str>,
    related: &'static [&'static str],
}

fn extra(code: DiagnosticCode) -> Extra {
    match code {
        DiagnosticCode::ParseError => Extra {
            example: Some("global.inject = function () { return a b; };"),
            suggestion: Some("Fix the syntax at the reported position."),
            related: &[],
        },
        DiagnosticCode::UnsupportedConstruct => Extra {
            example: Some("with (scope) {\n    title;  // left as-is, not tracked\n}"),
            suggestion: Some(
                "Move the reads out of the construct, or track them explicitly with the helper.",
            ),
            related: &["U002"],
        },
        DiagnosticCode::DepthLimit => Extra {
            example: Some("((((((((a))))))))  // with max_depth = 4"),
            suggestion: Some(
                "Raise `max_depth` in bindpath.toml or with --max-depth,\nor split the expression into smaller parts.",
            ),
            related: &["U001"],
        },
        DiagnosticCode::InvalidOption => Extra {
            example: Some("bindpath transform --receiver 'get()' render.js"),
            suggestion: Some(
                "Use an identifier for --helper and `this`, an identifier,\nor a dotted member chain for --receiver.",
            ),
            related: &[],
        },
        DiagnosticCode::IoError => Extra {
            example: None,
            suggestion: Some("Check that the path exists and is readable."),
            related: &[],
        },
    }
}

pub fn run(args: ExplainArgs, format: OutputFormat, use_color: bool) -> Result<()> {
    let Some(code) = args.code else {
        return list(format, use_color);
    };
    let code = code.to_uppercase();
    let diag_code =
        DiagnosticCode::parse(&code).ok_or_else(|| anyhow!("Unknown diagnostic code: {}", code))?;
    let title = diag_code.title();
    let extra = extra(diag_code);

    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "code": diag_code.as_str(),
            "title": title,
            "severity": diag_code.default_severity().as_str(),
            "description": diag_code.explanation(),
            "example": extra.example,
            "suggestion": extra.suggestion,
            "related": extra.related,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let rule = "=".repeat(code.len() + title.len() + 2);
    if use_color {
        println!(
            "\n{}: {}\n{}",
            console::style(&code).bold().cyan(),
            console::style(title).bold(),
            rule
        );
    } else {
        println!("\n{}: {}\n{}", code, title, rule);
    }

    println!("\n{}\n", diag_code.explanation());

    for (heading, body) in [("Example", extra.example), ("Suggestion", extra.suggestion)] {
        let Some(body) = body else { continue };
        if use_color {
            println!("{}:", console::style(heading).bold());
        } else {
            println!("{}:", heading);
        }
        for line in body.lines() {
            println!("  {}", line);
        }
        println!();
    }

    if !extra.related.is_empty() {
        if use_color {
            println!(
                "{}: {}",
                console::style("Related").dim(),
                extra.related.join(", ")
            );
        } else {
            println!("Related: {}", extra.related.join(", "));
        }
    }

    Ok(())
}

fn list(format: OutputFormat, use_color: bool) -> Result<()> {
    if format == OutputFormat::Json {
        let codes: Vec<_> = DiagnosticCode::ALL
            .iter()
            .map(|code| {
                serde_json::json!({
                    "code": code.as_str(),
                    "title": code.title(),
                    "severity": code.default_severity().as_str(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&codes)?);
        return Ok(());
    }

    for code in DiagnosticCode::ALL {
        if use_color {
            println!("{}  {}", console::style(code.as_str()).bold().cyan(), code.title());
        } else {
            println!("{}  {}", code.as_str(), code.title());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_has_a_suggestion() {
        for code in DiagnosticCode::ALL {
            assert!(extra(code).suggestion.is_some(), "{code}");
        }
    }

    #[test]
    fn test_related_codes_exist() {
        for code in DiagnosticCode::ALL {
            for related in extra(code).related {
                assert!(DiagnosticCode::parse(related).is_some(), "{related}");
            }
        }
    }

    #[test]
    fn test_unknown_code_is_an_error() {
        let args = ExplainArgs {
            code: Some("Z999".to_string()),
        };
        assert!(run(args, OutputFormat::Text, false).is_err());
    }
}
