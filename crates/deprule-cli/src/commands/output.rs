//! Output formatting for check results.

use anyhow::Result;
use deprule_core::{CheckReport, Classification, Dependency, RuleSetError, RuleViolation};
use miette::GraphicalReportHandler;

use crate::OutputFormat;

/// Print check results in the specified format.
pub fn print(report: &CheckReport, dependencies: &[Dependency], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(report),
        OutputFormat::Json => return print_json(report),
        OutputFormat::Compact => {
            for violation in &report.violations {
                println!("{}", compact_line(violation, &dependencies[violation.index]));
            }
        }
    }
    Ok(())
}

/// Renders skipped rule files as diagnostics on stderr.
pub fn print_rule_errors(errors: &[RuleSetError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        if handler.render_report(&mut rendered, error).is_ok() {
            eprintln!("{rendered}");
        } else {
            eprintln!("{error}");
        }
    }
}

fn print_text(report: &CheckReport) {
    for violation in &report.violations {
        let indicator = match violation.classification {
            Classification::Bad => "\x1b[31mbad\x1b[0m",
            Classification::Questionable => "\x1b[33mquestionable\x1b[0m",
            Classification::Ok => "\x1b[32mok\x1b[0m",
        };
        println!("{indicator}: {} ---> {}", violation.using, violation.used);
        if let Some(source) = &violation.source {
            println!("  at {source}");
        }
        if !violation.group.is_empty() {
            println!("  = rule group: {}", violation.group);
        }
        println!();
    }

    let summary_color = if report.bad > 0 {
        "\x1b[31m"
    } else if report.questionable > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };
    println!("{summary_color}{}\x1b[0m", report.summary());
}

fn print_json(report: &CheckReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{json}");
    Ok(())
}

/// `location: classification: using ---> used`, where the location is the
/// source position, else the input file, else `-`.
fn compact_line(violation: &RuleViolation, dependency: &Dependency) -> String {
    let location = violation
        .source
        .as_ref()
        .map(ToString::to_string)
        .or_else(|| dependency.input().map(str::to_string))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{location}: {}: {} ---> {}",
        violation.classification, violation.using, violation.used
    )
}
