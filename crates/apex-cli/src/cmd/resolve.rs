//! `apexres resolve`

use anyhow::Result;
use apex_core::{ContainerErrors, ContainerOutcome, ResolutionResult};
use serde::Serialize;
use std::path::Path;

use crate::Format;
use crate::ui::Output;

#[derive(Serialize)]
#[serde(untagged)]
enum Report<'a> {
    Resolved(&'a ResolutionResult),
    Failed { container: &'a str, errors: Vec<String> },
}

impl<'a> From<&'a ContainerOutcome> for Report<'a> {
    fn from(outcome: &'a ContainerOutcome) -> Self {
        match outcome {
            Ok(result) => Self::Resolved(result),
            Err(e) => Self::Failed {
                container: &e.container,
                errors: e.errors.iter().map(ToString::to_string).collect(),
            },
        }
    }
}

/// Print the content of one resolved container.
pub fn print_result(output: &Output, result: &ResolutionResult) {
    output.section(&result.container);
    for af in &result.artifacts {
        output.row(&format!("{} <- {}", af.path(), af.source.display()));
        for link in af.symlink_paths() {
            output.row(&format!("{link} -> {}", af.stem()));
        }
    }
    let lists = [
        ("required", &result.required_libs),
        ("provided", &result.provided_libs),
        ("platform", &result.platform_installs),
        ("missing", &result.missing_dependencies),
    ];
    for (label, names) in lists {
        if !names.is_empty() {
            output.row(&format!("{label}: {}", names.join(" ")));
        }
    }
    for reason in &result.signing.placeholders {
        output.warning(&format!("{}: {reason}", result.container));
    }
}

pub fn print_errors(output: &Output, errors: &ContainerErrors) {
    output.error(&format!("{} failed to resolve", errors.container));
    for e in &errors.errors {
        output.error(&format!("  [{}] {e}", e.kind()));
    }
}

pub fn resolve(graph: &Path, containers: &[String], format: Format, quiet: bool) -> Result<()> {
    let output = Output::new(quiet);
    let snapshot = super::load_snapshot(graph)?;
    let outcomes = super::resolve_selected(&snapshot, containers)?;

    match format {
        Format::Json => {
            let reports: Vec<Report<'_>> = outcomes.iter().map(Report::from).collect();
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Format::Text => {
            for outcome in &outcomes {
                match outcome {
                    Ok(result) => print_result(&output, result),
                    Err(errors) => print_errors(&output, errors),
                }
            }
        }
    }

    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} container(s) failed to resolve", outcomes.len());
    }
    output.success(&format!("Resolved {} container(s)", outcomes.len()));
    Ok(())
}
