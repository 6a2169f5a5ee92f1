//! `apexres check`

use anyhow::Result;
use std::path::Path;

use super::resolve::print_errors;
use crate::ui::Output;

/// Resolve the selected containers and report only pass or fail.
pub fn check(graph: &Path, containers: &[String], quiet: bool) -> Result<()> {
    let output = Output::new(quiet);
    let snapshot = super::load_snapshot(graph)?;
    let outcomes = super::resolve_selected(&snapshot, containers)?;

    let mut failed = 0;
    for outcome in &outcomes {
        match outcome {
            Ok(result) => output.success(&format!(
                "{}: {} artifact(s)",
                result.container,
                result.artifacts.len()
            )),
            Err(errors) => {
                failed += 1;
                print_errors(&output, errors);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} container(s) failed validation", outcomes.len());
    }
    Ok(())
}
