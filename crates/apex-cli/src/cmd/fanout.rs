//! `apexres fanout`

use anyhow::{Context, Result};
use apex_core::variants::dependency_requests;
use std::path::Path;

use crate::Format;
use crate::ui::Output;

/// Print the dependency requests a container makes, one per line:
/// `<target> <role> <property> <name>`.
pub fn fanout(graph: &Path, container: &str, format: Format, quiet: bool) -> Result<()> {
    let output = Output::new(quiet);
    let snapshot = super::load_snapshot(graph)?;
    let decl = snapshot
        .container(container)
        .with_context(|| format!("Unknown container: {container}"))?;
    let decl = snapshot.overrides.apply(decl);
    let requests = dependency_requests(&decl, &snapshot.config)?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&requests)?),
        Format::Text => {
            output.section(&decl.name);
            for req in &requests {
                let target = req
                    .target
                    .as_ref()
                    .map_or_else(|| "common".to_string(), ToString::to_string);
                output.row(&format!(
                    "{target:<10} {:<28} {:<32} {}",
                    req.role.name(),
                    req.property,
                    req.name
                ));
            }
        }
    }
    output.info(&format!("{} request(s)", requests.len()));
    Ok(())
}
