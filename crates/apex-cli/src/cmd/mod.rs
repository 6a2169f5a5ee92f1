//! Subcommand implementations

pub mod check;
pub mod fanout;
pub mod resolve;

use anyhow::{Context, Result};
use apex_core::{ContainerOutcome, Resolver, Snapshot};
use std::path::Path;

/// Load a snapshot and apply `APEXRES_*` overrides to its config.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let mut snapshot = Snapshot::load(path)
        .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
    snapshot.config = snapshot.config.apply_env();
    Ok(snapshot)
}

/// Resolve every container of `snapshot` and keep the outcomes named in
/// `names` (all of them if `names` is empty).
///
/// Containers are always resolved together, since variant assignment
/// depends on every container that embeds a module.
pub fn resolve_selected(snapshot: &Snapshot, names: &[String]) -> Result<Vec<ContainerOutcome>> {
    if let Some(unknown) = names.iter().find(|n| snapshot.container(n).is_none()) {
        anyhow::bail!("Unknown container: {unknown}");
    }
    tracing::debug!(
        selected = names.len(),
        total = snapshot.containers.len(),
        "resolving containers"
    );
    let outcomes = Resolver::new(&snapshot.graph, &snapshot.config)
        .resolve_all(&snapshot.containers, &snapshot.overrides)
        .context("Resolution aborted")?;

    Ok(snapshot
        .containers
        .iter()
        .zip(outcomes)
        .filter(|(decl, _)| names.is_empty() || names.contains(&decl.name))
        .map(|(_, outcome)| outcome)
        .collect())
}
