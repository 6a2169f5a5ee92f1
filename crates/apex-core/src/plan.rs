//! The global variant pass.
//!
//! Runs once over every prepared container before any of them is resolved.
//! For each module it decides which containers embed it, which variant each
//! container gets, and whether the module stays available to the platform.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use apex_schema::{AVAILABLE_TO_PLATFORM, ModuleId};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::graph::{ContainerBoundary, ModuleGraph};
use crate::resolver::PreparedContainer;
use crate::walker::{Visit, walk};

/// The variant a module is built as for one or more containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantAssignment {
    /// Container variation name, or `apex<min_sdk>` for a merged variant.
    pub name: String,
    /// Variation names of the containers sharing this variant.
    pub containers: Vec<String>,
    pub updatable: bool,
    pub use_platform_apis: bool,
}

#[derive(Debug, Default)]
struct Membership {
    members: BTreeSet<ModuleId>,
    internal_edges: Vec<(ModuleId, ModuleId)>,
}

/// Result of the global variant pass.
#[derive(Debug, Default)]
pub struct VariantPlan {
    containers_of: HashMap<ModuleId, Vec<String>>,
    unique: HashSet<ModuleId>,
    assignments: HashMap<ModuleId, Vec<VariantAssignment>>,
    platform_available: HashMap<ModuleId, bool>,
}

fn membership(
    graph: &ModuleGraph,
    container: &PreparedContainer,
    boundary: &dyn ContainerBoundary,
) -> Membership {
    let mut m = Membership::default();
    let roots: Vec<_> = container
        .direct
        .iter()
        .filter(|d| d.role.is_payload())
        .copied()
        .collect();

    walk(graph, &roots, |step| {
        let child = graph.module(step.child);
        if !child.caps.can_be_payload {
            return Visit::Stop;
        }
        if let Some(edge) = step.edge {
            if boundary.is_external(graph, edge) {
                return Visit::BoundaryOnly;
            }
            m.internal_edges.push((edge.from, edge.to));
        }
        m.members.insert(step.child);
        Visit::Descend
    });
    m
}

impl VariantPlan {
    /// Compute the plan for `containers`.
    pub fn compute(
        graph: &ModuleGraph,
        containers: &[PreparedContainer],
        boundary: &dyn ContainerBoundary,
    ) -> Self {
        let memberships: Vec<Membership> = containers
            .par_iter()
            .map(|c| membership(graph, c, boundary))
            .collect();

        let mut plan = Self::default();
        let mut container_idx: HashMap<ModuleId, Vec<usize>> = HashMap::new();
        for (i, m) in memberships.iter().enumerate() {
            for &id in &m.members {
                container_idx.entry(id).or_default().push(i);
            }
        }
        for (&id, idx) in &container_idx {
            plan.containers_of.insert(
                id,
                idx.iter()
                    .map(|&i| containers[i].info.variation_name().to_string())
                    .collect(),
            );
        }

        let internal: Vec<(ModuleId, ModuleId)> = memberships
            .iter()
            .flat_map(|m| m.internal_edges.iter().copied())
            .collect();

        plan.unique = container_idx
            .keys()
            .copied()
            .filter(|&id| graph.module(id).caps.unique_apex_variations)
            .collect();
        loop {
            let before = plan.unique.len();
            for &(from, to) in &internal {
                if plan.unique.contains(&to) {
                    plan.unique.insert(from);
                }
            }
            if plan.unique.len() == before {
                break;
            }
        }

        for (&id, idx) in &container_idx {
            let assigned = plan.assign(id, idx, containers);
            plan.assignments.insert(id, assigned);
        }

        plan.platform_available = graph
            .modules()
            .map(|(id, m)| (id, m.available_for(AVAILABLE_TO_PLATFORM)))
            .collect();
        let forced = |id: ModuleId| {
            let m = graph.module(id);
            m.caps.always_requires_platform_variant || m.install_to_bootstrap()
        };
        for id in graph.ids().filter(|&id| forced(id)) {
            plan.platform_available.insert(id, true);
        }
        loop {
            let mut changed = false;
            for &(from, to) in &internal {
                let child_ok = plan.platform_available.get(&to).copied().unwrap_or(true);
                if !child_ok && !forced(from) && plan.platform_available.get(&from) == Some(&true) {
                    plan.platform_available.insert(from, false);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        info!(
            containers = containers.len(),
            modules = plan.containers_of.len(),
            unique = plan.unique.len(),
            "variant plan computed"
        );
        plan
    }

    fn assign(
        &self,
        id: ModuleId,
        idx: &[usize],
        containers: &[PreparedContainer],
    ) -> Vec<VariantAssignment> {
        if self.unique.contains(&id) {
            return idx
                .iter()
                .map(|&i| {
                    let info = &containers[i].info;
                    VariantAssignment {
                        name: info.variation_name().to_string(),
                        containers: vec![info.variation_name().to_string()],
                        updatable: info.updatable,
                        use_platform_apis: info.use_platform_apis,
                    }
                })
                .collect();
        }

        let mut merged: BTreeMap<String, VariantAssignment> = BTreeMap::new();
        for &i in idx {
            let info = &containers[i].info;
            let name = info.merged_name();
            let entry = merged.entry(name.clone()).or_insert_with(|| VariantAssignment {
                name,
                containers: Vec::new(),
                updatable: false,
                use_platform_apis: true,
            });
            entry.containers.push(info.variation_name().to_string());
            entry.updatable |= info.updatable;
            entry.use_platform_apis &= info.use_platform_apis;
        }
        debug!(module = %id, variants = merged.len(), "merged container variants");
        merged.into_values().collect()
    }

    /// The variant of `module` used by the container named `variation`.
    pub fn assignment(&self, module: ModuleId, variation: &str) -> Option<&VariantAssignment> {
        self.assignments
            .get(&module)?
            .iter()
            .find(|a| a.containers.iter().any(|c| c == variation))
    }

    /// Variation names of the containers embedding `module`.
    pub fn containers_of(&self, module: ModuleId) -> &[String] {
        self.containers_of.get(&module).map_or(&[], Vec::as_slice)
    }

    pub fn needs_unique_variant(&self, module: ModuleId) -> bool {
        self.unique.contains(&module)
    }

    /// Whether `module` keeps a platform variant.
    pub fn available_to_platform(&self, module: ModuleId) -> bool {
        self.platform_available.get(&module).copied().unwrap_or(false)
    }
}
