//! Packaging invariants checked after a container's content is resolved.
//!
//! Every validator is read-only and independent of the others. Most of them
//! walk the payload closure through [`walk_payload_deps`], which never goes
//! past the container boundary.

mod availability;
mod content;
mod linkage;
mod min_sdk;
mod updatable;

pub use availability::AvailabilityValidator;
pub use content::ContentValidator;
pub use linkage::{StaticExecutableValidator, StaticLinkageValidator};
pub use min_sdk::MinSdkValidator;
pub use updatable::UpdatableValidator;

use apex_schema::{ContainerDecl, EdgeTag, ModuleId, PackagedArtifact};

use crate::config::GlobalConfig;
use crate::error::ResolveError;
use crate::graph::{ContainerBoundary, ModuleGraph};
use crate::identity::ContainerInfo;
use crate::variants::DirectDep;
use crate::walker::{PathHop, Visit, render_path, walk};

/// Read-only view of a resolved container.
pub struct ValidateCtx<'a> {
    pub graph: &'a ModuleGraph,
    pub decl: &'a ContainerDecl,
    pub info: &'a ContainerInfo,
    pub config: &'a GlobalConfig,
    pub direct: &'a [DirectDep],
    pub artifacts: &'a [PackagedArtifact],
    pub boundary: &'a dyn ContainerBoundary,
}

impl ValidateCtx<'_> {
    pub fn container(&self) -> &str {
        self.info.variation_name()
    }

    /// Name of the module (or the container, for direct edges) that
    /// requires the step's child.
    pub fn from_name(&self, step: &PayloadStep<'_>) -> &str {
        step.parent
            .map_or(self.container(), |p| self.graph.module(p).name.as_str())
    }

    pub fn path_string(&self, step: &PayloadStep<'_>) -> String {
        render_path(self.graph, self.container(), step.path)
    }

    pub fn direct_of(&self, role: apex_schema::DepRole) -> impl Iterator<Item = &DirectDep> {
        self.direct.iter().filter(move |d| d.role == role)
    }
}

/// An edge of the payload closure.
#[derive(Debug, Clone, Copy)]
pub struct PayloadStep<'a> {
    pub parent: Option<ModuleId>,
    pub child: ModuleId,
    pub tag: EdgeTag,
    /// The child is outside the container.
    pub external: bool,
    pub path: &'a [PathHop],
}

/// Walk the payload closure of the container. `f` returns whether to
/// continue below the child; external children are never expanded.
pub fn walk_payload_deps<F>(ctx: &ValidateCtx<'_>, mut f: F)
where
    F: FnMut(&PayloadStep<'_>) -> bool,
{
    let roots: Vec<DirectDep> = ctx
        .direct
        .iter()
        .filter(|d| d.role.is_payload())
        .copied()
        .collect();

    walk(ctx.graph, &roots, |step| {
        if !ctx.graph.module(step.child).caps.can_be_payload {
            return Visit::Stop;
        }
        let external = step
            .edge
            .is_some_and(|edge| ctx.boundary.is_external(ctx.graph, edge));
        let payload_step = PayloadStep {
            parent: step.parent,
            child: step.child,
            tag: step.tag,
            external,
            path: step.path,
        };
        if !f(&payload_step) {
            Visit::Stop
        } else if external {
            Visit::BoundaryOnly
        } else {
            Visit::Descend
        }
    });
}

pub trait Validator: Sync {
    fn name(&self) -> &'static str;

    fn validate(&self, ctx: &ValidateCtx<'_>) -> Vec<ResolveError>;
}

static VALIDATORS: &[&dyn Validator] = &[
    &AvailabilityValidator,
    &StaticLinkageValidator,
    &StaticExecutableValidator,
    &UpdatableValidator,
    &MinSdkValidator,
    &ContentValidator,
];

/// Run every validator and collect their errors.
pub fn run_all(ctx: &ValidateCtx<'_>) -> Vec<ResolveError> {
    let mut errors = Vec::new();
    for v in VALIDATORS {
        let found = v.validate(ctx);
        if !found.is_empty() {
            tracing::debug!(
                container = ctx.container(),
                validator = v.name(),
                errors = found.len(),
                "validation failed"
            );
        }
        errors.extend(found);
    }
    errors
}
