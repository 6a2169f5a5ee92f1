use std::collections::HashSet;

use apex_schema::DepRole;

use super::{ValidateCtx, Validator, walk_payload_deps};
use crate::error::ResolveError;

const RUNTIME_APEX: &str = "com.android.runtime";

/// Stub-providing libraries must be linked dynamically, never embedded
/// through a static link.
pub struct StaticLinkageValidator;

impl Validator for StaticLinkageValidator {
    fn name(&self) -> &'static str {
        "static-linkage"
    }

    fn validate(&self, ctx: &ValidateCtx<'_>) -> Vec<ResolveError> {
        if ctx.info.test || ctx.info.vndk {
            return Vec::new();
        }
        let direct_shared: HashSet<&str> = ctx
            .direct_of(DepRole::SharedLib)
            .map(|d| ctx.graph.module(d.module).name.as_str())
            .collect();
        let is_runtime = ctx.container() == RUNTIME_APEX;

        let mut errors = Vec::new();
        walk_payload_deps(ctx, |step| {
            if step.external {
                return false;
            }
            let to = ctx.graph.module(step.child);
            let from = ctx.from_name(step);
            if is_runtime && matches!(from, "linker" | "crash_dump" | "linkerconfig") {
                return false;
            }
            if to.name == "libz" {
                return false;
            }
            if !to.caps.has_stubs_variants || direct_shared.contains(to.name.as_str()) {
                return true;
            }
            errors.push(ResolveError::module(
                ctx.container(),
                format!(
                    "{:?} required by {from:?} is a native library providing stub. \
                     It shouldn't be included in this APEX via static linking. \
                     Dependency path: {}",
                    to.name,
                    ctx.path_string(step),
                ),
            ));
            true
        });
        errors
    }
}

/// Executables must not be fully static.
pub struct StaticExecutableValidator;

impl Validator for StaticExecutableValidator {
    fn name(&self) -> &'static str {
        "static-executables"
    }

    fn validate(&self, ctx: &ValidateCtx<'_>) -> Vec<ResolveError> {
        let is_runtime = ctx.container() == RUNTIME_APEX;
        ctx.direct_of(DepRole::Executable)
            .map(|d| ctx.graph.module(d.module))
            .filter(|m| m.caps.static_executable)
            .filter(|m| !(is_runtime && matches!(m.name.as_str(), "linker" | "linkerconfig")))
            .map(|m| {
                ResolveError::module(ctx.container(), format!("executable {} is static", m.name))
            })
            .collect()
    }
}
