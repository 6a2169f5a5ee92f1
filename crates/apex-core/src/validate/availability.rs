use std::collections::HashSet;

use apex_schema::{Partition, check_available_for, invalid_available_to_entries};

use super::{ValidateCtx, Validator, walk_payload_deps};
use crate::error::ResolveError;

/// Every module embedded in the container must list it in `available_to`.
pub struct AvailabilityValidator;

fn skipped(ctx: &ValidateCtx<'_>) -> bool {
    let info = ctx.info;
    if info.test || info.vndk || ctx.config.coverage_enabled() {
        return true;
    }
    match info.partition {
        Partition::Vendor | Partition::Odm => true,
        Partition::Product => {
            ctx.config.enforce_product_partition_interface
                || info.identity.base_name.starts_with("com.sdv.")
        }
        Partition::System | Partition::SystemExt => false,
    }
}

/// `com.x.*` for partner container names like `com.x.y`.
fn partner_wildcard(name: &str) -> Option<String> {
    if !name.starts_with("com.") || name.starts_with("com.android.") {
        return None;
    }
    if name.matches('.').count() < 2 {
        return None;
    }
    let mut parts = name.split('.');
    let (first, second) = (parts.next()?, parts.next()?);
    Some(format!("{first}.{second}.*"))
}

impl Validator for AvailabilityValidator {
    fn name(&self) -> &'static str {
        "availability"
    }

    fn validate(&self, ctx: &ValidateCtx<'_>) -> Vec<ResolveError> {
        if skipped(ctx) {
            return Vec::new();
        }
        let apex_name = ctx.info.available_name.as_str();
        let mut errors = Vec::new();
        let mut checked_entries = HashSet::new();

        walk_payload_deps(ctx, |step| {
            if step.external {
                return false;
            }
            let to = ctx.graph.module(step.child);

            if checked_entries.insert(step.child) {
                for problem in invalid_available_to_entries(&to.available_to) {
                    errors.push(ResolveError::module(
                        ctx.container(),
                        format!("{:?}: apex_available: {problem}", to.name),
                    ));
                }
            }

            if check_available_for(apex_name, &to.available_to) {
                return true;
            }
            let suggestion = match partner_wildcard(apex_name) {
                Some(wildcard) => format!("{apex_name:?} or {wildcard:?}"),
                None => format!("{apex_name:?}"),
            };
            errors.push(ResolveError::module(
                ctx.container(),
                format!(
                    "{:?} requires {:?} that doesn't list the APEX under 'apex_available'.\n\nDependency path: {}\n\nConsider adding {suggestion} to 'apex_available' property of {:?}",
                    ctx.from_name(step),
                    to.name,
                    ctx.path_string(step),
                    to.name,
                ),
            ));
            true
        });
        errors
    }
}
