use apex_schema::{DepRole, ModuleKind, is_stable_sdk_version};

use super::{ValidateCtx, Validator};
use crate::error::ResolveError;

/// Rules for containers that are updated independently of the platform.
pub struct UpdatableValidator;

impl UpdatableValidator {
    fn check_container(ctx: &ValidateCtx<'_>, errors: &mut Vec<ResolveError>) {
        let name = ctx.container();
        if ctx.decl.min_sdk_version.is_none() {
            errors.push(ResolveError::property(
                name,
                "updatable",
                "updatable APEXes should set min_sdk_version as well",
            ));
        }
        if ctx.info.min_sdk_version.is_current() {
            errors.push(ResolveError::property(
                name,
                "updatable",
                "updatable APEXes should not set min_sdk_version to current. \
                 Please use a finalized API level or a recognized in-development codename",
            ));
        }
        if ctx.info.use_platform_apis {
            errors.push(ResolveError::property(
                name,
                "platform_apis",
                "updatable APEXes can't use platform APIs",
            ));
        }
        if ctx.info.future_updatable {
            errors.push(ResolveError::property(
                name,
                "future_updatable",
                "Already updatable. Remove `future_updatable: true:`",
            ));
        }
    }

    fn check_stable_sdk(ctx: &ValidateCtx<'_>, errors: &mut Vec<ResolveError>) {
        let deps = ctx
            .direct
            .iter()
            .filter(|d| matches!(d.role, DepRole::JavaLib | DepRole::AndroidApp));
        for dep in deps {
            let m = ctx.graph.module(dep.module);
            let sdk_version = match &m.kind {
                ModuleKind::JavaLibrary { sdk_version, .. }
                | ModuleKind::App { sdk_version, .. } => sdk_version,
                _ => continue,
            };
            if !is_stable_sdk_version(sdk_version) {
                errors.push(ResolveError::module(
                    ctx.container(),
                    format!(
                        "cannot depend on {:?}: sdk_version {sdk_version:?} is not a stable SDK",
                        m.name
                    ),
                ));
            }
        }
    }

    fn check_classpath_fragments(ctx: &ValidateCtx<'_>, errors: &mut Vec<ResolveError>) {
        for dep in ctx.direct.iter() {
            let m = ctx.graph.module(dep.module);
            let proto = match &m.kind {
                ModuleKind::BootclasspathFragment { classpath_proto, .. }
                | ModuleKind::SystemServerClasspathFragment { classpath_proto } => classpath_proto,
                _ => continue,
            };
            if !proto.as_ref().is_some_and(|p| p.generated) {
                errors.push(ResolveError::module(
                    ctx.container(),
                    format!(
                        "{:?} is included in updatable apex {}, \
                         it must not set generate_classpaths_proto to false",
                        m.name,
                        ctx.container()
                    ),
                ));
            }
        }
    }

    fn check_apps(ctx: &ValidateCtx<'_>, errors: &mut Vec<ResolveError>) {
        for dep in ctx.direct_of(DepRole::AndroidApp) {
            let m = ctx.graph.module(dep.module);
            if let ModuleKind::App {
                test_helper: false,
                updatable: false,
                ..
            } = m.kind
            {
                if !m.caps.prebuilt {
                    errors.push(ResolveError::module(
                        ctx.container(),
                        format!("app dependency {} must have updatable: true", m.name),
                    ));
                }
            }
        }
    }
}

impl Validator for UpdatableValidator {
    fn name(&self) -> &'static str {
        "updatable"
    }

    fn validate(&self, ctx: &ValidateCtx<'_>) -> Vec<ResolveError> {
        if !ctx.info.updatable {
            return Vec::new();
        }
        let mut errors = Vec::new();
        Self::check_container(ctx, &mut errors);
        Self::check_stable_sdk(ctx, &mut errors);
        Self::check_classpath_fragments(ctx, &mut errors);
        Self::check_apps(ctx, &mut errors);
        errors
    }
}
