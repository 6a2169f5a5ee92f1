use std::collections::HashSet;

use super::{ValidateCtx, Validator, walk_payload_deps};
use crate::error::ResolveError;

/// Embedded modules must support the container's `min_sdk_version`.
pub struct MinSdkValidator;

impl Validator for MinSdkValidator {
    fn name(&self) -> &'static str {
        "min-sdk"
    }

    fn validate(&self, ctx: &ValidateCtx<'_>) -> Vec<ResolveError> {
        let floor = &ctx.info.min_sdk_version;
        if ctx.info.test || ctx.info.vndk || ctx.config.coverage_enabled() || floor.is_none() {
            return Vec::new();
        }
        let floor_int = floor.final_or_future_int();

        let mut errors = Vec::new();
        let mut reported = HashSet::new();
        walk_payload_deps(ctx, |step| {
            if step.external {
                return false;
            }
            let to = ctx.graph.module(step.child);
            let declared = &to.min_sdk_version;
            if declared.is_none() || declared.final_or_future_int() <= floor_int {
                return true;
            }
            if reported.insert(step.child) {
                errors.push(ResolveError::module(
                    ctx.container(),
                    format!(
                        "should support min_sdk_version({floor}) for {:?}: newer SDK({declared}).\n\nDependency path: {}\n\nConsider adding 'min_sdk_version: {:?}' to {:?}",
                        to.name,
                        ctx.path_string(step),
                        floor.to_string(),
                        to.name,
                    ),
                ));
            }
            true
        });
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::validate::test_support::{Harness, direct};
    use apex_schema::{ApiLevel, ContainerDecl, DepRole, LinkKind, Module, ModuleKind};

    fn lib(name: &str, min_sdk: ApiLevel) -> Module {
        let mut m = Module::new(name, ModuleKind::NativeLibrary {
            implementation_name: None,
        });
        m.min_sdk_version = min_sdk;
        m
    }

    fn decl(min_sdk: Option<&str>) -> ContainerDecl {
        let mut decl = ContainerDecl::new("com.android.foo");
        decl.min_sdk_version = min_sdk.map(str::to_string);
        decl
    }

    #[test]
    fn test_newer_transitive_dep_is_reported_once() {
        let mut b = GraphBuilder::new();
        let foo = b.add_module(lib("libfoo", ApiLevel::Released(29)));
        let bar = b.add_module(lib("libbar", ApiLevel::Released(31)));
        let baz = b.add_module(lib("libbaz", ApiLevel::None));
        b.add_edge(foo, bar, LinkKind::Shared);
        b.add_edge(baz, bar, LinkKind::Shared);
        let h = Harness::new(
            b.build(),
            decl(Some("29")),
            vec![direct(DepRole::SharedLib, foo), direct(DepRole::SharedLib, baz)],
        );
        let errs = h.run(&MinSdkValidator);
        assert_eq!(errs.len(), 1);
        let msg = errs[0].to_string();
        assert!(msg.contains(r#"should support min_sdk_version(29) for "libbar": newer SDK(31)"#));
        assert!(msg.contains(r#"'min_sdk_version: "29"'"#));
    }

    #[test]
    fn test_skipped_without_floor() {
        let mut b = GraphBuilder::new();
        let foo = b.add_module(lib("libfoo", ApiLevel::Current));
        let h = Harness::new(b.build(), decl(None), vec![direct(DepRole::SharedLib, foo)]);
        assert!(h.run(&MinSdkValidator).is_empty());
    }

    #[test]
    fn test_codename_floor_accepts_everything() {
        let mut b = GraphBuilder::new();
        let foo = b.add_module(lib("libfoo", ApiLevel::Released(35)));
        let roots = vec![direct(DepRole::SharedLib, foo)];
        let h = Harness::new(b.build(), decl(Some("current")), roots);
        assert!(h.run(&MinSdkValidator).is_empty());
    }
}
