use glob::Pattern;

use super::{ValidateCtx, Validator};
use crate::error::ResolveError;

const VINTF_PATTERN: &str = "etc/vintf/*";

/// Checks on what the container installs and declares.
pub struct ContentValidator;

fn declares_tests(ctx: &ValidateCtx<'_>) -> bool {
    let decl = ctx.decl;
    let m = &decl.multilib;
    let a = &decl.arch;
    [
        &decl.native, &m.first, &m.both, &m.prefer32, &m.lib32, &m.lib64, &a.arm, &a.arm64,
        &a.riscv64, &a.x86, &a.x86_64,
    ]
    .iter()
    .any(|deps| !deps.tests.is_empty())
}

impl Validator for ContentValidator {
    fn name(&self) -> &'static str {
        "content"
    }

    fn validate(&self, ctx: &ValidateCtx<'_>) -> Vec<ResolveError> {
        let mut errors = Vec::new();

        if !ctx.info.test && declares_tests(ctx) {
            errors.push(ResolveError::property(
                ctx.container(),
                "tests",
                "property allowed only in apex_test module type",
            ));
        }

        if ctx.info.updatable {
            match Pattern::new(VINTF_PATTERN) {
                Ok(vintf) => {
                    for af in ctx.artifacts {
                        let path = af.path();
                        if vintf.matches(&path) {
                            errors.push(ResolveError::module(
                                ctx.container(),
                                format!("VINTF fragment ({path}) is not supported in updatable APEX."),
                            ));
                        }
                    }
                }
                Err(e) => errors.push(ResolveError::module(ctx.container(), e.to_string())),
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::validate::test_support::Harness;
    use apex_schema::{ArtifactClass, ContainerDecl, PackagedArtifact};

    #[test]
    fn test_tests_only_in_test_containers() {
        let mut decl = ContainerDecl::new("com.android.foo");
        decl.multilib.lib64.tests = vec!["foo_test".into()];
        let h = Harness::new(GraphBuilder::new().build(), decl.clone(), vec![]);
        let errs = h.run(&ContentValidator);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].to_string().contains("tests: property allowed only in apex_test"));

        decl.test = true;
        let h = Harness::new(GraphBuilder::new().build(), decl, vec![]);
        assert!(h.run(&ContentValidator).is_empty());
    }

    #[test]
    fn test_no_vintf_in_updatable() {
        let mut decl = ContainerDecl::new("com.android.foo");
        decl.updatable = true;
        decl.min_sdk_version = Some("31".into());
        let mut h = Harness::new(GraphBuilder::new().build(), decl, vec![]);
        h.artifacts = vec![
            PackagedArtifact::new("out/foo.xml", "etc/vintf", ArtifactClass::Etc),
            PackagedArtifact::new("out/foo.rc", "etc", ArtifactClass::Etc),
        ];
        let errs = h.run(&ContentValidator);
        assert_eq!(errs.len(), 1);
        assert!(errs[0].to_string().contains("VINTF fragment (etc/vintf/foo.xml)"));

        h.info.updatable = false;
        assert!(h.run(&ContentValidator).is_empty());
    }
}
