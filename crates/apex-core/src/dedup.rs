//! Normalization of the raw candidate list into a conflict-free artifact set.

use std::collections::BTreeMap;

use apex_schema::PackagedArtifact;
use tracing::{debug, trace};

use crate::error::ResolveError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deduped {
    /// Final artifacts, sorted by install path.
    pub artifacts: Vec<PackagedArtifact>,
    /// Transitive artifacts dropped through `unwanted_transitive_deps`.
    pub excluded_transitive: Vec<PackagedArtifact>,
    /// Records merged into, or shadowed by, another one with the same path.
    pub duplicate_superseded: Vec<PackagedArtifact>,
}

fn owner_name(af: &PackagedArtifact) -> &str {
    af.owner.as_ref().map_or(af.module_name.as_str(), |o| o.name.as_str())
}

/// Normalize `candidates` for `container`.
///
/// With `check_duplicate`, two records installing different sources at the
/// same path are a conflict. Otherwise the first one wins.
///
/// # Errors
///
/// Returns every conflict found.
pub fn normalize(
    container: &str,
    candidates: Vec<PackagedArtifact>,
    unwanted: &[String],
    check_duplicate: bool,
) -> Result<Deduped, Vec<ResolveError>> {
    let mut out = Deduped::default();
    let mut groups: BTreeMap<String, Vec<PackagedArtifact>> = BTreeMap::new();

    for af in candidates {
        if af.transitive && unwanted.iter().any(|u| u == owner_name(&af)) {
            trace!(container, module = owner_name(&af), "excluding unwanted transitive dep");
            out.excluded_transitive.push(af);
            continue;
        }
        groups.entry(af.path()).or_default().push(af);
    }

    let mut errors = Vec::new();
    for (dest, group) in groups {
        let mut members = group.into_iter();
        let Some(mut kept) = members.next() else {
            continue;
        };
        for other in members {
            if other.source == kept.source {
                kept.transitive = kept.transitive && other.transitive;
                kept.jni = kept.jni || other.jni;
                out.duplicate_superseded.push(other);
            } else if check_duplicate {
                errors.push(ResolveError::Conflict {
                    container: container.to_string(),
                    dest: dest.clone(),
                    first: kept.source.display().to_string(),
                    second: other.source.display().to_string(),
                });
            } else {
                out.duplicate_superseded.push(other);
            }
        }
        out.artifacts.push(kept);
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    debug!(
        container,
        artifacts = out.artifacts.len(),
        superseded = out.duplicate_superseded.len(),
        excluded = out.excluded_transitive.len(),
        "normalized artifacts"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apex_schema::{ArtifactClass, ModuleId};

    fn bin(source: &str, owner: &str) -> PackagedArtifact {
        PackagedArtifact::new(source, "bin", ArtifactClass::NativeExecutable)
            .with_stem("foo")
            .owned_by(ModuleId(0), owner)
    }

    fn lib(source: &str, owner: &str, transitive: bool) -> PackagedArtifact {
        let mut af = PackagedArtifact::new(source, "lib64", ArtifactClass::NativeSharedLib)
            .owned_by(ModuleId(1), owner);
        af.transitive = transitive;
        af
    }

    #[test]
    fn test_conflict_names_both_sources() {
        let errs = normalize(
            "com.android.foo",
            vec![bin("out/a/foo", "foo_a"), bin("out/b/foo", "foo_b")],
            &[],
            true,
        )
        .unwrap_err();
        assert_eq!(errs.len(), 1);
        let msg = errs[0].to_string();
        assert!(msg.contains("bin/foo"));
        assert!(msg.contains("out/a/foo"));
        assert!(msg.contains("out/b/foo"));
    }

    #[test]
    fn test_unchecked_keeps_first() {
        let out = normalize(
            "com.android.foo",
            vec![bin("out/a/foo", "foo_a"), bin("out/b/foo", "foo_b")],
            &[],
            false,
        )
        .unwrap();
        assert_eq!(out.artifacts.len(), 1);
        assert_eq!(out.artifacts[0].source.to_str(), Some("out/a/foo"));
        assert_eq!(out.duplicate_superseded.len(), 1);
    }

    #[test]
    fn test_same_source_merges_flags() {
        let mut jni = lib("out/libfoo.so", "libfoo", true);
        jni.jni = true;
        let out = normalize(
            "com.android.foo",
            vec![jni, lib("out/libfoo.so", "libfoo", false)],
            &[],
            true,
        )
        .unwrap();
        assert_eq!(out.artifacts.len(), 1);
        assert!(!out.artifacts[0].transitive);
        assert!(out.artifacts[0].jni);
    }

    #[test]
    fn test_unwanted_transitive_only() {
        let out = normalize(
            "com.android.foo",
            vec![
                lib("out/libbad.so", "libbad", true),
                lib("out/libdirect.so", "libdirect", false),
            ],
            &["libbad".to_string(), "libdirect".to_string()],
            true,
        )
        .unwrap();
        assert_eq!(out.excluded_transitive.len(), 1);
        assert_eq!(out.artifacts.len(), 1);
        assert_eq!(out.artifacts[0].path(), "lib64/libdirect.so");
    }

    #[test]
    fn test_sorted_and_idempotent() {
        let input = vec![
            lib("out/libz.so", "libz", false),
            bin("out/foo", "foo"),
            lib("out/liba.so", "liba", true),
            lib("out/liba.so", "liba", true),
        ];
        let once = normalize("com.android.foo", input, &[], true).unwrap();
        let paths: Vec<_> = once.artifacts.iter().map(PackagedArtifact::path).collect();
        assert_eq!(paths, vec!["bin/foo", "lib64/liba.so", "lib64/libz.so"]);

        let twice = normalize("com.android.foo", once.artifacts.clone(), &[], true).unwrap();
        assert_eq!(twice.artifacts, once.artifacts);
        assert!(twice.duplicate_superseded.is_empty());
    }
}
