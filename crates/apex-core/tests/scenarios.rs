//! Scenario-based integration tests for the apex-core resolver.

use apex_core::{ContainerOutcome, ResolveError, ResolutionResult, Resolver, Snapshot};

const PRELUDE: &str = r#"
[config]
device_arch = "arm64"
targets = [{ arch = "arm64" }]

[[modules]]
name = "com.android.foo.key"
kind = "apex_key"
public_key = "keys/foo.avbpubkey"
private_key = "keys/foo.pem"
"#;

const CONTAINER: &str = r#"
[[containers]]
name = "com.android.foo"
updatable = false
key = "com.android.foo.key"
"#;

fn snapshot(body: &str, container: &str) -> Snapshot {
    let text = format!("{PRELUDE}{body}{CONTAINER}{container}");
    Snapshot::from_toml_str(&text).unwrap()
}

fn resolve(snap: &Snapshot) -> Vec<ContainerOutcome> {
    Resolver::new(&snap.graph, &snap.config)
        .resolve_all(&snap.containers, &snap.overrides)
        .unwrap()
}

fn resolve_one(snap: &Snapshot) -> ContainerOutcome {
    let mut outcomes = resolve(snap);
    assert_eq!(outcomes.len(), 1);
    outcomes.remove(0)
}

fn paths(result: &ResolutionResult) -> Vec<String> {
    result.artifacts.iter().map(|a| a.path()).collect()
}

const LIBFOO_LIBBAR: &str = r#"
[[modules]]
name = "libfoo"
kind = "native_library"
target = { arch = "arm64" }
outputs = ["out/arm64/libfoo.so"]
available_to = ["com.android.foo"]
deps = [{ name = "libbar", link = "shared" }]
"#;

#[test]
fn test_stub_library_is_required_not_embedded() {
    let snap = snapshot(
        &format!(
            r#"{LIBFOO_LIBBAR}
[[modules]]
name = "libbar"
kind = "native_library"
target = {{ arch = "arm64" }}
outputs = ["out/arm64/libbar.so"]
has_stubs_variants = true
available_to = ["com.android.foo", "com.android.other"]
"#
        ),
        r#"native_shared_libs = ["libfoo"]"#,
    );

    let result = resolve_one(&snap).unwrap();
    assert_eq!(paths(&result), vec!["lib64/libfoo.so"]);
    assert_eq!(result.required_libs, vec!["libbar.so"]);
    assert!(result.provided_libs.is_empty());
    assert!(!result.artifacts[0].transitive);
}

#[test]
fn test_plain_library_is_embedded_transitively() {
    let snap = snapshot(
        &format!(
            r#"{LIBFOO_LIBBAR}
[[modules]]
name = "libbar"
kind = "native_library"
target = {{ arch = "arm64" }}
outputs = ["out/arm64/libbar.so"]
available_to = ["com.android.foo"]
"#
        ),
        r#"native_shared_libs = ["libfoo"]"#,
    );

    let result = resolve_one(&snap).unwrap();
    assert_eq!(paths(&result), vec!["lib64/libbar.so", "lib64/libfoo.so"]);
    assert!(result.required_libs.is_empty());

    let libbar = result
        .artifacts
        .iter()
        .find(|a| a.module_name == "libbar")
        .unwrap();
    assert!(libbar.transitive);
    assert_eq!(result.module_variants.len(), 2);
}

#[test]
fn test_static_link_to_stub_library_fails() {
    let snap = snapshot(
        r#"
[[modules]]
name = "bin1"
kind = "native_executable"
target = { arch = "arm64" }
outputs = ["out/arm64/bin1"]
available_to = ["com.android.foo"]
deps = [{ name = "libstub", link = "static" }]

[[modules]]
name = "libstub"
kind = "native_library"
target = { arch = "arm64" }
outputs = ["out/arm64/libstub.so"]
has_stubs_variants = true
available_to = ["com.android.foo"]
"#,
        r#"
[containers.multilib.first]
binaries = ["bin1"]
"#,
    );

    let errors = resolve_one(&snap).unwrap_err();
    assert!(!errors.is_fatal());
    let linkage: Vec<String> = errors
        .errors
        .iter()
        .map(ToString::to_string)
        .filter(|m| m.contains("providing stub"))
        .collect();
    assert_eq!(linkage.len(), 1);
    assert!(linkage[0].contains("\"libstub\" required by \"bin1\""));
}

#[test]
fn test_destination_conflict() {
    let snap = snapshot(
        r#"
[[modules]]
name = "foo"
kind = "native_executable"
target = { arch = "arm64" }
outputs = ["out/foo/foo"]
available_to = ["com.android.foo"]

[[modules]]
name = "foo_dup"
kind = "native_executable"
target = { arch = "arm64" }
outputs = ["out/foo_dup/foo"]
available_to = ["com.android.foo"]
"#,
        r#"binaries = ["foo", "foo_dup"]"#,
    );

    let errors = resolve_one(&snap).unwrap_err();
    assert_eq!(errors.errors.len(), 1);
    match &errors.errors[0] {
        ResolveError::Conflict {
            dest, first, second, ..
        } => {
            assert_eq!(dest, "bin/foo");
            assert_eq!(first, "out/foo/foo");
            assert_eq!(second, "out/foo_dup/foo");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_conflict_ignored_without_device_arch() {
    let mut snap = snapshot(
        r#"
[[modules]]
name = "foo"
kind = "native_executable"
target = { arch = "arm64" }
outputs = ["out/foo/foo"]
available_to = ["com.android.foo"]

[[modules]]
name = "foo_dup"
kind = "native_executable"
target = { arch = "arm64" }
outputs = ["out/foo_dup/foo"]
available_to = ["com.android.foo"]
"#,
        r#"binaries = ["foo", "foo_dup"]"#,
    );
    snap.config.device_arch = None;

    let result = resolve_one(&snap).unwrap();
    assert_eq!(paths(&result), vec!["bin/foo"]);
    assert_eq!(result.duplicate_superseded.len(), 1);
}

#[test]
fn test_exclude_wins_over_include() {
    let snap = snapshot(
        &format!(
            r#"{LIBFOO_LIBBAR}
[[modules]]
name = "libbar"
kind = "native_library"
target = {{ arch = "arm64" }}
outputs = ["out/arm64/libbar.so"]
has_stubs_variants = true

[[modules]]
name = "libbaz"
kind = "native_library"
target = {{ arch = "arm64" }}
outputs = ["out/arm64/libbaz.so"]
available_to = ["com.android.foo"]
"#
        ),
        r#"
native_shared_libs = ["libfoo", "libbaz"]
exclude_native_shared_libs = ["libbaz"]
"#,
    );

    let result = resolve_one(&snap).unwrap();
    assert_eq!(paths(&result), vec!["lib64/libfoo.so"]);
}

#[test]
fn test_resolution_is_deterministic_and_repeatable() {
    let snap = snapshot(
        &format!(
            r#"{LIBFOO_LIBBAR}
[[modules]]
name = "libbar"
kind = "native_library"
target = {{ arch = "arm64" }}
outputs = ["out/arm64/libbar.so"]
available_to = ["com.android.foo"]

[[modules]]
name = "foo.rc"
kind = "prebuilt_etc"
outputs = ["out/foo.rc"]
available_to = ["com.android.foo"]
"#
        ),
        r#"
native_shared_libs = ["libfoo"]
prebuilts = ["foo.rc"]
"#,
    );

    let first = resolve_one(&snap).unwrap();
    let second = resolve_one(&snap).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(
        paths(&first),
        vec!["etc/foo.rc", "lib64/libbar.so", "lib64/libfoo.so"]
    );
}

#[test]
fn test_one_failing_container_does_not_affect_others() {
    let text = format!(
        r#"{PRELUDE}
[[modules]]
name = "foo.rc"
kind = "prebuilt_etc"
outputs = ["out/foo.rc"]
available_to = ["com.android.foo"]

[[containers]]
name = "com.android.foo"
updatable = false
key = "com.android.foo.key"
prebuilts = ["foo.rc"]

[[containers]]
name = "com.android.bar"
updatable = false
prebuilts = ["foo.rc"]
"#
    );
    let snap = Snapshot::from_toml_str(&text).unwrap();
    let outcomes = resolve(&snap);
    assert_eq!(outcomes.len(), 2);
    assert_eq!(paths(outcomes[0].as_ref().unwrap()), vec!["etc/foo.rc"]);

    let bar = outcomes[1].as_ref().unwrap_err();
    assert_eq!(bar.container, "com.android.bar");
    assert!(bar.errors.iter().any(|e| e.to_string().contains("key: missing")));
}

#[test]
fn test_coverage_variant_supersedes_duplicates() {
    let snap = snapshot(
        r#"
[[modules]]
name = "foo"
kind = "native_executable"
target = { arch = "arm64" }
outputs = ["out/foo/foo"]
available_to = ["com.android.foo"]

[[modules]]
name = "foo_dup"
kind = "native_executable"
target = { arch = "arm64" }
outputs = ["out/foo_dup/foo"]
available_to = ["com.android.foo"]
"#,
        r#"
coverage_variant = true
binaries = ["foo", "foo_dup"]
"#,
    );
    assert!(snap.config.device_arch.is_some());

    let result = resolve_one(&snap).unwrap();
    assert_eq!(paths(&result), vec!["bin/foo"]);
    assert_eq!(result.duplicate_superseded.len(), 1);
}

#[test]
fn test_classpath_content_across_boundary_is_not_embedded() {
    let text = format!(
        r#"{PRELUDE}
[[modules]]
name = "foo-systemserverclasspath-fragment"
kind = "system_server_classpath_fragment"
available_to = ["com.android.foo"]
deps = [
    {{ name = "service-foo", link = "system_server_classpath_content" }},
    {{ name = "service-sys", link = "system_server_classpath_content", crosses_boundary = true }},
]

[[modules]]
name = "service-foo"
kind = "java_library"
dex_jar = "out/service-foo.jar"
available_to = ["com.android.foo"]

[[modules]]
name = "service-sys"
kind = "java_library"
dex_jar = "out/service-sys.jar"

[[modules]]
name = "foo.rc"
kind = "prebuilt_etc"
outputs = ["out/foo.rc"]
available_to = ["com.android.bar"]
{CONTAINER}
systemserverclasspath_fragments = ["foo-systemserverclasspath-fragment"]

[[containers]]
name = "com.android.bar"
updatable = false
key = "com.android.foo.key"
prebuilts = ["foo.rc"]
"#
    );
    let snap = Snapshot::from_toml_str(&text).unwrap();
    let outcomes = resolve(&snap);
    assert_eq!(outcomes.len(), 2);

    let foo = outcomes[0].as_ref().unwrap();
    assert_eq!(paths(foo), vec!["javalib/service-foo.jar"]);
    assert_eq!(paths(outcomes[1].as_ref().unwrap()), vec!["etc/foo.rc"]);
}
