//! Maps a reached module and the edge that reached it to packaged artifacts.
//!
//! Direct edges dispatch through a table with one function per
//! [`DepRole`]. Module-to-module edges go through [`classify_transitive`],
//! which also decides whether the walk continues below the module.

use std::path::{Path, PathBuf};

use apex_schema::{
    ArtifactClass, ContainerDecl, DepRole, LinkKind, Module, ModuleId, ModuleKind,
    PackagedArtifact, join_rel,
};

use crate::config::GlobalConfig;
use crate::error::ResolveError;
use crate::graph::{Edge, ModuleGraph};
use crate::identity::ContainerInfo;
use crate::variants::DirectDep;
use crate::walker::Visit;

const PRESIGNED: &str = "PRESIGNED";
const BOOT_PROFILE_PLACEHOLDER: &str = "Boot image profile cannot be generated";

/// Everything a classification function may read.
#[derive(Clone, Copy)]
pub struct ClassifyCtx<'a> {
    pub graph: &'a ModuleGraph,
    pub decl: &'a ContainerDecl,
    pub info: &'a ContainerInfo,
    pub config: &'a GlobalConfig,
}

impl ClassifyCtx<'_> {
    fn container(&self) -> &str {
        self.info.variation_name()
    }

    fn handle_special_libs(&self) -> bool {
        !self.decl.ignore_system_library_special_case
    }
}

pub type ClassifyFn =
    fn(&ClassifyCtx<'_>, &DirectDep) -> Result<Vec<PackagedArtifact>, ResolveError>;

static CLASSIFIERS: [ClassifyFn; DepRole::COUNT] = [
    classify_shared_lib,
    classify_shared_lib,
    classify_executable,
    classify_test,
    classify_sh_binary,
    classify_java_lib,
    classify_app,
    classify_rro,
    classify_bpf,
    classify_filesystem,
    classify_prebuilt,
    classify_compat_config,
    classify_bootclasspath_fragment,
    classify_systemserverclasspath_fragment,
    classify_signing,
    classify_signing,
];

/// The classification function for `role`.
pub fn classifier_for(role: DepRole) -> ClassifyFn {
    CLASSIFIERS[role as usize]
}

/// Whether the walk descends below a direct dependency of `role`.
pub fn tracks_transitive(role: DepRole, module: &Module) -> bool {
    match role {
        DepRole::SharedLib
        | DepRole::JniLib
        | DepRole::Executable
        | DepRole::Test
        | DepRole::JavaLib
        | DepRole::BootclasspathFragment
        | DepRole::SystemServerClasspathFragment => true,
        DepRole::AndroidApp => match &module.kind {
            ModuleKind::App {
                app_set,
                test_helper,
                ..
            } => !module.caps.prebuilt && !test_helper && !app_set,
            _ => false,
        },
        _ => false,
    }
}

fn wrong_kind(ctx: &ClassifyCtx<'_>, dep: &DirectDep, expected: &str) -> ResolveError {
    let m = ctx.graph.module(dep.module);
    ResolveError::property(
        ctx.container(),
        dep.property,
        format!("{:?} is not a {expected} module", m.name),
    )
}

fn primary_output<'m>(ctx: &ClassifyCtx<'_>, m: &'m Module) -> Result<&'m Path, ResolveError> {
    m.primary_output().ok_or_else(|| {
        ResolveError::module(ctx.container(), format!("{:?} has no output file", m.name))
    })
}

fn native_bridge(m: &Module) -> &str {
    m.target
        .as_ref()
        .and_then(|t| t.native_bridge.as_deref())
        .unwrap_or_default()
}

/// Install directory of a native library.
pub fn native_lib_dir(ctx: &ClassifyCtx<'_>, m: &Module) -> String {
    let lib_dir = m.multilib().map_or("lib", |ml| ml.lib_dir());
    let bionic = if ctx.handle_special_libs() && m.install_to_bootstrap() {
        "bionic"
    } else {
        ""
    };
    join_rel(&[lib_dir, native_bridge(m), bionic, &m.relative_install_path])
}

/// The artifact of a native shared library.
pub fn native_lib_artifact(
    ctx: &ClassifyCtx<'_>,
    id: ModuleId,
) -> Result<PackagedArtifact, ResolveError> {
    let m = ctx.graph.module(id);
    let mut af = PackagedArtifact::new(
        primary_output(ctx, m)?,
        &native_lib_dir(ctx, m),
        ArtifactClass::NativeSharedLib,
    )
    .owned_by(id, &m.name);
    af.module_name = format!("{}{}", m.name, m.sub_name);
    af.multilib = m.multilib();
    Ok(af)
}

fn executable_artifact(
    ctx: &ClassifyCtx<'_>,
    id: ModuleId,
) -> Result<PackagedArtifact, ResolveError> {
    let m = ctx.graph.module(id);
    let dir = join_rel(&["bin", native_bridge(m), &m.relative_install_path]);
    let class = ArtifactClass::NativeExecutable;
    let mut af = PackagedArtifact::new(primary_output(ctx, m)?, &dir, class).owned_by(id, &m.name);
    af.symlinks = m.symlinks.clone();
    af.multilib = m.multilib();
    Ok(af)
}

fn java_stem(m: &Module) -> String {
    match &m.kind {
        ModuleKind::JavaLibrary {
            stem: Some(stem), ..
        } => stem.clone(),
        _ => m.name.clone(),
    }
}

/// The dex jar of a java library, installed as `javalib/<stem>.jar`.
pub fn java_artifact(
    ctx: &ClassifyCtx<'_>,
    id: ModuleId,
    property: &str,
) -> Result<PackagedArtifact, ResolveError> {
    let m = ctx.graph.module(id);
    let ModuleKind::JavaLibrary {
        dex_jar: Some(dex_jar),
        ..
    } = &m.kind
    else {
        return Err(ResolveError::property(
            ctx.container(),
            property,
            format!("{:?} is not configured to be compiled into dex", m.name),
        ));
    };
    Ok(
        PackagedArtifact::new(dex_jar, "javalib", ArtifactClass::JavaSharedLib)
            .with_stem(format!("{}.jar", java_stem(m)))
            .owned_by(id, &m.name),
    )
}

/// The dexpreopt profile installed next to a java library, if it has one.
pub fn java_profile_artifact(ctx: &ClassifyCtx<'_>, id: ModuleId) -> Option<PackagedArtifact> {
    let m = ctx.graph.module(id);
    let ModuleKind::JavaLibrary {
        profile: Some(profile),
        ..
    } = &m.kind
    else {
        return None;
    };
    let mut af = PackagedArtifact::new(profile, "javalib", ArtifactClass::Etc)
        .with_stem(format!("{}.jar.prof", java_stem(m)))
        .owned_by(id, &m.name);
    af.module_name = format!("{}-profile", m.name);
    Some(af)
}

/// Every output of a prebuilt etc module, under `<base_dir>/<sub_dir>`.
pub fn prebuilt_artifacts(
    ctx: &ClassifyCtx<'_>,
    id: ModuleId,
) -> Result<Vec<PackagedArtifact>, ResolveError> {
    let m = ctx.graph.module(id);
    let ModuleKind::PrebuiltEtc { base_dir, sub_dir } = &m.kind else {
        return Err(ResolveError::module(
            ctx.container(),
            format!("{:?} is not a prebuilt_etc module", m.name),
        ));
    };
    let dir = join_rel(&[base_dir, sub_dir]);
    Ok(m.outputs
        .iter()
        .map(|out| {
            let mut af = PackagedArtifact::new(out, &dir, ArtifactClass::Etc).owned_by(id, &m.name);
            af.module_name = af.path().replace('/', "_");
            af
        })
        .collect())
}

fn classify_shared_lib(
    ctx: &ClassifyCtx<'_>,
    dep: &DirectDep,
) -> Result<Vec<PackagedArtifact>, ResolveError> {
    let m = ctx.graph.module(dep.module);
    if !matches!(m.kind, ModuleKind::NativeLibrary { .. }) {
        return Err(wrong_kind(ctx, dep, "native shared library"));
    }
    if m.caps.is_stubs {
        return Err(ResolveError::property(
            ctx.container(),
            dep.property,
            format!("{:?} is a stub. Remove it from the list.", m.name),
        ));
    }
    let mut af = native_lib_artifact(ctx, dep.module)?;
    af.jni = dep.role == DepRole::JniLib;
    Ok(vec![af])
}

fn classify_executable(
    ctx: &ClassifyCtx<'_>,
    dep: &DirectDep,
) -> Result<Vec<PackagedArtifact>, ResolveError> {
    let m = ctx.graph.module(dep.module);
    if !matches!(m.kind, ModuleKind::NativeExecutable) {
        return Err(wrong_kind(ctx, dep, "native executable"));
    }
    Ok(vec![executable_artifact(ctx, dep.module)?])
}

// Tests are packaged as plain executables.
fn classify_test(
    ctx: &ClassifyCtx<'_>,
    dep: &DirectDep,
) -> Result<Vec<PackagedArtifact>, ResolveError> {
    let m = ctx.graph.module(dep.module);
    if !matches!(m.kind, ModuleKind::NativeExecutable) {
        return Err(wrong_kind(ctx, dep, "native test"));
    }
    Ok(vec![executable_artifact(ctx, dep.module)?])
}

fn classify_sh_binary(
    ctx: &ClassifyCtx<'_>,
    dep: &DirectDep,
) -> Result<Vec<PackagedArtifact>, ResolveError> {
    let m = ctx.graph.module(dep.module);
    let ModuleKind::ShBinary { sub_dir } = &m.kind else {
        return Err(wrong_kind(ctx, dep, "sh_binary"));
    };
    let dir = join_rel(&["bin", sub_dir, native_bridge(m)]);
    let mut af = PackagedArtifact::new(primary_output(ctx, m)?, &dir, ArtifactClass::ShBinary)
        .owned_by(dep.module, &m.name);
    af.symlinks = m.symlinks.clone();
    Ok(vec![af])
}

fn classify_java_lib(
    ctx: &ClassifyCtx<'_>,
    dep: &DirectDep,
) -> Result<Vec<PackagedArtifact>, ResolveError> {
    if !matches!(ctx.graph.module(dep.module).kind, ModuleKind::JavaLibrary { .. }) {
        return Err(wrong_kind(ctx, dep, "java_library"));
    }
    Ok(vec![java_artifact(ctx, dep.module, dep.property)?])
}

fn classify_app(
    ctx: &ClassifyCtx<'_>,
    dep: &DirectDep,
) -> Result<Vec<PackagedArtifact>, ResolveError> {
    let m = ctx.graph.module(dep.module);
    let ModuleKind::App {
        privileged,
        apk_name,
        app_set,
        priv_app_allowlist,
        certificate,
        overridden_package_name,
        ..
    } = &m.kind
    else {
        return Err(wrong_kind(ctx, dep, "android_app"));
    };
    let build_id = ctx
        .config
        .sanitized_build_id()
        .map_err(|msg| ResolveError::module(ctx.container(), msg))?;

    let base = if *privileged { "priv-app" } else { "app" };
    let mut out = Vec::with_capacity(2);

    if let Some(allowlist) = priv_app_allowlist {
        let mut af = PackagedArtifact::new(allowlist, "etc/permissions", ArtifactClass::Etc)
            .owned_by(dep.module, &m.name);
        af.module_name = format!("{}_privapp", m.name);
        out.push(af);
    }

    let (dir_name, class, cert) = if *app_set {
        (m.name.as_str(), ArtifactClass::AppSet, Some(PRESIGNED.to_string()))
    } else {
        (
            apk_name.as_deref().unwrap_or(&m.name),
            ArtifactClass::App,
            certificate.clone(),
        )
    };
    let dir = join_rel(&[base, &format!("{dir_name}@{build_id}")]);
    let mut af =
        PackagedArtifact::new(primary_output(ctx, m)?, &dir, class).owned_by(dep.module, &m.name);
    af.certificate = cert;
    af.overridden_package_name = overridden_package_name.clone();
    out.push(af);
    Ok(out)
}

fn classify_rro(
    ctx: &ClassifyCtx<'_>,
    dep: &DirectDep,
) -> Result<Vec<PackagedArtifact>, ResolveError> {
    let m = ctx.graph.module(dep.module);
    let ModuleKind::Rro { theme, certificate } = &m.kind else {
        return Err(wrong_kind(ctx, dep, "runtime_resource_overlay"));
    };
    let dir = join_rel(&["overlay", theme]);
    let mut af = PackagedArtifact::new(primary_output(ctx, m)?, &dir, ArtifactClass::App)
        .owned_by(dep.module, &m.name);
    af.certificate = certificate.clone();
    Ok(vec![af])
}

fn classify_bpf(
    ctx: &ClassifyCtx<'_>,
    dep: &DirectDep,
) -> Result<Vec<PackagedArtifact>, ResolveError> {
    let m = ctx.graph.module(dep.module);
    let ModuleKind::Bpf { sub_dir } = &m.kind else {
        return Err(wrong_kind(ctx, dep, "bpf"));
    };
    let dir = join_rel(&["etc/bpf", sub_dir]);
    Ok(m.outputs
        .iter()
        .map(|out| {
            let mut af =
                PackagedArtifact::new(out, &dir, ArtifactClass::Etc).owned_by(dep.module, &m.name);
            af.module_name = af.stem();
            af
        })
        .collect())
}

fn classify_filesystem(
    ctx: &ClassifyCtx<'_>,
    dep: &DirectDep,
) -> Result<Vec<PackagedArtifact>, ResolveError> {
    let m = ctx.graph.module(dep.module);
    if !matches!(m.kind, ModuleKind::Filesystem) {
        return Err(wrong_kind(ctx, dep, "filesystem"));
    }
    Ok(vec![
        PackagedArtifact::new(primary_output(ctx, m)?, "etc/fs", ArtifactClass::Etc)
            .owned_by(dep.module, &m.name),
    ])
}

fn classify_prebuilt(
    ctx: &ClassifyCtx<'_>,
    dep: &DirectDep,
) -> Result<Vec<PackagedArtifact>, ResolveError> {
    if !matches!(ctx.graph.module(dep.module).kind, ModuleKind::PrebuiltEtc { .. }) {
        return Err(wrong_kind(ctx, dep, "prebuilt_etc"));
    }
    prebuilt_artifacts(ctx, dep.module)
}

fn classify_compat_config(
    ctx: &ClassifyCtx<'_>,
    dep: &DirectDep,
) -> Result<Vec<PackagedArtifact>, ResolveError> {
    let m = ctx.graph.module(dep.module);
    let ModuleKind::CompatConfig { sub_dir } = &m.kind else {
        return Err(wrong_kind(ctx, dep, "platform_compat_config"));
    };
    let dir = join_rel(&["etc", sub_dir]);
    Ok(vec![
        PackagedArtifact::new(primary_output(ctx, m)?, &dir, ArtifactClass::Etc)
            .owned_by(dep.module, &m.name),
    ])
}

fn classpath_proto_artifact(
    id: ModuleId,
    m: &Module,
    proto: Option<&apex_schema::ClasspathProto>,
) -> Option<PackagedArtifact> {
    let proto = proto.filter(|p| p.generated)?;
    Some(
        PackagedArtifact::new(&proto.output, &proto.install_dir, ArtifactClass::Etc)
            .owned_by(id, &m.name),
    )
}

fn classify_bootclasspath_fragment(
    ctx: &ClassifyCtx<'_>,
    dep: &DirectDep,
) -> Result<Vec<PackagedArtifact>, ResolveError> {
    let m = ctx.graph.module(dep.module);
    let ModuleKind::BootclasspathFragment {
        classpath_proto,
        profile_in_apex,
        profile_on_host,
        ..
    } = &m.kind
    else {
        return Err(wrong_kind(ctx, dep, "bootclasspath_fragment"));
    };

    let mut out: Vec<_> = classpath_proto_artifact(dep.module, m, classpath_proto.as_ref())
        .into_iter()
        .collect();

    if let Some(in_apex) = profile_in_apex {
        let in_apex = Path::new(in_apex);
        let dir = in_apex
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = in_apex
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (source, placeholder) = match profile_on_host {
            Some(p) => (p.clone(), None),
            None => (PathBuf::from(&stem), Some(BOOT_PROFILE_PLACEHOLDER.to_string())),
        };
        let mut af = PackagedArtifact::new(source, &dir, ArtifactClass::Etc)
            .with_stem(stem.clone())
            .owned_by(dep.module, &m.name);
        af.module_name = stem;
        af.placeholder = placeholder;
        out.push(af);
    }
    Ok(out)
}

fn classify_systemserverclasspath_fragment(
    ctx: &ClassifyCtx<'_>,
    dep: &DirectDep,
) -> Result<Vec<PackagedArtifact>, ResolveError> {
    let m = ctx.graph.module(dep.module);
    let ModuleKind::SystemServerClasspathFragment { classpath_proto } = &m.kind else {
        return Err(wrong_kind(ctx, dep, "systemserverclasspath_fragment"));
    };
    Ok(classpath_proto_artifact(dep.module, m, classpath_proto.as_ref())
        .into_iter()
        .collect())
}

// Key and certificate only feed signing inputs.
fn classify_signing(
    _ctx: &ClassifyCtx<'_>,
    _dep: &DirectDep,
) -> Result<Vec<PackagedArtifact>, ResolveError> {
    Ok(Vec::new())
}

/// Outcome of a module-to-module edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Transitive {
    pub artifacts: Vec<PackagedArtifact>,
    /// Stem of a stub library the container needs from outside.
    pub required: Option<String>,
    /// Implementation module to install on the platform.
    pub platform_install: Option<String>,
    pub visit: Visit,
}

impl Transitive {
    fn stop() -> Self {
        Self::with(Vec::new(), Visit::Stop)
    }

    fn with(artifacts: Vec<PackagedArtifact>, visit: Visit) -> Self {
        Self {
            artifacts,
            required: None,
            platform_install: None,
            visit,
        }
    }
}

/// Classify `edge`, found below a direct dependency. `external` is the
/// boundary predicate's verdict for the edge.
///
/// # Errors
///
/// Fails for edges into installable modules whose link kind has no
/// packaging rule, and for classpath content without a dex jar.
pub fn classify_transitive(
    ctx: &ClassifyCtx<'_>,
    edge: &Edge,
    external: bool,
) -> Result<Transitive, ResolveError> {
    if ctx.info.vndk {
        return Ok(Transitive::stop());
    }
    let parent = ctx.graph.module(edge.from);
    let child = ctx.graph.module(edge.to);
    if !child.caps.can_be_payload {
        return Ok(Transitive::stop());
    }

    match edge.link {
        LinkKind::Shared | LinkKind::Runtime => {
            let ModuleKind::NativeLibrary {
                implementation_name,
            } = &child.kind
            else {
                return Ok(Transitive::stop());
            };
            let mut af = native_lib_artifact(ctx, edge.to)?;
            if child.caps.has_stubs_variants || child.caps.is_stubs {
                let platform_install = (child.caps.stubs_implementation_required
                    && !child.caps.not_in_platform
                    && !ctx.config.unbundled_build)
                    .then(|| {
                        format!(
                            "{}{}",
                            implementation_name.as_deref().unwrap_or(&child.name),
                            child.sub_name
                        )
                    });
                return Ok(Transitive {
                    artifacts: Vec::new(),
                    required: Some(af.stem()),
                    platform_install,
                    visit: Visit::BoundaryOnly,
                });
            }
            if external {
                return Ok(Transitive::with(Vec::new(), Visit::BoundaryOnly));
            }
            af.transitive = true;
            Ok(Transitive::with(vec![af], Visit::Descend))
        }
        LinkKind::RustDylib => {
            if external {
                return Ok(Transitive::with(Vec::new(), Visit::BoundaryOnly));
            }
            if !child.installable_to_apex() {
                return Ok(Transitive::stop());
            }
            let mut af = native_lib_artifact(ctx, edge.to)?;
            af.transitive = true;
            Ok(Transitive::with(vec![af], Visit::Descend))
        }
        LinkKind::RustRlib => Ok(Transitive::with(Vec::new(), Visit::Descend)),
        LinkKind::Header
        | LinkKind::Jni
        | LinkKind::Static
        | LinkKind::Required
        | LinkKind::ExcludeFromContents => Ok(Transitive::stop()),
        LinkKind::XmlPermissions
        | LinkKind::BootclasspathContent
        | LinkKind::SystemServerClasspathContent
        | LinkKind::Vintf
            if external =>
        {
            Ok(Transitive::with(Vec::new(), Visit::BoundaryOnly))
        }
        LinkKind::XmlPermissions => Ok(Transitive::with(
            prebuilt_artifacts(ctx, edge.to)?,
            Visit::Stop,
        )),
        LinkKind::BootclasspathContent => {
            let ModuleKind::BootclasspathFragment { dex_boot_jars, .. } = &parent.kind else {
                return Ok(Transitive::stop());
            };
            let Some(jar) = dex_boot_jars.get(&child.name) else {
                return Err(ResolveError::module(
                    ctx.container(),
                    format!(
                        "failed to find dex jar path for module {:?} in {:?}",
                        child.name, parent.name
                    ),
                ));
            };
            let af = PackagedArtifact::new(jar, "javalib", ArtifactClass::JavaSharedLib)
                .with_stem(format!("{}.jar", java_stem(child)))
                .owned_by(edge.to, &child.name);
            Ok(Transitive::with(vec![af], Visit::Descend))
        }
        LinkKind::SystemServerClasspathContent => {
            let mut out = vec![java_artifact(ctx, edge.to, "contents")?];
            out.extend(java_profile_artifact(ctx, edge.to));
            Ok(Transitive::with(out, Visit::Descend))
        }
        LinkKind::Vintf | LinkKind::Other if child.installable_to_apex() => {
            Err(ResolveError::module(
                ctx.container(),
                format!(
                    "unexpected tag {:?} for indirect dependency {:?}",
                    edge.link, child.name
                ),
            ))
        }
        LinkKind::Vintf => {
            let artifacts = child
                .outputs
                .iter()
                .map(|out| {
                    PackagedArtifact::new(out, "etc/vintf", ArtifactClass::Etc)
                        .owned_by(edge.to, &child.name)
                })
                .collect();
            Ok(Transitive::with(artifacts, Visit::Stop))
        }
        LinkKind::Other => Ok(Transitive::stop()),
    }
}
