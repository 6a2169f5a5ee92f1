//! Per-container resolution and the parallel driver over all containers.
//!
//! Resolution happens in three phases:
//!
//! 1. every container is prepared independently: identity, fan-out and
//!    direct edges ([`prepare_container`]);
//! 2. the global [`VariantPlan`] is computed over all prepared containers;
//! 3. every container is resolved independently against the plan
//!    ([`resolve_container`]): closure walk, classification, normalization
//!    and validation.
//!
//! Phases 1 and 3 run in parallel. Phase 3 borrows the plan, so it cannot
//! start before phase 2 has finished.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use apex_schema::{
    ContainerDecl, DepRole, ModuleKind, OverrideTable, PackagedArtifact, Partition,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::{self, ClassifyCtx, classifier_for, tracks_transitive};
use crate::config::GlobalConfig;
use crate::dedup;
use crate::error::{ContainerErrors, ResolveError};
use crate::exports::ApexExportsInfo;
use crate::graph::{ContainerBoundary, EdgeBoundary, ModuleGraph};
use crate::identity::ContainerInfo;
use crate::plan::VariantPlan;
use crate::validate::{self, ValidateCtx};
use crate::variants::{DirectDep, dependency_requests, materialize};
use crate::walker::{Visit, walk};

const PLACEHOLDER_PUBLIC_KEY: &str = "Public key not available";
const PLACEHOLDER_PRIVATE_KEY: &str = "Private key not available";
const PLACEHOLDER_CERTIFICATE: &str = "Certificate not available";

/// A container after fan-out, ready for the variant pass.
#[derive(Debug, Clone)]
pub struct PreparedContainer {
    /// The declaration with overrides applied.
    pub decl: ContainerDecl,
    pub info: ContainerInfo,
    pub direct: Vec<DirectDep>,
    pub missing: Vec<String>,
    /// Problems found while preparing; the container will not resolve.
    pub errors: Vec<ResolveError>,
}

impl PreparedContainer {
    pub fn name(&self) -> &str {
        self.info.variation_name()
    }
}

/// Compute the identity and direct edges of `decl`.
///
/// # Errors
///
/// Returns an error if the declaration cannot be fanned out at all
/// (invalid `min_sdk_version`, unsupported architecture). Other problems are
/// collected in [`PreparedContainer::errors`].
pub fn prepare_container(
    graph: &ModuleGraph,
    decl: &ContainerDecl,
    overrides: &OverrideTable,
    config: &GlobalConfig,
) -> Result<PreparedContainer, ResolveError> {
    let info = ContainerInfo::generate(decl, overrides, config)?;
    let decl = overrides.apply(decl);
    let requests = dependency_requests(&decl, config)?;
    let materialized = materialize(graph, info.variation_name(), &requests, config);

    let mut errors = materialized.errors;
    if decl.key.is_none() {
        errors.push(ResolveError::property(info.variation_name(), "key", "missing"));
    }
    debug!(
        container = info.variation_name(),
        requests = requests.len(),
        direct = materialized.direct.len(),
        "prepared container"
    );

    Ok(PreparedContainer {
        decl,
        info,
        direct: materialized.direct,
        missing: materialized.missing,
        errors,
    })
}

/// A certificate and its private key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificatePair {
    pub pem: PathBuf,
    pub key: PathBuf,
}

/// Signing inputs of a container. Placeholders fail only when consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SigningInputs {
    pub public_key: PathBuf,
    pub private_key: PathBuf,
    /// `None` means the platform default certificate.
    pub certificate: Option<CertificatePair>,
    /// Why an input is a placeholder, one entry per missing input.
    pub placeholders: Vec<String>,
}

impl SigningInputs {
    fn collect(
        graph: &ModuleGraph,
        prepared: &PreparedContainer,
    ) -> Result<Self, ResolveError> {
        let container = prepared.name();
        let mut signing = Self::default();

        let key = prepared.direct.iter().find(|d| d.role == DepRole::Key);
        match key.map(|d| graph.module(d.module)) {
            Some(m) => match &m.kind {
                ModuleKind::ApexKey {
                    public_key,
                    private_key,
                } => {
                    signing.public_key = public_key.clone();
                    signing.private_key = private_key.clone();
                }
                _ => {
                    return Err(ResolveError::property(
                        container,
                        "key",
                        format!("{:?} is not an apex_key module", m.name),
                    ));
                }
            },
            None => {
                let name = prepared.decl.key.as_deref().unwrap_or_default();
                warn!(container, key = name, "signing key missing, using placeholders");
                signing.public_key = PathBuf::from("placeholder_public_key");
                signing.private_key = PathBuf::from("placeholder_private_key");
                signing.placeholders.push(PLACEHOLDER_PUBLIC_KEY.to_string());
                signing.placeholders.push(PLACEHOLDER_PRIVATE_KEY.to_string());
            }
        }

        if prepared.decl.certificate.is_some() {
            let cert = prepared.direct.iter().find(|d| d.role == DepRole::Certificate);
            match cert.map(|d| graph.module(d.module)) {
                Some(m) => match &m.kind {
                    ModuleKind::Certificate { pem, key } => {
                        signing.certificate = Some(CertificatePair {
                            pem: pem.clone(),
                            key: key.clone(),
                        });
                    }
                    _ => {
                        return Err(ResolveError::property(
                            container,
                            "certificate",
                            format!("{:?} is not a certificate module", m.name),
                        ));
                    }
                },
                None => {
                    signing.certificate = Some(CertificatePair {
                        pem: PathBuf::from("placeholder_certificate.x509.pem"),
                        key: PathBuf::from("placeholder_certificate.pk8"),
                    });
                    signing.placeholders.push(PLACEHOLDER_CERTIFICATE.to_string());
                }
            }
        }
        Ok(signing)
    }
}

/// The resolved content of one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    pub container: String,
    /// Final artifacts, sorted by install path.
    pub artifacts: Vec<PackagedArtifact>,
    pub excluded_transitive: Vec<PackagedArtifact>,
    pub duplicate_superseded: Vec<PackagedArtifact>,
    /// Stems of stub libraries the container provides.
    pub provided_libs: Vec<String>,
    /// Stems of stub libraries the container needs from outside.
    pub required_libs: Vec<String>,
    /// Implementation modules that must be installed on the platform.
    pub platform_installs: Vec<String>,
    /// Direct dependencies whose install-side artifacts ship with the container.
    pub installed_alongside: Vec<String>,
    pub missing_dependencies: Vec<String>,
    pub signing: SigningInputs,
    pub exports: ApexExportsInfo,
    /// Module name to the variant it is built as for this container.
    pub module_variants: BTreeMap<String, String>,
    /// Packaging hint: bundled, installable, non-updatable system container.
    pub link_to_system_lib: bool,
}

fn link_to_system_lib(decl: &ContainerDecl, config: &GlobalConfig) -> bool {
    if config.unbundled_build || !decl.installable {
        return false;
    }
    match decl.partition {
        Partition::Vendor | Partition::Odm => return false,
        Partition::Product if config.enforce_product_partition_interface => return false,
        _ => {}
    }
    !(decl.updatable || decl.future_updatable)
}

fn sorted(mut v: Vec<String>) -> Vec<String> {
    v.sort();
    v.dedup();
    v
}

/// Resolve one prepared container against `plan`.
///
/// # Errors
///
/// Returns every problem found for the container. The errors are fatal
/// (see [`ContainerErrors::is_fatal`]) when a resolved artifact has no
/// variant assignment.
pub fn resolve_container(
    graph: &ModuleGraph,
    plan: &VariantPlan,
    prepared: &PreparedContainer,
    config: &GlobalConfig,
    boundary: &dyn ContainerBoundary,
) -> Result<ResolutionResult, ContainerErrors> {
    let container = prepared.name();
    if !prepared.errors.is_empty() {
        return Err(ContainerErrors::new(container, prepared.errors.clone()));
    }

    let ctx = ClassifyCtx {
        graph,
        decl: &prepared.decl,
        info: &prepared.info,
        config,
    };

    let mut candidates = Vec::new();
    let mut provided = Vec::new();
    let mut required = Vec::new();
    let mut platform_installs = Vec::new();
    let mut errors = Vec::new();

    let summary = walk(graph, &prepared.direct, |step| {
        let child = graph.module(step.child);
        match (step.root, step.edge) {
            (Some(dep), _) => match classifier_for(dep.role)(&ctx, dep) {
                Ok(artifacts) => {
                    let provides_stubs = matches!(dep.role, DepRole::SharedLib | DepRole::JniLib)
                        && child.caps.has_stubs_variants
                        && !prepared.info.vndk
                        && !child.install_to_bootstrap();
                    if provides_stubs {
                        provided.extend(artifacts.iter().map(PackagedArtifact::stem));
                    }
                    candidates.extend(artifacts);
                    if tracks_transitive(dep.role, child) {
                        Visit::Descend
                    } else {
                        Visit::Stop
                    }
                }
                Err(e) => {
                    errors.push(e);
                    Visit::Stop
                }
            },
            (None, Some(edge)) => {
                let external = boundary.is_external(graph, edge);
                match classifier::classify_transitive(&ctx, edge, external) {
                    Ok(t) => {
                        candidates.extend(t.artifacts);
                        required.extend(t.required);
                        platform_installs.extend(t.platform_install);
                        t.visit
                    }
                    Err(e) => {
                        errors.push(e);
                        Visit::Stop
                    }
                }
            }
            (None, None) => Visit::Stop,
        }
    });
    debug!(
        container,
        expanded = summary.expanded.len(),
        boundary = summary.boundary_hits,
        candidates = candidates.len(),
        "closure walk finished"
    );

    let mut module_variants = BTreeMap::new();
    for af in candidates.iter().filter(|af| !af.is_placeholder()) {
        let Some(owner) = &af.owner else { continue };
        if !graph.module(owner.id).caps.can_be_payload {
            continue;
        }
        match plan.assignment(owner.id, container) {
            Some(assignment) => {
                module_variants.insert(owner.name.clone(), assignment.name.clone());
            }
            None => errors.push(ResolveError::MissingVariant {
                container: container.to_string(),
                module: owner.name.clone(),
            }),
        }
    }

    let signing = match SigningInputs::collect(graph, prepared) {
        Ok(signing) => signing,
        Err(e) => {
            errors.push(e);
            SigningInputs::default()
        }
    };

    if !errors.is_empty() {
        return Err(ContainerErrors::new(container, errors));
    }

    let check_duplicate = !prepared.decl.coverage_variant && config.device_arch.is_some();
    let deduped = dedup::normalize(
        container,
        candidates,
        &prepared.decl.unwanted_transitive_deps,
        check_duplicate,
    )
    .map_err(|errs| ContainerErrors::new(container, errs))?;

    let violations = validate::run_all(&ValidateCtx {
        graph,
        decl: &prepared.decl,
        info: &prepared.info,
        config,
        direct: &prepared.direct,
        artifacts: &deduped.artifacts,
        boundary,
    });
    if !violations.is_empty() {
        return Err(ContainerErrors::new(container, violations));
    }

    let installed_alongside = prepared
        .direct
        .iter()
        .filter(|d| d.role.attrs().installable)
        .map(|d| graph.module(d.module).name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let result = ResolutionResult {
        container: container.to_string(),
        artifacts: deduped.artifacts,
        excluded_transitive: deduped.excluded_transitive,
        duplicate_superseded: deduped.duplicate_superseded,
        provided_libs: sorted(provided),
        required_libs: sorted(required),
        platform_installs: sorted(platform_installs),
        installed_alongside,
        missing_dependencies: prepared.missing.clone(),
        signing,
        exports: ApexExportsInfo::collect(graph, container, &prepared.direct),
        module_variants,
        link_to_system_lib: link_to_system_lib(&prepared.decl, config),
    };
    info!(
        container,
        artifacts = result.artifacts.len(),
        required = result.required_libs.len(),
        provided = result.provided_libs.len(),
        "resolved container"
    );
    Ok(result)
}

/// Outcome for one container: its result, or everything wrong with it.
pub type ContainerOutcome = Result<ResolutionResult, ContainerErrors>;

/// Resolves many containers over one shared module graph.
pub struct Resolver<'a> {
    graph: &'a ModuleGraph,
    config: &'a GlobalConfig,
    boundary: &'a dyn ContainerBoundary,
}

impl<'a> Resolver<'a> {
    /// A resolver using the default [`EdgeBoundary`].
    pub fn new(graph: &'a ModuleGraph, config: &'a GlobalConfig) -> Self {
        Self {
            graph,
            config,
            boundary: &EdgeBoundary,
        }
    }

    #[must_use]
    pub fn with_boundary(mut self, boundary: &'a dyn ContainerBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    /// Resolve every container in `decls`, in parallel.
    ///
    /// Outcomes are returned in declaration order. A container with user
    /// errors does not affect the others.
    ///
    /// # Errors
    ///
    /// Returns the first container whose errors are fatal; the whole run is
    /// abandoned in that case.
    pub fn resolve_all(
        &self,
        decls: &[ContainerDecl],
        overrides: &OverrideTable,
    ) -> Result<Vec<ContainerOutcome>, ContainerErrors> {
        let prepared: Vec<Result<PreparedContainer, ContainerErrors>> = decls
            .par_iter()
            .map(|decl| {
                prepare_container(self.graph, decl, overrides, self.config)
                    .map_err(|e| ContainerErrors::new(&decl.name, vec![e]))
            })
            .collect();

        if let Some(fatal) = prepared
            .iter()
            .filter_map(|p| p.as_ref().err())
            .find(|e| e.is_fatal())
        {
            return Err(fatal.clone());
        }

        let ready: Vec<PreparedContainer> = prepared
            .iter()
            .filter_map(|p| p.as_ref().ok())
            .filter(|p| p.errors.is_empty())
            .cloned()
            .collect();
        let plan = VariantPlan::compute(self.graph, &ready, self.boundary);

        let outcomes: Vec<ContainerOutcome> = prepared
            .into_par_iter()
            .map(|p| {
                let p = p?;
                resolve_container(self.graph, &plan, &p, self.config, self.boundary)
            })
            .collect();

        if let Some(fatal) = outcomes
            .iter()
            .filter_map(|o| o.as_ref().err())
            .find(|e| e.is_fatal())
        {
            return Err(fatal.clone());
        }

        let failed = outcomes.iter().filter(|o| o.is_err()).count();
        info!(containers = outcomes.len(), failed, "resolution finished");
        Ok(outcomes)
    }
}
