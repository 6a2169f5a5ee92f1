pub mod classifier;
pub mod config;
pub mod dedup;
pub mod error;
pub mod exports;
pub mod graph;
pub mod identity;
pub mod plan;
pub mod resolver;
pub mod snapshot;
pub mod validate;
pub mod variants;
pub mod walker;

pub use config::GlobalConfig;
pub use error::{ContainerErrors, ErrorKind, ResolveError};
pub use graph::{ContainerBoundary, Edge, EdgeBoundary, GraphBuilder, ModuleGraph};
pub use identity::ContainerInfo;
pub use plan::VariantPlan;
pub use resolver::{
    ContainerOutcome, PreparedContainer, ResolutionResult, Resolver, prepare_container,
    resolve_container,
};
pub use snapshot::{Snapshot, SnapshotError};
pub use variants::{DirectDep, fan_out};
