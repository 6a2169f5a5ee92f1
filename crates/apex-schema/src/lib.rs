//! Shared types for APEX content resolution: architectures, API levels,
//! dependency roles, modules, container declarations and packaged artifacts.

pub mod api_level;
pub mod arch;
pub mod artifact;
pub mod container;
pub mod module;
pub mod role;

// Re-exports
pub use api_level::*;
pub use arch::*;
pub use artifact::*;
pub use container::*;
pub use module::*;
pub use role::*;
