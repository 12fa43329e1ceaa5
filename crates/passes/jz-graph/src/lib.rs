//! Dependency graph builder
//!
//! Extracts the module references of a stylesheet (`@import`, `@export ...
//! from`, `@compose ... from`, `@use`, `@icss-import`), checks that the module
//! type allows each at-rule and resolves the requests, synchronously or on
//! tokio tasks.

mod builder;
mod error;
mod graph;
mod resolver;

pub use builder::{DiscoverOptions, ModuleDescriptor, NOT_ALLOWED_IN_CSS, discover};
pub use error::{DependencyError, DependencyErrors};
pub use graph::{DependencyEdge, DependencyGraph, EdgeKind};
pub use resolver::{FsResolver, PendingResolution, Resolution, Resolver};
