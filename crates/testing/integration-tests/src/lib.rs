//! Multi-module fixtures for end-to-end tests
//!
//! A [`Project`] holds already parsed stylesheets keyed by module path. It
//! plays the part of the build scheduler: dependencies are discovered from an
//! entry module, ordered dependencies first, and compiled into one
//! [`Compilation`].

use indexmap::{IndexMap, IndexSet};
use jz_ast::{Node, Stylesheet};
use jz_driver::{Compilation, CompileError, CompileOptions, EvaluatedStylesheet};
use jz_graph::{DependencyErrors, DependencyGraph, ModuleDescriptor, Resolution, Resolver};
use jz_module::EXTENSIONS;
use std::iter;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Failure to build a [`Project`]
#[derive(Debug, Error)]
pub enum BuildError {
    /// A request of some module could not be resolved
    #[error(transparent)]
    Discovery(#[from] DependencyErrors),

    /// A module failed to compile
    #[error("{}: {error}", .module.display())]
    Compile {
        /// Failing module
        module: PathBuf,
        /// The failure
        error: CompileError,
    },

    /// Modules that import each other
    #[error("Import cycle through {}", .0.display())]
    Cycle(PathBuf),

    /// Resolved target without a stylesheet
    #[error("No stylesheet for {}", .0.display())]
    Missing(PathBuf),
}

/// Resolver over the module paths of a project
#[derive(Debug, Clone)]
pub struct MapResolver {
    known: Arc<IndexSet<PathBuf>>,
    asynchronous: bool,
}

impl MapResolver {
    /// Target of `request` from `from`, trying the module extensions in order
    #[must_use]
    pub fn lookup(&self, from: &Path, request: &str) -> Option<PathBuf> {
        let base = normalize(&from.parent().unwrap_or(Path::new("/")).join(request));
        iter::once(base.clone())
            .chain(
                EXTENSIONS
                    .iter()
                    .chain(&[".module.css", ".css"])
                    .map(|extension| {
                        let mut name = base.clone().into_os_string();
                        name.push(extension);
                        PathBuf::from(name)
                    }),
            )
            .find(|candidate| self.known.contains(candidate))
    }
}

impl Resolver for MapResolver {
    fn resolve(&self, from: &Path, request: &str) -> Resolution {
        let found = self.lookup(from, request);
        match (self.asynchronous, found) {
            (true, found) => Resolution::pending(async move { Ok(found) }),
            (false, Some(target)) => Resolution::Resolved(target),
            (false, None) => Resolution::Unresolved,
        }
    }
}

/// Drops `.` and folds `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Output of a successful build
#[derive(Debug)]
pub struct Build {
    /// The compilation, holding every module's exports
    pub compilation: Compilation,
    /// Evaluated stylesheets in compilation order
    pub outputs: IndexMap<PathBuf, EvaluatedStylesheet>,
}

impl Build {
    /// Evaluated stylesheet of `path` rendered as text
    ///
    /// # Panics
    ///
    /// Panics when `path` was not part of the build.
    #[must_use]
    pub fn output(&self, path: &str) -> String {
        self.outputs[Path::new(path)].to_string()
    }
}

/// Parsed modules of a test project
#[derive(Debug, Default)]
pub struct Project {
    /// Stylesheets by module path
    pub modules: IndexMap<PathBuf, Stylesheet>,
    /// Options of the compilation
    pub options: CompileOptions,
    /// Whether the resolver answers with pending futures
    pub asynchronous: bool,
}

impl Project {
    /// Empty project with default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module
    #[must_use]
    pub fn module(mut self, path: impl Into<PathBuf>, nodes: Vec<Node>) -> Self {
        self.modules.insert(path.into(), Stylesheet::new(nodes));
        self
    }

    /// Resolver knowing every module of the project
    #[must_use]
    pub fn resolver(&self) -> MapResolver {
        MapResolver {
            known: Arc::new(self.modules.keys().cloned().collect()),
            asynchronous: self.asynchronous,
        }
    }

    /// Discovers every module reachable from `entry`
    ///
    /// # Errors
    ///
    /// Returns the discovery failures of the first failing module, or
    /// [`BuildError::Missing`] for a target without a stylesheet.
    pub async fn discover(
        &self,
        compilation: &Compilation,
        entry: &Path,
    ) -> Result<DependencyGraph, BuildError> {
        let resolver: Arc<dyn Resolver> = Arc::new(self.resolver());
        let mut graph = DependencyGraph::new();
        let mut pending = vec![entry.to_path_buf()];

        while let Some(path) = pending.pop() {
            if graph.contains(&path) {
                continue;
            }
            let stylesheet = self
                .modules
                .get(&path)
                .ok_or_else(|| BuildError::Missing(path.clone()))?;
            let descriptor = ModuleDescriptor::new(path.clone(), Arc::clone(&resolver));
            let edges = compilation.discover(&descriptor, stylesheet).await?;
            pending.extend(edges.iter().map(|edge| edge.target.clone()));
            graph.insert(path, edges);
        }

        Ok(graph)
    }

    /// Discovers, orders and compiles everything reachable from `entry`
    ///
    /// # Errors
    ///
    /// Returns the first discovery, ordering or compilation failure.
    pub async fn build(&self, entry: &str) -> Result<Build, BuildError> {
        jz_driver::init_tracing();
        let mut compilation = Compilation::new(self.options.clone());
        let graph = self.discover(&compilation, Path::new(entry)).await?;

        let mut order = Vec::new();
        visit(&graph, Path::new(entry), &mut IndexSet::new(), &mut order)?;

        let mut outputs = IndexMap::new();
        for path in order {
            let stylesheet = self
                .modules
                .get(&path)
                .ok_or_else(|| BuildError::Missing(path.clone()))?;
            let output = compilation
                .compile(&path, stylesheet, graph.dependencies_of(&path))
                .map_err(|error| BuildError::Compile {
                    module: path.clone(),
                    error,
                })?;
            outputs.insert(path, output);
        }

        Ok(Build {
            compilation,
            outputs,
        })
    }
}

/// Post-order walk: dependencies land in `order` before their importers
fn visit(
    graph: &DependencyGraph,
    path: &Path,
    visiting: &mut IndexSet<PathBuf>,
    order: &mut Vec<PathBuf>,
) -> Result<(), BuildError> {
    if order.iter().any(|done| done == path) {
        return Ok(());
    }
    if !visiting.insert(path.to_path_buf()) {
        return Err(BuildError::Cycle(path.to_path_buf()));
    }
    for edge in graph.dependencies_of(path) {
        visit(graph, &edge.target, visiting, order)?;
    }
    visiting.shift_remove(path);
    order.push(path.to_path_buf());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_tries_extensions() {
        let project = Project::new()
            .module("/src/app.mcss", vec![])
            .module("/src/theme.global.mcss", vec![])
            .module("/reset.css", vec![]);
        let resolver = project.resolver();

        assert_eq!(
            resolver.lookup(Path::new("/src/app.mcss"), "./theme"),
            Some(PathBuf::from("/src/theme.global.mcss"))
        );
        assert_eq!(
            resolver.lookup(Path::new("/src/app.mcss"), "../reset"),
            Some(PathBuf::from("/reset.css"))
        );
        assert_eq!(resolver.lookup(Path::new("/src/app.mcss"), "./missing"), None);
    }
}
