//! Dependency edges and the graph they form

use derive_more::Display;
use indexmap::IndexMap;
use jz_span::FileSpan;
use std::path::{Path, PathBuf};

/// At-rule an edge originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EdgeKind {
    /// `@import`
    #[display("import")]
    Import,
    /// `@export ... from`
    #[display("export")]
    Export,
    /// `@compose ... from`
    #[display("compose")]
    Compose,
    /// `@use`
    #[display("use")]
    Use,
    /// `@icss-import`
    #[display("icss-import")]
    IcssImport,
}

/// A resolved reference from one module to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    /// Requesting module
    pub from: PathBuf,
    /// Request as written
    pub request: String,
    /// Resolved module identifier
    pub target: PathBuf,
    /// Originating at-rule
    pub kind: EdgeKind,
    /// Location of the at-rule
    pub span: FileSpan,
}

/// Edges of every discovered module, in discovery order
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    modules: IndexMap<PathBuf, Vec<DependencyEdge>>,
}

impl DependencyGraph {
    /// Empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the edges of `module`, replacing earlier ones
    pub fn insert(&mut self, module: impl Into<PathBuf>, edges: Vec<DependencyEdge>) {
        self.modules.insert(module.into(), edges);
    }

    /// Whether `module` was discovered
    #[must_use]
    pub fn contains(&self, module: &Path) -> bool {
        self.modules.contains_key(module)
    }

    /// Outgoing edges of `module`
    #[must_use]
    pub fn dependencies_of(&self, module: &Path) -> &[DependencyEdge] {
        self.modules.get(module).map_or(&[][..], Vec::as_slice)
    }

    /// Modules with an edge to `module`, each listed once
    #[must_use]
    pub fn dependents_of(&self, module: &Path) -> Vec<&Path> {
        self.modules
            .iter()
            .filter(|(_, edges)| edges.iter().any(|edge| edge.target == module))
            .map(|(from, _)| from.as_path())
            .collect()
    }

    /// Targets referenced by some module but not discovered yet
    #[must_use]
    pub fn undiscovered(&self) -> Vec<&Path> {
        let mut missing: Vec<&Path> = Vec::new();
        for edge in self.modules.values().flatten() {
            let target = edge.target.as_path();
            if !self.modules.contains_key(target) && !missing.contains(&target) {
                missing.push(target);
            }
        }
        missing
    }

    /// Discovered modules
    pub fn modules(&self) -> impl Iterator<Item = &Path> {
        self.modules.keys().map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, target: &str, kind: EdgeKind) -> DependencyEdge {
        DependencyEdge {
            from: PathBuf::from(from),
            request: target.to_string(),
            target: PathBuf::from(target),
            kind,
            span: FileSpan::default(),
        }
    }

    #[test]
    fn test_dependencies_and_dependents() {
        let mut graph = DependencyGraph::new();
        graph.insert(
            "/app.mcss",
            vec![
                edge("/app.mcss", "/theme.mcss", EdgeKind::Import),
                edge("/app.mcss", "/theme.mcss", EdgeKind::Compose),
                edge("/app.mcss", "/reset.css", EdgeKind::Use),
            ],
        );
        graph.insert("/button.mcss", vec![edge("/button.mcss", "/theme.mcss", EdgeKind::Use)]);
        graph.insert("/theme.mcss", Vec::new());

        assert_eq!(graph.dependencies_of(Path::new("/app.mcss")).len(), 3);
        assert!(graph.dependencies_of(Path::new("/unknown.mcss")).is_empty());
        assert_eq!(
            graph.dependents_of(Path::new("/theme.mcss")),
            vec![Path::new("/app.mcss"), Path::new("/button.mcss")]
        );
        assert_eq!(graph.undiscovered(), vec![Path::new("/reset.css")]);
        assert_eq!(EdgeKind::IcssImport.to_string(), "icss-import");
    }
}
