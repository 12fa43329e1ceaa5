//! Dependency discovery errors

#![allow(
    unused_assignments,
    reason = "Fields are read by the miette Diagnostic derive expansion"
)]

use jz_span::FileSpan;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn one at-rule into a dependency edge
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum DependencyError {
    /// Preprocessor at-rule in a plain CSS module
    #[error("At rule {name} is not allowed in css files")]
    #[diagnostic(
        code(graph::not_allowed),
        help("only @icss-import is available in plain CSS modules")
    )]
    NotAllowed {
        /// At-rule name
        name: String,
        /// Location of the at-rule
        span: FileSpan,
    },

    /// Resolver found no target
    #[error("Unable to locate \"{request}\" from \"{}\"", .from.display())]
    #[diagnostic(code(graph::unresolvable))]
    Unresolvable {
        /// Request as written
        request: String,
        /// Requesting module
        from: PathBuf,
        /// Location of the at-rule
        span: FileSpan,
    },

    /// Resolver failed
    #[error("Failed to resolve \"{request}\" from \"{}\": {message}", .from.display())]
    #[diagnostic(code(graph::rejected))]
    Rejected {
        /// Request as written
        request: String,
        /// Requesting module
        from: PathBuf,
        /// Rendered resolver error
        message: String,
        /// Location of the at-rule
        span: FileSpan,
    },
}

impl DependencyError {
    /// Location of the offending at-rule
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::NotAllowed { span, .. }
            | Self::Unresolvable { span, .. }
            | Self::Rejected { span, .. } => *span,
        }
    }
}

/// Every failure found while discovering one module's dependencies
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{} dependency error(s) in {}", .errors.len(), .module.display())]
#[diagnostic(code(graph::dependencies))]
pub struct DependencyErrors {
    /// Module whose at-rules failed
    pub module: PathBuf,
    /// Failures in at-rule order
    #[related]
    pub errors: Vec<DependencyError>,
}

impl DependencyErrors {
    /// First failure in at-rule order
    #[must_use]
    pub fn first(&self) -> Option<&DependencyError> {
        self.errors.first()
    }

    /// Failures in at-rule order
    pub fn iter(&self) -> impl Iterator<Item = &DependencyError> {
        self.errors.iter()
    }
}
