//! Compilation errors

#![allow(
    unused_assignments,
    reason = "Fields are read by the miette Diagnostic derive expansion"
)]

use jz_ast::parse::SyntaxError;
use jz_graph::DependencyError;
use jz_module::ExportError;
use jz_reduce::{DanglingElse, ReduceError};
use jz_scope::ScopeError;
use jz_span::{FileSpan, LineCol, LineIndex};
use miette::{Diagnostic, NamedSource, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;

/// Any failure while compiling a module
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum CompileError {
    /// Fragment the parser rejected
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    /// Duplicate declaration or unresolved name
    #[error(transparent)]
    #[diagnostic(code(jazz::scope))]
    Scope(#[from] ScopeError),

    /// Expression that could not be reduced
    #[error(transparent)]
    #[diagnostic(code(jazz::reduce))]
    Reduce(#[from] ReduceError),

    /// Invalid `@export`, `@import` or `@compose` name
    #[error(transparent)]
    #[diagnostic(code(jazz::export))]
    Export(#[from] ExportError),

    /// At-rule illegal for the module type
    #[error(transparent)]
    #[diagnostic(transparent)]
    Dependency(#[from] DependencyError),

    /// `@else` without `@if`
    #[error(transparent)]
    #[diagnostic(code(jazz::dangling_else))]
    DanglingElse(#[from] DanglingElse),

    /// `@return` outside of a function body
    #[error("@return is only allowed in a function body")]
    #[diagnostic(code(jazz::misplaced_return))]
    ReturnOutsideFunction {
        /// Location of the at-rule
        span: FileSpan,
    },

    /// `@compose` outside of a top-level single class rule
    #[error("@compose is only allowed in a top-level single class rule")]
    #[diagnostic(code(jazz::misplaced_compose))]
    ComposeOutsideClassRule {
        /// Location of the at-rule
        span: FileSpan,
    },

    /// `@content` outside of a mixin body
    #[error("@content is only allowed in a mixin body")]
    #[diagnostic(code(jazz::misplaced_content))]
    ContentOutsideMixin {
        /// Location of the at-rule
        span: FileSpan,
    },

    /// Composed local class without a rule of its own
    #[error("Class {name} is not defined in this module")]
    #[diagnostic(code(jazz::unknown_class))]
    UnknownClass {
        /// Class name without the dot
        name: String,
        /// Location of the `@compose`
        span: FileSpan,
    },

    /// Request without a discovered edge
    #[error("\"{request}\" has not been resolved")]
    #[diagnostic(
        code(jazz::unresolved_request),
        help("run dependency discovery and pass the module's edges")
    )]
    UnresolvedRequest {
        /// Request as written
        request: String,
        /// Location of the at-rule
        span: FileSpan,
    },

    /// Dependency whose export registry is not final yet
    #[error("\"{request}\" ({}) has not been compiled yet", .path.display())]
    #[diagnostic(
        code(jazz::dependency_not_compiled),
        help("compile dependencies before their importers")
    )]
    DependencyNotCompiled {
        /// Request as written
        request: String,
        /// Resolved module identifier
        path: PathBuf,
        /// Location of the at-rule
        span: FileSpan,
    },
}

impl CompileError {
    /// Location of the offending node
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::Syntax(error) => error.node,
            Self::Scope(error) => error.span(),
            Self::Reduce(error) => error.span(),
            Self::Export(error) => error.span(),
            Self::Dependency(error) => error.span(),
            Self::DanglingElse(error) => error.span,
            Self::ReturnOutsideFunction { span }
            | Self::ComposeOutsideClassRule { span }
            | Self::ContentOutsideMixin { span }
            | Self::UnknownClass { span, .. }
            | Self::UnresolvedRequest { span, .. }
            | Self::DependencyNotCompiled { span, .. } => *span,
        }
    }

    /// Attaches the module's source text for a labelled report
    #[must_use]
    pub fn positioned(&self, name: &str, source: &str) -> PositionedError {
        let span = self.span().span;
        let start = (span.start as usize).min(source.len());
        let end = (span.end as usize).clamp(start, source.len());

        PositionedError {
            message: self.to_string(),
            location: LineIndex::new(source).line_col(span.start),
            source_code: NamedSource::new(name, source.to_string()),
            label: SourceSpan::from(start..end),
        }
    }
}

/// [`CompileError`] with the source text it points into
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(jazz::compile))]
pub struct PositionedError {
    /// Rendered error
    pub message: String,
    /// Line and column of the span start
    pub location: LineCol,
    /// The module's source
    #[source_code]
    pub source_code: NamedSource<String>,
    /// Highlighted region
    #[label("here")]
    pub label: SourceSpan,
}

#[cfg(test)]
mod tests {
    use super::*;
    use jz_span::{FileId, Span};

    #[test]
    fn test_positioned_report_carries_line_and_column() {
        let source = ".a {\n  @return 1;\n}\n";
        let error = CompileError::ReturnOutsideFunction {
            span: FileSpan::new(FileId::new(0), Span::new(7, 17)),
        };

        let positioned = error.positioned("app.mcss", source);
        assert_eq!(positioned.message, "@return is only allowed in a function body");
        assert_eq!(positioned.location, LineCol { line: 2, column: 3 });
        assert_eq!(positioned.label, SourceSpan::from(7..17));
    }

    #[test]
    fn test_span_is_clamped_to_source() {
        let error = CompileError::ContentOutsideMixin {
            span: FileSpan::new(FileId::new(0), Span::new(40, 50)),
        };
        let positioned = error.positioned("short.mcss", "a {}");
        assert_eq!(positioned.label, SourceSpan::from(4..4));
    }
}
