//! Reduction errors

use crate::control::DanglingElse;
use jz_scope::{BindError, CallError, ScopeError};
use jz_span::FileSpan;
use thiserror::Error;

/// Errors raised while reducing an expression to a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReduceError {
    /// Unresolved variable, function or mixin
    #[error(transparent)]
    Scope(#[from] ScopeError),

    /// Operands with units that cannot be combined
    #[error("Incompatible units {left} and {right}")]
    UnitMismatch {
        /// Unit of the left operand
        left: String,
        /// Unit of the right operand
        right: String,
        /// Location of the operation
        span: FileSpan,
    },

    /// Unsupported operand kinds or division by zero
    #[error("{message}")]
    Arithmetic {
        /// Description of the failure
        message: String,
        /// Location of the operation
        span: FileSpan,
    },

    /// Arguments that do not fit the parameter list
    #[error("{callee}: {source}")]
    Binding {
        /// Invoked callable
        callee: String,
        /// Binding failure
        source: BindError,
        /// Location of the call
        span: FileSpan,
    },

    /// Required parameter without a value
    #[error("{callee}: missing argument {parameter}")]
    MissingArgument {
        /// Invoked callable
        callee: String,
        /// Parameter name
        parameter: String,
        /// Location of the call
        span: FileSpan,
    },

    /// Failure reported by a built-in function
    #[error("{callee}: {source}")]
    Call {
        /// Invoked function
        callee: String,
        /// Native failure
        source: CallError,
        /// Location of the call
        span: FileSpan,
    },

    /// Invocations nested deeper than the configured limit
    #[error("{callee}: maximum call depth of {limit} exceeded")]
    RecursionLimit {
        /// Invoked callable
        callee: String,
        /// Configured limit
        limit: usize,
        /// Location of the call
        span: FileSpan,
    },

    /// Function body completed without `@return`
    #[error("Function {callee} finished without @return")]
    MissingReturn {
        /// Function name
        callee: String,
        /// Location of the call
        span: FileSpan,
    },

    /// Statement not allowed in a function body
    #[error("{name} is not allowed in a function body")]
    InvalidStatement {
        /// Statement as written (`@include`, a property name, a selector)
        name: String,
        /// Location of the statement
        span: FileSpan,
    },

    /// `@else` without a preceding `@if`
    #[error(transparent)]
    DanglingElse(#[from] DanglingElse),
}

impl ReduceError {
    /// Location of the failing expression or statement
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::Scope(error) => error.span(),
            Self::DanglingElse(error) => error.span,
            Self::UnitMismatch { span, .. }
            | Self::Arithmetic { span, .. }
            | Self::Binding { span, .. }
            | Self::MissingArgument { span, .. }
            | Self::Call { span, .. }
            | Self::RecursionLimit { span, .. }
            | Self::MissingReturn { span, .. }
            | Self::InvalidStatement { span, .. } => *span,
        }
    }

    pub(crate) fn arithmetic(message: impl Into<String>, span: FileSpan) -> Self {
        Self::Arithmetic {
            message: message.into(),
            span,
        }
    }
}
