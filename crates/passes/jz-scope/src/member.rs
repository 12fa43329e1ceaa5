//! Things a name can be bound to

use crate::interop::Callable;
use crate::scope::ScopeId;
use derive_more::Display;
use jz_ast::{CallableDefinition, Value};
use jz_span::FileSpan;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Kind of a [`Member`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MemberKind {
    /// `$name: value`
    #[display("variable")]
    Variable,
    /// `@function`
    #[display("function")]
    Function,
    /// `@mixin`
    #[display("mixin")]
    Mixin,
}

/// A variable holding an already reduced value
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// The value
    pub value: Value,
    /// Module the variable was imported from
    pub source: Option<PathBuf>,
}

/// A function visible under some name
#[derive(Debug, Clone)]
pub struct Function {
    /// Implementation
    pub callable: Callable,
    /// Location of the declaring `@function`
    pub declared_at: Option<FileSpan>,
    /// Module the function was imported from
    pub source: Option<PathBuf>,
}

/// A mixin together with the scope it was defined in
#[derive(Debug, Clone)]
pub struct Mixin {
    /// Declaration and body
    pub definition: Rc<CallableDefinition>,
    /// Defining scope, outer names resolve through it on invocation
    pub closure: ScopeId,
    /// Module the mixin was imported from
    pub source: Option<PathBuf>,
}

/// Entry of a scope frame
#[derive(Debug, Clone)]
pub enum Member {
    /// Variable
    Variable(Variable),
    /// Function
    Function(Function),
    /// Mixin
    Mixin(Mixin),
}

impl Member {
    /// Local variable
    #[must_use]
    pub fn variable(value: Value) -> Self {
        Self::Variable(Variable {
            value,
            source: None,
        })
    }

    /// Local function
    #[must_use]
    pub fn function(callable: Callable, declared_at: Option<FileSpan>) -> Self {
        Self::Function(Function {
            callable,
            declared_at,
            source: None,
        })
    }

    /// Local mixin
    #[must_use]
    pub fn mixin(definition: Rc<CallableDefinition>, closure: ScopeId) -> Self {
        Self::Mixin(Mixin {
            definition,
            closure,
            source: None,
        })
    }

    /// Kind of the member
    #[must_use]
    pub fn kind(&self) -> MemberKind {
        match self {
            Self::Variable(_) => MemberKind::Variable,
            Self::Function(_) => MemberKind::Function,
            Self::Mixin(_) => MemberKind::Mixin,
        }
    }

    /// Frame a function or mixin resolves outer names through
    #[must_use]
    pub fn closure(&self) -> Option<ScopeId> {
        match self {
            Self::Function(Function {
                callable: Callable::User { closure, .. },
                ..
            })
            | Self::Mixin(Mixin { closure, .. }) => Some(*closure),
            Self::Variable(_) | Self::Function(_) => None,
        }
    }

    /// Module the member was imported from
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        match self {
            Self::Variable(Variable { source, .. })
            | Self::Function(Function { source, .. })
            | Self::Mixin(Mixin { source, .. }) => source.as_deref(),
        }
    }

    /// Tags the member with the module it comes from, keeping an existing tag
    #[must_use]
    pub fn with_source(mut self, module: &Path) -> Self {
        let source = match &mut self {
            Self::Variable(Variable { source, .. })
            | Self::Function(Function { source, .. })
            | Self::Mixin(Mixin { source, .. }) => source,
        };
        if source.is_none() {
            *source = Some(module.to_path_buf());
        }
        self
    }
}
