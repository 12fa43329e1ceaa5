//! Contract of the generated value parser
//!
//! The grammar-driven parser lives outside this workspace. It is consumed through
//! [`Parse`]: feed it a fragment of source text plus the start rule to parse it
//! with, get back a typed [`ParsedNode`] or a positioned [`SyntaxError`].

#![allow(
    unused_assignments,
    reason = "Fields are read by the miette Diagnostic derive expansion"
)]

use crate::expr::Expression;
use crate::stylesheet::{
    CallableDeclaration, ComposeAtRule, EachCondition, ExportAtRule, ForCondition, ImportAtRule,
    IncludeAtRule, SelectorList, UseAtRule,
};
use derive_more::Display;
use jz_span::{FileSpan, LineIndex};
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Entry points exposed by the grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum StartRule {
    /// `@import` params
    #[display("imports")]
    Imports,
    /// `@export` params
    #[display("exports")]
    Exports,
    /// `@compose` params
    #[display("at_composes")]
    AtComposes,
    /// `@use` and `@icss-import` params
    #[display("values")]
    Values,
    /// Rule selector
    #[display("selector")]
    Selector,
    /// Declaration property, possibly interpolated
    #[display("declaration_prop")]
    DeclarationProp,
    /// Declaration value
    #[display("declaration_value")]
    DeclarationValue,
    /// `@for` params
    #[display("for_condition")]
    ForCondition,
    /// `@each` params
    #[display("each_condition")]
    EachCondition,
    /// `@mixin` and `@function` params
    #[display("callable_declaration")]
    CallableDeclaration,
    /// `@include` params
    #[display("call_expression")]
    CallExpression,
    /// Unary expression
    #[display("UnaryExpression")]
    UnaryExpression,
    /// Expression without division
    #[display("Expression")]
    Expression,
    /// Expression where `/` divides
    #[display("ExpressionWithDivision")]
    ExpressionWithDivision,
    /// List expression
    #[display("ListExpression")]
    ListExpression,
    /// Single numeric
    #[display("Numeric")]
    Numeric,
    /// `calc(...)` and friends
    #[display("MathCallExpression")]
    MathCallExpression,
    /// Function call
    #[display("Function")]
    Function,
    /// `url(...)`
    #[display("Url")]
    Url,
}

impl StartRule {
    /// Whether `/` parses as division under this rule
    #[must_use]
    pub fn allows_division(self) -> bool {
        matches!(
            self,
            Self::ExpressionWithDivision
                | Self::MathCallExpression
                | Self::ForCondition
                | Self::EachCondition
        )
    }
}

/// Result of parsing a fragment
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedNode {
    /// Any expression rule
    Expression(Expression),
    /// `imports`
    Import(ImportAtRule),
    /// `exports`
    Export(ExportAtRule),
    /// `at_composes`
    Compose(ComposeAtRule),
    /// `values` for `@use`
    Use(UseAtRule),
    /// `selector`
    Selector(SelectorList),
    /// `callable_declaration`
    Callable(CallableDeclaration),
    /// `call_expression`
    Include(IncludeAtRule),
    /// `each_condition`
    Each(EachCondition),
    /// `for_condition`
    For(ForCondition),
}

impl ParsedNode {
    /// Short name used in mismatch errors
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Expression(_) => "expression",
            Self::Import(_) => "import",
            Self::Export(_) => "export",
            Self::Compose(_) => "compose",
            Self::Use(_) => "use",
            Self::Selector(_) => "selector",
            Self::Callable(_) => "callable declaration",
            Self::Include(_) => "call expression",
            Self::Each(_) => "each condition",
            Self::For(_) => "for condition",
        }
    }
}

/// Positioned parse failure
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{message} at {line}:{column}")]
#[diagnostic(code(jazz::syntax))]
pub struct SyntaxError {
    /// What went wrong
    pub message: String,
    /// Byte offset within the parsed fragment
    pub offset: u32,
    /// One-based line within the fragment
    pub line: u32,
    /// One-based column within the fragment
    pub column: u32,
    /// Node the fragment belongs to
    pub node: FileSpan,
    /// Highlighted region
    #[label("here")]
    pub label: SourceSpan,
}

impl SyntaxError {
    /// Error at `offset` of `text`
    #[must_use]
    pub fn at(message: impl Into<String>, text: &str, offset: u32) -> Self {
        let position = LineIndex::new(text).line_col(offset);
        Self {
            message: message.into(),
            offset,
            line: position.line,
            column: position.column,
            node: FileSpan::default(),
            label: SourceSpan::from(offset as usize),
        }
    }

    /// Attaches the span of the node whose text failed to parse
    #[must_use]
    pub fn in_node(mut self, node: FileSpan) -> Self {
        self.node = node;
        self
    }
}

/// The generated parser
pub trait Parse {
    /// Parses `source` starting at `start`
    ///
    /// # Errors
    ///
    /// Returns a [`SyntaxError`] positioned within `source` when it does not match
    /// the start rule.
    fn parse(&self, source: &str, start: StartRule) -> Result<ParsedNode, SyntaxError>;
}

impl<F> Parse for F
where
    F: Fn(&str, StartRule) -> Result<ParsedNode, SyntaxError>,
{
    fn parse(&self, source: &str, start: StartRule) -> Result<ParsedNode, SyntaxError> {
        self(source, start)
    }
}
