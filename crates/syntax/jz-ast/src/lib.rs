//! Abstract syntax tree of the style language
//!
//! Nodes are immutable once parsed and every node carries a [`jz_span::FileSpan`].
//! The parser and the CSS walker are external; [`parse`] and [`lower`] describe how
//! their output is consumed, [`visit`] how the typed tree is traversed.

pub mod build;
mod expr;
pub mod lower;
pub mod parse;
mod stylesheet;
mod value;
pub mod visit;

pub use expr::{
    ArgumentList, BinaryOp, DefaultValue, Expression, InterpolationPart, ListSeparator,
    Parameter, ParameterList, RestParameter, UnaryOp, bare_name,
};
pub use stylesheet::{
    AtRule, AtRuleKind, BUILTIN_MODULES, CallableDeclaration, CallableDefinition, ClassSelector,
    Combinator, ComposeAtRule, Declaration, EachCondition, ExportAtRule, ExportSpecifier,
    ExportSpecifiers, ForCondition, IcssBinding, IcssImportAtRule, ImportAtRule,
    ImportSpecifier, ImportSpecifiers, IncludeAtRule, Node, Rule, Selector, SelectorComponent,
    SelectorList, Stylesheet, UseAtRule, is_builtin_module,
};
pub use value::{ArgumentListValue, ListValue, Numeric, Value, format_number};
pub use visit::{NodeError, NodeVisitor, walk_at_rules, walk_declarations};
