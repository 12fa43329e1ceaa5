//! Stylesheet nodes: rules, declarations and at-rules

use crate::expr::{ArgumentList, Expression, ParameterList};
use crate::visit::NodeError;
use jz_span::FileSpan;
use std::fmt;

/// Modules that `@use` resolves without the resolver
pub const BUILTIN_MODULES: &[&str] = &["math", "string", "list", "meta"];

/// Whether `request` names a built-in module
#[must_use]
pub fn is_builtin_module(request: &str) -> bool {
    BUILTIN_MODULES.contains(&request)
}

/// A parsed stylesheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    /// Top-level nodes
    pub nodes: Vec<Node>,
}

impl Stylesheet {
    /// Creates a stylesheet from its top-level nodes
    #[must_use]
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }
}

/// Any node of a stylesheet
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Style rule
    Rule(Rule),
    /// At-rule
    AtRule(AtRule),
    /// Declaration (including variable declarations)
    Declaration(Declaration),
}

impl Node {
    /// Source location
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::Rule(rule) => rule.span,
            Self::AtRule(at_rule) => at_rule.span,
            Self::Declaration(decl) => decl.span,
        }
    }

    /// Positioned error pointing at this node
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> NodeError {
        NodeError::new(message, self.span())
    }
}

/// `selector { children }`
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Selector list
    pub selector: SelectorList,
    /// Nested nodes
    pub children: Vec<Node>,
    /// Source location
    pub span: FileSpan,
}

/// `prop: value`
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Property: an identifier, an interpolation, or a variable for `$x: ...`
    pub prop: Expression,
    /// Value expression
    pub value: Expression,
    /// Trailing `!important`
    pub important: bool,
    /// Source location
    pub span: FileSpan,
}

impl Declaration {
    /// Variable name when this declares a variable
    #[must_use]
    pub fn variable_name(&self) -> Option<&str> {
        match &self.prop {
            Expression::Variable { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Raw property text
    #[must_use]
    pub fn prop_text(&self) -> String {
        self.prop.to_string()
    }

    /// Raw value text
    #[must_use]
    pub fn value_text(&self) -> String {
        self.value.to_string()
    }

    /// Positioned error pointing at this declaration
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> NodeError {
        NodeError::new(message, self.span)
    }
}

/// `@name params { children }`
#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    /// Name without `@`
    pub name: String,
    /// Raw params text
    pub params: String,
    /// Parsed params
    pub kind: AtRuleKind,
    /// Block, `None` for statement at-rules
    pub children: Option<Vec<Node>>,
    /// Source location
    pub span: FileSpan,
}

impl AtRule {
    /// Positioned error pointing at this at-rule
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> NodeError {
        NodeError::new(message, self.span)
    }

    /// Request string when the at-rule references another module
    #[must_use]
    pub fn request(&self) -> Option<&str> {
        match &self.kind {
            AtRuleKind::Import(import) => Some(&import.request),
            AtRuleKind::Export(export) => export.request.as_deref(),
            AtRuleKind::Compose(compose) => compose.request.as_deref(),
            AtRuleKind::Use(use_rule) => Some(&use_rule.request),
            AtRuleKind::IcssImport(icss) => Some(&icss.request),
            _ => None,
        }
    }

    /// Block children, empty for statement at-rules
    #[must_use]
    pub fn body(&self) -> &[Node] {
        self.children.as_deref().unwrap_or(&[])
    }
}

/// Parsed params of an at-rule
#[derive(Debug, Clone, PartialEq)]
pub enum AtRuleKind {
    /// `@import $a, $b as $c from './x'`
    Import(ImportAtRule),
    /// `@export $a as $b [from './x']`
    Export(ExportAtRule),
    /// `@use './x' as ns`
    Use(UseAtRule),
    /// `@compose a, b [from './x']`
    Compose(ComposeAtRule),
    /// `@icss-import './x' { local: imported }`
    IcssImport(IcssImportAtRule),
    /// `@mixin name($params)`
    Mixin(CallableDeclaration),
    /// `@function name($params)`
    Function(CallableDeclaration),
    /// `@include name(args)`
    Include(IncludeAtRule),
    /// `@content`
    Content,
    /// `@return expr`
    Return(Expression),
    /// `@if expr`
    If(Expression),
    /// `@else if expr`
    ElseIf(Expression),
    /// `@else`
    Else,
    /// `@each $a, $b in list`
    Each(EachCondition),
    /// `@for $i from a through b`
    For(ForCondition),
    /// Plain CSS at-rule (`@media`, `@supports`, ...) kept as written
    Css,
}

impl AtRuleKind {
    /// At-rule name for parsed kinds, `None` for plain CSS at-rules
    #[must_use]
    pub fn name(&self) -> Option<&'static str> {
        Some(match self {
            Self::Import(_) => "import",
            Self::Export(_) => "export",
            Self::Use(_) => "use",
            Self::Compose(_) => "compose",
            Self::IcssImport(_) => "icss-import",
            Self::Mixin(_) => "mixin",
            Self::Function(_) => "function",
            Self::Include(_) => "include",
            Self::Content => "content",
            Self::Return(_) => "return",
            Self::If(_) => "if",
            Self::ElseIf(_) => "else if",
            Self::Else => "else",
            Self::Each(_) => "each",
            Self::For(_) => "for",
            Self::Css => return None,
        })
    }
}

/// One imported name
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpecifier {
    /// Name exported by the dependency
    pub imported: String,
    /// Local alias (`as`)
    pub local: Option<String>,
    /// Source location
    pub span: FileSpan,
}

impl ImportSpecifier {
    /// Name bound locally
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.local.as_deref().unwrap_or(&self.imported)
    }
}

/// What an `@import` binds
#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifiers {
    /// `@import $a, $b as $c from ...`
    Named(Vec<ImportSpecifier>),
    /// `@import * as ns from ...`
    Namespace(String),
}

/// `@import`
#[derive(Debug, Clone, PartialEq)]
pub struct ImportAtRule {
    /// Request string
    pub request: String,
    /// Imported names
    pub specifiers: ImportSpecifiers,
}

/// One exported name
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
    /// Local (or re-exported) name
    pub local: String,
    /// Alias (`as`)
    pub exported: Option<String>,
    /// Source location
    pub span: FileSpan,
}

impl ExportSpecifier {
    /// Name published in the export registry
    #[must_use]
    pub fn exported_name(&self) -> &str {
        self.exported.as_deref().unwrap_or(&self.local)
    }
}

/// What an `@export` publishes
#[derive(Debug, Clone, PartialEq)]
pub enum ExportSpecifiers {
    /// Listed names
    Named(Vec<ExportSpecifier>),
    /// `*`
    All,
}

/// `@export`
#[derive(Debug, Clone, PartialEq)]
pub struct ExportAtRule {
    /// `from` request for re-exports
    pub request: Option<String>,
    /// Exported names
    pub specifiers: ExportSpecifiers,
}

/// `@use`
#[derive(Debug, Clone, PartialEq)]
pub struct UseAtRule {
    /// Request string
    pub request: String,
    /// Namespace (`as ns`), defaults to the request's file stem
    pub namespace: Option<String>,
}

impl UseAtRule {
    /// Whether the request names a built-in module
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        is_builtin_module(&self.request)
    }

    /// Namespace members are bound under
    #[must_use]
    pub fn namespace(&self) -> String {
        if let Some(namespace) = &self.namespace {
            return namespace.clone();
        }
        let file = self.request.rsplit('/').next().unwrap_or(&self.request);
        let stem = file.split('.').next().unwrap_or(file);
        stem.trim_start_matches('_').to_string()
    }
}

/// `@compose`
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeAtRule {
    /// Composed classes
    pub classes: Vec<ClassSelector>,
    /// `from` request, `None` for local classes
    pub request: Option<String>,
}

/// One `local: imported` pair of an ICSS import
#[derive(Debug, Clone, PartialEq)]
pub struct IcssBinding {
    /// Name bound locally
    pub local: String,
    /// Name exported by the dependency
    pub imported: String,
    /// Source location
    pub span: FileSpan,
}

/// `@icss-import`
#[derive(Debug, Clone, PartialEq)]
pub struct IcssImportAtRule {
    /// Request string
    pub request: String,
    /// Bindings
    pub bindings: Vec<IcssBinding>,
}

/// Signature of `@mixin` and `@function`
#[derive(Debug, Clone, PartialEq)]
pub struct CallableDeclaration {
    /// Callable name
    pub name: String,
    /// Declared parameters
    pub parameters: ParameterList,
    /// Source location
    pub span: FileSpan,
}

/// A mixin or function together with its body
#[derive(Debug, Clone, PartialEq)]
pub struct CallableDefinition {
    /// Signature
    pub declaration: CallableDeclaration,
    /// Body nodes
    pub body: Vec<Node>,
}

/// `@include`
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeAtRule {
    /// Mixin name, possibly namespaced
    pub name: String,
    /// Supplied arguments
    pub args: ArgumentList,
}

/// `@each $a, $b in list`
#[derive(Debug, Clone, PartialEq)]
pub struct EachCondition {
    /// Bound variables
    pub variables: Vec<String>,
    /// Iterated list
    pub list: Expression,
}

/// `@for $i from a through|to b`
#[derive(Debug, Clone, PartialEq)]
pub struct ForCondition {
    /// Loop variable
    pub variable: String,
    /// Start bound
    pub from: Expression,
    /// End bound
    pub to: Expression,
    /// `through` (true) or `to` (false)
    pub inclusive: bool,
}

/// `.name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassSelector {
    /// Class name without the dot
    pub name: String,
    /// Source location
    pub span: FileSpan,
}

impl ClassSelector {
    /// Creates a class selector
    #[must_use]
    pub fn new(name: impl Into<String>, span: FileSpan) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

impl fmt::Display for ClassSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.name)
    }
}

/// Combinators between compound selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    NextSibling,
    /// `a ~ b`
    SubsequentSibling,
}

/// Component of a complex selector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectorComponent {
    /// `.name`
    Class(ClassSelector),
    /// `#name`
    Id(String),
    /// `div`
    Type(String),
    /// `*`
    Universal,
    /// `&`
    Parent,
    /// `[attr=value]` contents
    Attribute(String),
    /// `:hover`, `:not(...)` without the colon
    PseudoClass(String),
    /// `::before` without the colons
    PseudoElement(String),
    /// Combinator
    Combinator(Combinator),
}

impl fmt::Display for SelectorComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => write!(f, "{class}"),
            Self::Id(id) => write!(f, "#{id}"),
            Self::Type(name) => f.write_str(name),
            Self::Universal => f.write_str("*"),
            Self::Parent => f.write_str("&"),
            Self::Attribute(attr) => write!(f, "[{attr}]"),
            Self::PseudoClass(name) => write!(f, ":{name}"),
            Self::PseudoElement(name) => write!(f, "::{name}"),
            Self::Combinator(Combinator::Descendant) => f.write_str(" "),
            Self::Combinator(Combinator::Child) => f.write_str(" > "),
            Self::Combinator(Combinator::NextSibling) => f.write_str(" + "),
            Self::Combinator(Combinator::SubsequentSibling) => f.write_str(" ~ "),
        }
    }
}

/// Complex selector (`a > .b:hover`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    /// Components in source order
    pub components: Vec<SelectorComponent>,
}

impl Selector {
    /// Classes referenced anywhere in the selector
    pub fn classes(&self) -> impl Iterator<Item = &ClassSelector> {
        self.components.iter().filter_map(|component| match component {
            SelectorComponent::Class(class) => Some(class),
            _ => None,
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for component in &self.components {
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

/// Comma separated selectors
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorList {
    /// Selectors
    pub selectors: Vec<Selector>,
    /// Source location
    pub span: FileSpan,
}

impl SelectorList {
    /// The class when the list is exactly one bare class selector (`.name`)
    #[must_use]
    pub fn single_class(&self) -> Option<&ClassSelector> {
        match self.selectors.as_slice() {
            [selector] => match selector.components.as_slice() {
                [SelectorComponent::Class(class)] => Some(class),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, selector) in self.selectors.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{selector}")?;
        }
        Ok(())
    }
}
