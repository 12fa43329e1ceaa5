//! Constructors for AST nodes with default spans
//!
//! Used by embedders that synthesize stylesheets and by tests.

use crate::expr::{
    ArgumentList, BinaryOp, Expression, InterpolationPart, ListSeparator, Parameter,
    ParameterList, UnaryOp,
};
use crate::stylesheet::{
    AtRule, AtRuleKind, CallableDeclaration, ClassSelector, ComposeAtRule, Declaration,
    EachCondition, ExportAtRule, ExportSpecifier, ExportSpecifiers, ForCondition, IcssBinding,
    IcssImportAtRule, ImportAtRule, ImportSpecifier, ImportSpecifiers, IncludeAtRule, Node,
    Rule, Selector, SelectorComponent, SelectorList, UseAtRule,
};
use jz_span::FileSpan;

/// Numeric literal; an empty unit means unitless
#[must_use]
pub fn num(value: f64, unit: &str) -> Expression {
    Expression::Numeric {
        value,
        unit: (!unit.is_empty()).then(|| unit.to_string()),
        span: FileSpan::default(),
    }
}

/// Variable reference (`$name`, `ns.$name`)
#[must_use]
pub fn var(name: &str) -> Expression {
    Expression::Variable {
        name: name.to_string(),
        span: FileSpan::default(),
    }
}

/// Bareword identifier
#[must_use]
pub fn ident(name: &str) -> Expression {
    Expression::Ident {
        name: name.to_string(),
        span: FileSpan::default(),
    }
}

/// Color literal
#[must_use]
pub fn color(value: &str) -> Expression {
    Expression::Color {
        value: value.to_string(),
        span: FileSpan::default(),
    }
}

/// Quoted string
#[must_use]
pub fn string(value: &str) -> Expression {
    Expression::String {
        value: value.to_string(),
        quoted: true,
        span: FileSpan::default(),
    }
}

/// Boolean literal
#[must_use]
pub fn boolean(value: bool) -> Expression {
    Expression::Boolean {
        value,
        span: FileSpan::default(),
    }
}

/// `null`
#[must_use]
pub fn null() -> Expression {
    Expression::Null {
        span: FileSpan::default(),
    }
}

/// `url(...)`
#[must_use]
pub fn url(value: &str) -> Expression {
    Expression::Url {
        value: value.to_string(),
        span: FileSpan::default(),
    }
}

fn list(separator: ListSeparator, items: Vec<Expression>) -> Expression {
    Expression::List {
        separator,
        bracketed: false,
        items,
        span: FileSpan::default(),
    }
}

/// Space separated list
#[must_use]
pub fn list_space(items: Vec<Expression>) -> Expression {
    list(ListSeparator::Space, items)
}

/// Comma separated list
#[must_use]
pub fn list_comma(items: Vec<Expression>) -> Expression {
    list(ListSeparator::Comma, items)
}

/// Call with positional arguments
#[must_use]
pub fn call(callee: &str, args: Vec<Expression>) -> Expression {
    call_with(callee, ArgumentList::positional(args))
}

/// Call with a full argument list
#[must_use]
pub fn call_with(callee: &str, args: ArgumentList) -> Expression {
    Expression::Call {
        callee: callee.to_string(),
        args,
        span: FileSpan::default(),
    }
}

/// Argument list with positional and named arguments
#[must_use]
pub fn args(positional: Vec<Expression>, named: Vec<(&str, Expression)>) -> ArgumentList {
    ArgumentList {
        positional,
        named: named
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
        rest: None,
        span: FileSpan::default(),
    }
}

/// `calc(...)` and friends
#[must_use]
pub fn math(name: &str, args: Vec<Expression>) -> Expression {
    Expression::MathCall {
        name: name.to_string(),
        args,
        span: FileSpan::default(),
    }
}

/// Binary operation
#[must_use]
pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    Expression::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
        span: FileSpan::default(),
    }
}

/// Unary operation
#[must_use]
pub fn unary(op: UnaryOp, operand: Expression) -> Expression {
    Expression::Unary {
        op,
        operand: Box::new(operand),
        span: FileSpan::default(),
    }
}

/// Parenthesized group
#[must_use]
pub fn paren(inner: Expression) -> Expression {
    Expression::Parenthesized {
        inner: Box::new(inner),
        span: FileSpan::default(),
    }
}

/// Interpolated identifier
#[must_use]
pub fn interpolation(parts: Vec<InterpolationPart>) -> Expression {
    Expression::Interpolation {
        parts,
        span: FileSpan::default(),
    }
}

/// Parameter without default
#[must_use]
pub fn param(name: &str) -> Parameter {
    Parameter::required(name)
}

/// Parameter with a default
#[must_use]
pub fn param_default(name: &str, default: Expression) -> Parameter {
    Parameter::with_default(name, default)
}

/// Declaration; a prop starting with `$` declares a variable
#[must_use]
pub fn decl(prop: &str, value: Expression) -> Node {
    let prop = if prop.starts_with('$') {
        var(prop)
    } else {
        ident(prop)
    };
    Node::Declaration(Declaration {
        prop,
        value,
        important: false,
        span: FileSpan::default(),
    })
}

/// Selector list of a single class
#[must_use]
pub fn class_selector(name: &str) -> SelectorList {
    selector(vec![SelectorComponent::Class(ClassSelector::new(
        name,
        FileSpan::default(),
    ))])
}

/// Selector list of one complex selector
#[must_use]
pub fn selector(components: Vec<SelectorComponent>) -> SelectorList {
    SelectorList {
        selectors: vec![Selector { components }],
        span: FileSpan::default(),
    }
}

/// Style rule
#[must_use]
pub fn rule(selector: SelectorList, children: Vec<Node>) -> Node {
    Node::Rule(Rule {
        selector,
        children,
        span: FileSpan::default(),
    })
}

/// `.name { children }`
#[must_use]
pub fn class_rule(name: &str, children: Vec<Node>) -> Node {
    rule(class_selector(name), children)
}

fn at(name: &str, params: String, kind: AtRuleKind, children: Option<Vec<Node>>) -> Node {
    Node::AtRule(AtRule {
        name: name.to_string(),
        params,
        kind,
        children,
        span: FileSpan::default(),
    })
}

/// Plain CSS at-rule kept as written
#[must_use]
pub fn css_at_rule(name: &str, params: &str, children: Vec<Node>) -> Node {
    at(name, params.to_string(), AtRuleKind::Css, Some(children))
}

fn import_specifiers(names: &[(&str, Option<&str>)]) -> Vec<ImportSpecifier> {
    names
        .iter()
        .map(|(imported, local)| ImportSpecifier {
            imported: (*imported).to_string(),
            local: local.map(str::to_string),
            span: FileSpan::default(),
        })
        .collect()
}

fn render_pairs(names: &[(&str, Option<&str>)]) -> String {
    names
        .iter()
        .map(|(name, alias)| match alias {
            Some(alias) => format!("{name} as {alias}"),
            None => (*name).to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `@import a, b as c from "request"`
#[must_use]
pub fn import(names: &[(&str, Option<&str>)], request: &str) -> Node {
    at(
        "import",
        format!("{} from \"{request}\"", render_pairs(names)),
        AtRuleKind::Import(ImportAtRule {
            request: request.to_string(),
            specifiers: ImportSpecifiers::Named(import_specifiers(names)),
        }),
        None,
    )
}

/// `@import * as ns from "request"`
#[must_use]
pub fn import_namespace(namespace: &str, request: &str) -> Node {
    at(
        "import",
        format!("* as {namespace} from \"{request}\""),
        AtRuleKind::Import(ImportAtRule {
            request: request.to_string(),
            specifiers: ImportSpecifiers::Namespace(namespace.to_string()),
        }),
        None,
    )
}

/// `@export a, b as c [from "request"]`
#[must_use]
pub fn export(names: &[(&str, Option<&str>)], request: Option<&str>) -> Node {
    let specifiers = names
        .iter()
        .map(|(local, exported)| ExportSpecifier {
            local: (*local).to_string(),
            exported: exported.map(str::to_string),
            span: FileSpan::default(),
        })
        .collect();
    let params = match request {
        Some(request) => format!("{} from \"{request}\"", render_pairs(names)),
        None => render_pairs(names),
    };
    at(
        "export",
        params,
        AtRuleKind::Export(ExportAtRule {
            request: request.map(str::to_string),
            specifiers: ExportSpecifiers::Named(specifiers),
        }),
        None,
    )
}

/// `@export * from "request"`
#[must_use]
pub fn export_all(request: &str) -> Node {
    at(
        "export",
        format!("* from \"{request}\""),
        AtRuleKind::Export(ExportAtRule {
            request: Some(request.to_string()),
            specifiers: ExportSpecifiers::All,
        }),
        None,
    )
}

/// `@use "request" [as ns]`
#[must_use]
pub fn use_module(request: &str, namespace: Option<&str>) -> Node {
    let params = match namespace {
        Some(namespace) => format!("\"{request}\" as {namespace}"),
        None => format!("\"{request}\""),
    };
    at(
        "use",
        params,
        AtRuleKind::Use(UseAtRule {
            request: request.to_string(),
            namespace: namespace.map(str::to_string),
        }),
        None,
    )
}

/// `@compose a, b [from "request"]`
#[must_use]
pub fn compose(classes: &[&str], request: Option<&str>) -> Node {
    let listed = classes.join(", ");
    let params = match request {
        Some(request) => format!("{listed} from \"{request}\""),
        None => listed,
    };
    at(
        "compose",
        params,
        AtRuleKind::Compose(ComposeAtRule {
            classes: classes
                .iter()
                .map(|name| ClassSelector::new(*name, FileSpan::default()))
                .collect(),
            request: request.map(str::to_string),
        }),
        None,
    )
}

/// `@icss-import "request" { local: imported }`
#[must_use]
pub fn icss_import(request: &str, bindings: &[(&str, &str)]) -> Node {
    at(
        "icss-import",
        format!("\"{request}\""),
        AtRuleKind::IcssImport(IcssImportAtRule {
            request: request.to_string(),
            bindings: bindings
                .iter()
                .map(|(local, imported)| IcssBinding {
                    local: (*local).to_string(),
                    imported: (*imported).to_string(),
                    span: FileSpan::default(),
                })
                .collect(),
        }),
        None,
    )
}

fn callable(name: &str, parameters: ParameterList) -> CallableDeclaration {
    CallableDeclaration {
        name: name.to_string(),
        parameters,
        span: FileSpan::default(),
    }
}

/// `@mixin name(params) { body }`
#[must_use]
pub fn mixin(name: &str, parameters: ParameterList, body: Vec<Node>) -> Node {
    at(
        "mixin",
        format!("{name}({parameters})"),
        AtRuleKind::Mixin(callable(name, parameters)),
        Some(body),
    )
}

/// `@function name(params) { body }`
#[must_use]
pub fn function(name: &str, parameters: ParameterList, body: Vec<Node>) -> Node {
    at(
        "function",
        format!("{name}({parameters})"),
        AtRuleKind::Function(callable(name, parameters)),
        Some(body),
    )
}

/// `@include name(args) [{ content }]`
#[must_use]
pub fn include(name: &str, args: ArgumentList, content: Option<Vec<Node>>) -> Node {
    at(
        "include",
        format!("{name}({args})"),
        AtRuleKind::Include(IncludeAtRule {
            name: name.to_string(),
            args,
        }),
        content,
    )
}

/// `@content`
#[must_use]
pub fn content() -> Node {
    at("content", String::new(), AtRuleKind::Content, None)
}

/// `@return expr`
#[must_use]
pub fn return_value(value: Expression) -> Node {
    at(
        "return",
        value.to_string(),
        AtRuleKind::Return(value),
        None,
    )
}

/// `@if condition { body }`
#[must_use]
pub fn if_block(condition: Expression, body: Vec<Node>) -> Node {
    at(
        "if",
        condition.to_string(),
        AtRuleKind::If(condition),
        Some(body),
    )
}

/// `@else if condition { body }`
#[must_use]
pub fn else_if_block(condition: Expression, body: Vec<Node>) -> Node {
    at(
        "else if",
        condition.to_string(),
        AtRuleKind::ElseIf(condition),
        Some(body),
    )
}

/// `@else { body }`
#[must_use]
pub fn else_block(body: Vec<Node>) -> Node {
    at("else", String::new(), AtRuleKind::Else, Some(body))
}

/// `@each $a[, $b] in list { body }`
#[must_use]
pub fn each(variables: &[&str], list: Expression, body: Vec<Node>) -> Node {
    at(
        "each",
        format!("{} in {list}", variables.join(", ")),
        AtRuleKind::Each(EachCondition {
            variables: variables.iter().map(|name| (*name).to_string()).collect(),
            list,
        }),
        Some(body),
    )
}

/// `@for $i from a through|to b { body }`
#[must_use]
pub fn for_range(
    variable: &str,
    from: Expression,
    to: Expression,
    inclusive: bool,
    body: Vec<Node>,
) -> Node {
    let keyword = if inclusive { "through" } else { "to" };
    at(
        "for",
        format!("{variable} from {from} {keyword} {to}"),
        AtRuleKind::For(ForCondition {
            variable: variable.to_string(),
            from,
            to,
            inclusive,
        }),
        Some(body),
    )
}
