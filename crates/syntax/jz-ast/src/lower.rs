//! Lowering of the CSS walker's raw tree into a typed [`Stylesheet`]
//!
//! The walker hands over selectors, props, values and at-rule params as text.
//! Each fragment is parsed with the start rule matching its position.

use crate::expr::Expression;
use crate::parse::{Parse, ParsedNode, StartRule, SyntaxError};
use crate::stylesheet::{
    AtRule, AtRuleKind, Declaration, IcssBinding, IcssImportAtRule, Node, Rule, Stylesheet,
};
use jz_span::FileSpan;

/// Node as produced by the CSS walker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawNode {
    /// `selector { ... }`
    Rule {
        /// Selector text
        selector: String,
        /// Nested nodes
        children: Vec<RawNode>,
        /// Source location
        span: FileSpan,
    },
    /// `@name params [{ ... }]`
    AtRule {
        /// Name without `@`
        name: String,
        /// Params text
        params: String,
        /// Block, `None` for statements
        children: Option<Vec<RawNode>>,
        /// Source location
        span: FileSpan,
    },
    /// `prop: value`
    Declaration {
        /// Property text
        prop: String,
        /// Value text
        value: String,
        /// `!important`
        important: bool,
        /// Source location
        span: FileSpan,
    },
}

/// Parses every fragment of `nodes`
///
/// # Errors
///
/// Returns the first [`SyntaxError`], tagged with the span of the node it came from.
pub fn lower(nodes: &[RawNode], parser: &impl Parse) -> Result<Stylesheet, SyntaxError> {
    Ok(Stylesheet::new(lower_nodes(nodes, parser)?))
}

fn lower_nodes(nodes: &[RawNode], parser: &impl Parse) -> Result<Vec<Node>, SyntaxError> {
    nodes.iter().map(|node| lower_node(node, parser)).collect()
}

fn lower_node(node: &RawNode, parser: &impl Parse) -> Result<Node, SyntaxError> {
    match node {
        RawNode::Rule {
            selector,
            children,
            span,
        } => {
            let selector = match parse(parser, selector, StartRule::Selector, *span)? {
                ParsedNode::Selector(selector) => selector,
                other => return Err(mismatch(selector, StartRule::Selector, &other, *span)),
            };
            Ok(Node::Rule(Rule {
                selector,
                children: lower_nodes(children, parser)?,
                span: *span,
            }))
        }
        RawNode::Declaration {
            prop,
            value,
            important,
            span,
        } => Ok(Node::Declaration(Declaration {
            prop: parse_expression(parser, prop, StartRule::DeclarationProp, *span)?,
            value: parse_expression(parser, value, StartRule::DeclarationValue, *span)?,
            important: *important,
            span: *span,
        })),
        RawNode::AtRule {
            name,
            params,
            children,
            span,
        } => lower_at_rule(name, params, children.as_deref(), *span, parser).map(Node::AtRule),
    }
}

fn lower_at_rule(
    name: &str,
    params: &str,
    children: Option<&[RawNode]>,
    span: FileSpan,
    parser: &impl Parse,
) -> Result<AtRule, SyntaxError> {
    let text = params.trim();
    let mut lowered_name = name.to_string();

    let kind = match name {
        "import" => match parse(parser, text, StartRule::Imports, span)? {
            ParsedNode::Import(import) => AtRuleKind::Import(import),
            other => return Err(mismatch(text, StartRule::Imports, &other, span)),
        },
        "export" => match parse(parser, text, StartRule::Exports, span)? {
            ParsedNode::Export(export) => AtRuleKind::Export(export),
            other => return Err(mismatch(text, StartRule::Exports, &other, span)),
        },
        "compose" => match parse(parser, text, StartRule::AtComposes, span)? {
            ParsedNode::Compose(compose) => AtRuleKind::Compose(compose),
            other => return Err(mismatch(text, StartRule::AtComposes, &other, span)),
        },
        "use" => match parse(parser, text, StartRule::Values, span)? {
            ParsedNode::Use(use_rule) => AtRuleKind::Use(use_rule),
            other => return Err(mismatch(text, StartRule::Values, &other, span)),
        },
        "icss-import" => {
            let request = match parse_expression(parser, text, StartRule::Values, span)? {
                Expression::String { value, .. } => value,
                other => other.to_string(),
            };
            let bindings = children
                .unwrap_or_default()
                .iter()
                .filter_map(|child| match child {
                    RawNode::Declaration {
                        prop, value, span, ..
                    } => Some(IcssBinding {
                        local: prop.trim().to_string(),
                        imported: value.trim().to_string(),
                        span: *span,
                    }),
                    _ => None,
                })
                .collect();
            return Ok(AtRule {
                name: lowered_name,
                params: params.to_string(),
                kind: AtRuleKind::IcssImport(IcssImportAtRule { request, bindings }),
                children: None,
                span,
            });
        }
        "mixin" | "function" => {
            let declaration = match parse(parser, text, StartRule::CallableDeclaration, span)? {
                ParsedNode::Callable(declaration) => declaration,
                other => {
                    return Err(mismatch(text, StartRule::CallableDeclaration, &other, span));
                }
            };
            if name == "mixin" {
                AtRuleKind::Mixin(declaration)
            } else {
                AtRuleKind::Function(declaration)
            }
        }
        "include" => match parse(parser, text, StartRule::CallExpression, span)? {
            ParsedNode::Include(include) => AtRuleKind::Include(include),
            other => return Err(mismatch(text, StartRule::CallExpression, &other, span)),
        },
        "each" => match parse(parser, text, StartRule::EachCondition, span)? {
            ParsedNode::Each(each) => AtRuleKind::Each(each),
            other => return Err(mismatch(text, StartRule::EachCondition, &other, span)),
        },
        "for" => match parse(parser, text, StartRule::ForCondition, span)? {
            ParsedNode::For(range) => AtRuleKind::For(range),
            other => return Err(mismatch(text, StartRule::ForCondition, &other, span)),
        },
        "content" => AtRuleKind::Content,
        "return" => AtRuleKind::Return(parse_expression(
            parser,
            text,
            StartRule::ExpressionWithDivision,
            span,
        )?),
        "if" => AtRuleKind::If(parse_expression(
            parser,
            text,
            StartRule::ExpressionWithDivision,
            span,
        )?),
        "else" => match text.strip_prefix("if ") {
            Some(condition) => {
                lowered_name = "else if".to_string();
                AtRuleKind::ElseIf(parse_expression(
                    parser,
                    condition.trim(),
                    StartRule::ExpressionWithDivision,
                    span,
                )?)
            }
            None => AtRuleKind::Else,
        },
        _ => AtRuleKind::Css,
    };

    let children = match children {
        Some(children) => Some(lower_nodes(children, parser)?),
        None => None,
    };

    Ok(AtRule {
        name: lowered_name,
        params: params.to_string(),
        kind,
        children,
        span,
    })
}

fn parse(
    parser: &impl Parse,
    text: &str,
    start: StartRule,
    span: FileSpan,
) -> Result<ParsedNode, SyntaxError> {
    parser.parse(text, start).map_err(|error| error.in_node(span))
}

fn parse_expression(
    parser: &impl Parse,
    text: &str,
    start: StartRule,
    span: FileSpan,
) -> Result<Expression, SyntaxError> {
    match parse(parser, text, start, span)? {
        ParsedNode::Expression(expr) => Ok(expr),
        other => Err(mismatch(text, start, &other, span)),
    }
}

fn mismatch(text: &str, start: StartRule, found: &ParsedNode, span: FileSpan) -> SyntaxError {
    SyntaxError::at(
        format!(
            "rule {start} produced a {} for `{text}`",
            found.kind_name()
        ),
        text,
        0,
    )
    .in_node(span)
}
