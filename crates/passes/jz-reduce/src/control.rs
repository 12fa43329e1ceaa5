//! Grouping of `@if` / `@else if` / `@else` chains

use jz_ast::{AtRule, AtRuleKind, Node};
use jz_span::FileSpan;
use thiserror::Error;

/// `@else` or `@else if` not preceded by `@if`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("@{name} must follow an @if or @else if")]
pub struct DanglingElse {
    /// `else` or `else if`
    pub name: String,
    /// Location of the branch
    pub span: FileSpan,
}

/// One statement of a block
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step<'node> {
    /// Any node that is not part of a conditional chain
    Node(&'node Node),
    /// `@if` followed by its `@else if` / `@else` branches
    Conditional(&'node [Node]),
}

impl<'node> Step<'node> {
    /// Branches of a conditional chain, in order
    pub fn branches(self) -> impl Iterator<Item = &'node AtRule> {
        let nodes: &'node [Node] = match self {
            Self::Node(_) => &[],
            Self::Conditional(nodes) => nodes,
        };
        nodes.iter().filter_map(|node| match node {
            Node::AtRule(at_rule) => Some(at_rule),
            _ => None,
        })
    }
}

fn is_else(node: &Node) -> bool {
    matches!(
        node,
        Node::AtRule(AtRule {
            kind: AtRuleKind::ElseIf(_) | AtRuleKind::Else,
            ..
        })
    )
}

/// Splits `nodes` into statements, keeping each conditional chain together
///
/// A chain ends after `@else` or at the first node that is not an `@else if`.
///
/// # Errors
///
/// Returns [`DanglingElse`] for an `@else` branch with no `@if` before it.
pub fn statements(nodes: &[Node]) -> Result<Vec<Step<'_>>, DanglingElse> {
    let mut steps = Vec::with_capacity(nodes.len());
    let mut index = 0;

    while index < nodes.len() {
        let node = &nodes[index];
        match node {
            Node::AtRule(at_rule) if matches!(at_rule.kind, AtRuleKind::If(_)) => {
                let mut end = index + 1;
                while end < nodes.len() && is_else(&nodes[end]) {
                    let closes = matches!(
                        nodes[end],
                        Node::AtRule(AtRule {
                            kind: AtRuleKind::Else,
                            ..
                        })
                    );
                    end += 1;
                    if closes {
                        break;
                    }
                }
                steps.push(Step::Conditional(&nodes[index..end]));
                index = end;
            }
            Node::AtRule(at_rule) if is_else(node) => {
                return Err(DanglingElse {
                    name: at_rule.name.clone(),
                    span: at_rule.span,
                });
            }
            _ => {
                steps.push(Step::Node(node));
                index += 1;
            }
        }
    }

    Ok(steps)
}
