//! Stylesheet traversal

use crate::stylesheet::{AtRule, Declaration, Node, Rule, Stylesheet};
use jz_span::FileSpan;
use thiserror::Error;

/// Error positioned at a stylesheet node
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NodeError {
    /// Human readable message
    pub message: String,
    /// Location of the offending node
    pub span: FileSpan,
}

impl NodeError {
    /// Creates an error at `span`
    #[must_use]
    pub fn new(message: impl Into<String>, span: FileSpan) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Visitor over stylesheet nodes; default methods recurse into children
pub trait NodeVisitor {
    /// Visit every top-level node of a stylesheet
    fn visit_stylesheet(&mut self, stylesheet: &Stylesheet) {
        for node in &stylesheet.nodes {
            self.visit_node(node);
        }
    }

    /// Dispatch on the node kind
    fn visit_node(&mut self, node: &Node) {
        match node {
            Node::Rule(rule) => self.visit_rule(rule),
            Node::AtRule(at_rule) => self.visit_at_rule(at_rule),
            Node::Declaration(decl) => self.visit_declaration(decl),
        }
    }

    /// Visit a style rule
    fn visit_rule(&mut self, rule: &Rule) {
        for child in &rule.children {
            self.visit_node(child);
        }
    }

    /// Visit an at-rule
    fn visit_at_rule(&mut self, at_rule: &AtRule) {
        for child in at_rule.body() {
            self.visit_node(child);
        }
    }

    /// Visit a declaration
    fn visit_declaration(&mut self, _decl: &Declaration) {}
}

struct AtRuleWalker<F>(F);

impl<F: FnMut(&AtRule)> NodeVisitor for AtRuleWalker<F> {
    fn visit_at_rule(&mut self, at_rule: &AtRule) {
        (self.0)(at_rule);
        for child in at_rule.body() {
            self.visit_node(child);
        }
    }
}

struct DeclarationWalker<F>(F);

impl<F: FnMut(&Declaration)> NodeVisitor for DeclarationWalker<F> {
    fn visit_declaration(&mut self, decl: &Declaration) {
        (self.0)(decl);
    }
}

/// Calls `f` for every at-rule, nested ones included, in source order
pub fn walk_at_rules(stylesheet: &Stylesheet, f: impl FnMut(&AtRule)) {
    AtRuleWalker(f).visit_stylesheet(stylesheet);
}

/// Calls `f` for every declaration, nested ones included, in source order
pub fn walk_declarations(stylesheet: &Stylesheet, f: impl FnMut(&Declaration)) {
    DeclarationWalker(f).visit_stylesheet(stylesheet);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build;

    #[test]
    fn test_walk_nested_at_rules() {
        let sheet = Stylesheet::new(vec![
            build::css_at_rule("media", "screen", vec![build::class_rule(
                "a",
                vec![build::css_at_rule("supports", "(display: grid)", vec![])],
            )]),
            build::decl("color", build::ident("red")),
        ]);

        let mut names = Vec::new();
        walk_at_rules(&sheet, |at_rule| names.push(at_rule.name.clone()));
        assert_eq!(names, vec!["media", "supports"]);

        let mut props = Vec::new();
        walk_declarations(&sheet, |decl| props.push(decl.prop_text()));
        assert_eq!(props, vec!["color"]);
    }
}
