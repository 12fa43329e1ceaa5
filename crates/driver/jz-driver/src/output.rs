//! Evaluated stylesheet handed to rendering

use std::fmt;

/// Node whose selectors, params and values are all literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputNode {
    /// Style rule with generated class names
    Rule {
        /// Selector text
        selector: String,
        /// Declarations and nested nodes
        children: Vec<OutputNode>,
    },
    /// CSS at-rule kept as written
    AtRule {
        /// Name without `@`
        name: String,
        /// Params text
        params: String,
        /// Block, `None` for statements
        children: Option<Vec<OutputNode>>,
    },
    /// `prop: value`
    Declaration {
        /// Reduced property
        prop: String,
        /// Reduced value
        value: String,
        /// Trailing `!important`
        important: bool,
    },
}

/// Result of compiling one module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluatedStylesheet {
    /// Top-level nodes
    pub nodes: Vec<OutputNode>,
}

impl EvaluatedStylesheet {
    /// Whether nothing is left to render
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Display for EvaluatedStylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write_node(f, node, 0)?;
        }
        Ok(())
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, children: &[OutputNode], depth: usize) -> fmt::Result {
    writeln!(f, " {{")?;
    for child in children {
        write_node(f, child, depth + 1)?;
    }
    writeln!(f, "{:indent$}}}", "", indent = depth * 2)
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &OutputNode, depth: usize) -> fmt::Result {
    write!(f, "{:indent$}", "", indent = depth * 2)?;
    match node {
        OutputNode::Rule { selector, children } => {
            f.write_str(selector)?;
            write_block(f, children, depth)
        }
        OutputNode::AtRule {
            name,
            params,
            children,
        } => {
            write!(f, "@{name}")?;
            if !params.is_empty() {
                write!(f, " {params}")?;
            }
            match children {
                Some(children) => write_block(f, children, depth),
                None => writeln!(f, ";"),
            }
        }
        OutputNode::Declaration {
            prop,
            value,
            important,
        } => {
            write!(f, "{prop}: {value}")?;
            if *important {
                f.write_str(" !important")?;
            }
            writeln!(f, ";")
        }
    }
}
