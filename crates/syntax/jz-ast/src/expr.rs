//! Expression nodes

use crate::value::{Value, format_number};
use derive_more::Display;
use jz_span::FileSpan;
use std::fmt;

/// Separator between the items of a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ListSeparator {
    /// `a, b`
    #[display(",")]
    Comma,
    /// `a b`
    #[display(" ")]
    Space,
    /// `a/b`
    #[display("/")]
    Slash,
}

impl ListSeparator {
    /// Text placed between two rendered items
    #[must_use]
    pub fn joiner(self) -> &'static str {
        match self {
            Self::Comma => ", ",
            Self::Space => " ",
            Self::Slash => "/",
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BinaryOp {
    /// `+`
    #[display("+")]
    Add,
    /// `-`
    #[display("-")]
    Sub,
    /// `*`
    #[display("*")]
    Mul,
    /// `/`
    #[display("/")]
    Div,
    /// `%`
    #[display("%")]
    Mod,
    /// `==`
    #[display("==")]
    Eq,
    /// `!=`
    #[display("!=")]
    Ne,
    /// `<`
    #[display("<")]
    Lt,
    /// `<=`
    #[display("<=")]
    Le,
    /// `>`
    #[display(">")]
    Gt,
    /// `>=`
    #[display(">=")]
    Ge,
    /// `and`
    #[display("and")]
    And,
    /// `or`
    #[display("or")]
    Or,
}

impl BinaryOp {
    /// Whether the operator is arithmetic (as opposed to comparison or logical)
    #[must_use]
    pub fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UnaryOp {
    /// `-x`
    #[display("-")]
    Neg,
    /// `+x`
    #[display("+")]
    Plus,
    /// `not x`
    #[display("not ")]
    Not,
}

/// A piece of an interpolated identifier such as `border-#{$side}`
#[derive(Debug, Clone, PartialEq)]
pub enum InterpolationPart {
    /// Literal text
    Text(String),
    /// `#{...}`
    Expression(Expression),
}

/// An expression of the value language
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `10px`, `1.5`, `50%`
    Numeric {
        /// Magnitude
        value: f64,
        /// Unit, `None` for unitless numbers
        unit: Option<String>,
        /// Source location
        span: FileSpan,
    },
    /// `red`, `#fff`
    Color {
        /// Color text as written
        value: String,
        /// Source location
        span: FileSpan,
    },
    /// `"text"` or an unquoted string produced by a function
    String {
        /// String contents without quotes
        value: String,
        /// Whether the string is rendered with quotes
        quoted: bool,
        /// Source location
        span: FileSpan,
    },
    /// `url(./img.png)`
    Url {
        /// Url contents
        value: String,
        /// Source location
        span: FileSpan,
    },
    /// Bareword identifier (`solid`, `auto`)
    Ident {
        /// Identifier text
        name: String,
        /// Source location
        span: FileSpan,
    },
    /// `true` / `false`
    Boolean {
        /// Literal value
        value: bool,
        /// Source location
        span: FileSpan,
    },
    /// `null`
    Null {
        /// Source location
        span: FileSpan,
    },
    /// `$name` or `ns.$name`
    Variable {
        /// Variable name including the `$` sigil
        name: String,
        /// Source location
        span: FileSpan,
    },
    /// Comma, space or slash separated list
    List {
        /// Separator between items
        separator: ListSeparator,
        /// Whether the list is written with square brackets
        bracketed: bool,
        /// List items
        items: Vec<Expression>,
        /// Source location
        span: FileSpan,
    },
    /// `name(args)` or `ns.name(args)`
    Call {
        /// Callee name, possibly namespaced
        callee: String,
        /// Supplied arguments
        args: ArgumentList,
        /// Source location
        span: FileSpan,
    },
    /// `calc(...)`, `min(...)`, `max(...)`, `clamp(...)`
    MathCall {
        /// Function name
        name: String,
        /// Arguments
        args: Vec<Expression>,
        /// Source location
        span: FileSpan,
    },
    /// `left op right`
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
        /// Source location
        span: FileSpan,
    },
    /// `op operand`
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expression>,
        /// Source location
        span: FileSpan,
    },
    /// `(inner)`
    Parenthesized {
        /// Grouped expression
        inner: Box<Expression>,
        /// Source location
        span: FileSpan,
    },
    /// Identifier with `#{...}` pieces
    Interpolation {
        /// Text and expression pieces in order
        parts: Vec<InterpolationPart>,
        /// Source location
        span: FileSpan,
    },
    /// Already reduced value that has no dedicated expression form
    Literal {
        /// The value
        value: Value,
        /// Source location
        span: FileSpan,
    },
}

impl Expression {
    /// Source location of the expression
    #[must_use]
    pub fn span(&self) -> FileSpan {
        match self {
            Self::Numeric { span, .. }
            | Self::Color { span, .. }
            | Self::String { span, .. }
            | Self::Url { span, .. }
            | Self::Ident { span, .. }
            | Self::Boolean { span, .. }
            | Self::Null { span }
            | Self::Variable { span, .. }
            | Self::List { span, .. }
            | Self::Call { span, .. }
            | Self::MathCall { span, .. }
            | Self::Binary { span, .. }
            | Self::Unary { span, .. }
            | Self::Parenthesized { span, .. }
            | Self::Interpolation { span, .. }
            | Self::Literal { span, .. } => *span,
        }
    }

    /// Whether the expression contains no symbolic reference or pending operation
    #[must_use]
    pub fn is_literal(&self) -> bool {
        match self {
            Self::Numeric { .. }
            | Self::Color { .. }
            | Self::String { .. }
            | Self::Url { .. }
            | Self::Ident { .. }
            | Self::Boolean { .. }
            | Self::Null { .. }
            | Self::Literal { .. } => true,
            Self::List { items, .. } => items.iter().all(Self::is_literal),
            Self::Variable { .. }
            | Self::Call { .. }
            | Self::MathCall { .. }
            | Self::Binary { .. }
            | Self::Unary { .. }
            | Self::Parenthesized { .. }
            | Self::Interpolation { .. } => false,
        }
    }

    /// Lifts a reduced value back into an expression located at `span`
    #[must_use]
    pub fn from_value(value: Value, span: FileSpan) -> Self {
        match value {
            Value::Numeric(numeric) => Self::Numeric {
                value: numeric.value,
                unit: numeric.unit,
                span,
            },
            Value::Color(value) => Self::Color { value, span },
            Value::String { value, quoted } => Self::String {
                value,
                quoted,
                span,
            },
            Value::Url(value) => Self::Url { value, span },
            Value::Bareword(name) => Self::Ident { name, span },
            Value::Boolean(value) => Self::Boolean { value, span },
            Value::Null => Self::Null { span },
            Value::List(list) => Self::List {
                separator: list.separator,
                bracketed: list.bracketed,
                items: list
                    .items
                    .into_iter()
                    .map(|item| Self::from_value(item, span))
                    .collect(),
                span,
            },
            value @ (Value::ArgumentList(_) | Value::Function { .. }) => {
                Self::Literal { value, span }
            }
        }
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Self::from_value(value, FileSpan::default())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric { value, unit, .. } => {
                write!(f, "{}{}", format_number(*value), unit.as_deref().unwrap_or(""))
            }
            Self::Url { value, .. } => write!(f, "url({value})"),
            Self::Color { value, .. } => f.write_str(value),
            Self::String { value, quoted, .. } => {
                if *quoted {
                    write!(f, "\"{}\"", value.replace('"', "\\\""))
                } else {
                    f.write_str(value)
                }
            }
            Self::Ident { name, .. } | Self::Variable { name, .. } => f.write_str(name),
            Self::Boolean { value, .. } => write!(f, "{value}"),
            Self::Null { .. } => f.write_str("null"),
            Self::List {
                separator,
                bracketed,
                items,
                ..
            } => {
                if *bracketed {
                    f.write_str("[")?;
                }
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(separator.joiner())?;
                    }
                    write!(f, "{item}")?;
                }
                if *bracketed {
                    f.write_str("]")?;
                }
                Ok(())
            }
            Self::Call { callee, args, .. } => write!(f, "{callee}({args})"),
            Self::MathCall { name, args, .. } => {
                write!(f, "{name}(")?;
                for (index, arg) in args.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Self::Binary {
                op, left, right, ..
            } => write!(f, "{left} {op} {right}"),
            Self::Unary { op, operand, .. } => write!(f, "{op}{operand}"),
            Self::Parenthesized { inner, .. } => write!(f, "({inner})"),
            Self::Interpolation { parts, .. } => {
                for part in parts {
                    match part {
                        InterpolationPart::Text(text) => f.write_str(text)?,
                        InterpolationPart::Expression(expr) => write!(f, "#{{{expr}}}")?,
                    }
                }
                Ok(())
            }
            Self::Literal { value, .. } => write!(f, "{value}"),
        }
    }
}

/// Arguments supplied at a call site
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentList {
    /// Positional arguments in order
    pub positional: Vec<Expression>,
    /// Named arguments (`$name: value`) in order
    pub named: Vec<(String, Expression)>,
    /// Trailing `$list...` spread
    pub rest: Option<Box<Expression>>,
    /// Source location
    pub span: FileSpan,
}

impl ArgumentList {
    /// Argument list made of positional arguments only
    #[must_use]
    pub fn positional(positional: Vec<Expression>) -> Self {
        Self {
            positional,
            ..Self::default()
        }
    }

    /// Whether no argument is supplied
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty() && self.rest.is_none()
    }
}

impl fmt::Display for ArgumentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut separate = |f: &mut fmt::Formatter<'_>| {
            if first {
                first = false;
                Ok(())
            } else {
                f.write_str(", ")
            }
        };

        for arg in &self.positional {
            separate(f)?;
            write!(f, "{arg}")?;
        }
        for (name, arg) in &self.named {
            separate(f)?;
            write!(f, "{name}: {arg}")?;
        }
        if let Some(rest) = &self.rest {
            separate(f)?;
            write!(f, "{rest}...")?;
        }
        Ok(())
    }
}

/// Default of a declared parameter
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Default expression, reduced in the invocation frame
    Expression(Expression),
    /// A default exists but is opaque at this level (native callables)
    Unknown,
}

/// A declared parameter (`$name` or `$name: default`)
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name including the `$` sigil
    pub name: String,
    /// Optional default
    pub default: Option<DefaultValue>,
    /// Source location
    pub span: FileSpan,
}

impl Parameter {
    /// Parameter without default
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            span: FileSpan::default(),
        }
    }

    /// Parameter with a default expression
    #[must_use]
    pub fn with_default(name: impl Into<String>, default: Expression) -> Self {
        Self {
            name: name.into(),
            default: Some(DefaultValue::Expression(default)),
            span: FileSpan::default(),
        }
    }

    /// Parameter whose default is supplied by a native implementation
    #[must_use]
    pub fn with_unknown_default(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: Some(DefaultValue::Unknown),
            span: FileSpan::default(),
        }
    }

    /// Name without the `$` sigil
    #[must_use]
    pub fn bare_name(&self) -> &str {
        bare_name(&self.name)
    }
}

/// Trailing rest parameter (`$args...`)
#[derive(Debug, Clone, PartialEq)]
pub struct RestParameter {
    /// Parameter name including the `$` sigil
    pub name: String,
    /// Source location
    pub span: FileSpan,
}

/// Ordered parameters plus at most one trailing rest parameter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterList {
    /// Ordered parameters
    pub parameters: Vec<Parameter>,
    /// Rest parameter
    pub rest: Option<RestParameter>,
}

impl ParameterList {
    /// Creates a parameter list
    #[must_use]
    pub fn new(parameters: Vec<Parameter>, rest: Option<&str>) -> Self {
        Self {
            parameters,
            rest: rest.map(|name| RestParameter {
                name: name.to_string(),
                span: FileSpan::default(),
            }),
        }
    }

    /// Index of the parameter called `name` (with or without `$`)
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        let name = bare_name(name);
        self.parameters
            .iter()
            .position(|param| param.bare_name() == name)
    }
}

impl fmt::Display for ParameterList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, param) in self.parameters.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&param.name)?;
            match &param.default {
                Some(DefaultValue::Expression(default)) => write!(f, ": {default}")?,
                Some(DefaultValue::Unknown) => f.write_str(": ?")?,
                None => {}
            }
        }
        if let Some(rest) = &self.rest {
            if !self.parameters.is_empty() {
                f.write_str(", ")?;
            }
            write!(f, "{}...", rest.name)?;
        }
        Ok(())
    }
}

/// Strips the `$` sigil from a variable or parameter name
#[must_use]
pub fn bare_name(name: &str) -> &str {
    name.strip_prefix('$').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build;

    #[test]
    fn test_display_binary() {
        let expr = build::binary(BinaryOp::Add, build::num(1.0, "px"), build::var("$gap"));
        assert_eq!(expr.to_string(), "1px + $gap");
    }

    #[test]
    fn test_parameter_list_display() {
        let params = ParameterList::new(
            vec![
                Parameter::required("$a"),
                Parameter::with_default("$b", build::num(2.0, "")),
                Parameter::with_unknown_default("$c"),
            ],
            Some("$rest"),
        );
        assert_eq!(params.to_string(), "$a, $b: 2, $c: ?, $rest...");
        assert_eq!(params.position("b"), Some(1));
        assert_eq!(params.position("$c"), Some(2));
    }

    #[test]
    fn test_is_literal() {
        assert!(build::list_space(vec![build::num(1.0, "px"), build::ident("solid")]).is_literal());
        assert!(!build::list_space(vec![build::var("$w"), build::ident("solid")]).is_literal());
    }
}
