//! Reduced literal values
//!
//! A [`Value`] is what the reducer produces: no variable references, no pending
//! calls, no operators. Variables store values, so substituting one is a clone.

use crate::expr::ListSeparator;
use std::fmt;

/// Number with an optional unit
#[derive(Debug, Clone, PartialEq)]
pub struct Numeric {
    /// Magnitude
    pub value: f64,
    /// Unit, `None` for unitless numbers
    pub unit: Option<String>,
}

impl Numeric {
    /// Creates a numeric; an empty unit means unitless
    #[must_use]
    pub fn new(value: f64, unit: &str) -> Self {
        Self {
            value,
            unit: (!unit.is_empty()).then(|| unit.to_string()),
        }
    }

    /// Unitless number
    #[must_use]
    pub fn unitless(value: f64) -> Self {
        Self { value, unit: None }
    }

    /// Unit text, empty when unitless
    #[must_use]
    pub fn unit_str(&self) -> &str {
        self.unit.as_deref().unwrap_or("")
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", format_number(self.value), self.unit_str())
    }
}

/// List value
#[derive(Debug, Clone, PartialEq)]
pub struct ListValue {
    /// Separator between items
    pub separator: ListSeparator,
    /// Whether the list renders with square brackets
    pub bracketed: bool,
    /// Items in order
    pub items: Vec<Value>,
}

impl ListValue {
    /// Unbracketed list
    #[must_use]
    pub fn new(separator: ListSeparator, items: Vec<Value>) -> Self {
        Self {
            separator,
            bracketed: false,
            items,
        }
    }
}

/// Rest arguments captured by a `$args...` parameter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentListValue {
    /// Positional arguments
    pub positional: Vec<Value>,
    /// Named arguments not matched by a declared parameter
    pub keywords: Vec<(String, Value)>,
}

impl ArgumentListValue {
    /// Argument list of positional values only
    #[must_use]
    pub fn new(positional: Vec<Value>) -> Self {
        Self {
            positional,
            keywords: Vec::new(),
        }
    }
}

/// A fully reduced value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Number with unit
    Numeric(Numeric),
    /// Color as written (`red`, `#fff`)
    Color(String),
    /// String, quoted or not
    String {
        /// Contents without quotes
        value: String,
        /// Whether the string renders with quotes
        quoted: bool,
    },
    /// Bareword identifier
    Bareword(String),
    /// `url(...)`
    Url(String),
    /// `true` / `false`
    Boolean(bool),
    /// `null`
    Null,
    /// List of values
    List(ListValue),
    /// Rest arguments
    ArgumentList(ArgumentListValue),
    /// Plain CSS function kept for the renderer (`translate(10px)`)
    Function {
        /// Function name
        name: String,
        /// Reduced arguments
        args: Vec<Value>,
    },
}

impl Value {
    /// Numeric value with an optional unit (empty string for unitless)
    #[must_use]
    pub fn number(value: f64, unit: &str) -> Self {
        Self::Numeric(Numeric::new(value, unit))
    }

    /// Quoted string
    #[must_use]
    pub fn quoted(value: impl Into<String>) -> Self {
        Self::String {
            value: value.into(),
            quoted: true,
        }
    }

    /// Unquoted string
    #[must_use]
    pub fn unquoted(value: impl Into<String>) -> Self {
        Self::String {
            value: value.into(),
            quoted: false,
        }
    }

    /// Name used by `type-of`
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "number",
            Self::Color(_) => "color",
            Self::String { .. } | Self::Bareword(_) | Self::Url(_) | Self::Function { .. } => {
                "string"
            }
            Self::Boolean(_) => "bool",
            Self::Null => "null",
            Self::List(_) => "list",
            Self::ArgumentList(_) => "arglist",
        }
    }

    /// `false` and `null` are falsy, everything else is truthy
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Boolean(false) | Self::Null)
    }

    /// Numeric payload
    #[must_use]
    pub fn as_numeric(&self) -> Option<&Numeric> {
        match self {
            Self::Numeric(numeric) => Some(numeric),
            _ => None,
        }
    }

    /// Text of strings and barewords
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String { value, .. } | Self::Bareword(value) => Some(value),
            _ => None,
        }
    }

    /// Items when the value is viewed as a list; single values are one-item lists
    #[must_use]
    pub fn to_items(&self) -> Vec<Self> {
        match self {
            Self::List(list) => list.items.clone(),
            Self::ArgumentList(args) => args.positional.clone(),
            other => vec![other.clone()],
        }
    }

    /// Separator when the value is viewed as a list
    #[must_use]
    pub fn separator(&self) -> ListSeparator {
        match self {
            Self::List(list) => list.separator,
            Self::ArgumentList(_) => ListSeparator::Comma,
            _ => ListSeparator::Space,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(numeric) => write!(f, "{numeric}"),
            Self::Color(value) | Self::Bareword(value) => f.write_str(value),
            Self::String { value, quoted } => {
                if *quoted {
                    write!(f, "\"{}\"", value.replace('"', "\\\""))
                } else {
                    f.write_str(value)
                }
            }
            Self::Url(value) => write!(f, "url({value})"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Null => Ok(()),
            Self::List(list) => {
                if list.bracketed {
                    f.write_str("[")?;
                }
                write_joined(f, list.items.iter(), list.separator.joiner())?;
                if list.bracketed {
                    f.write_str("]")?;
                }
                Ok(())
            }
            Self::ArgumentList(args) => {
                write_joined(f, args.positional.iter(), ", ")?;
                for (index, (name, value)) in args.keywords.iter().enumerate() {
                    if index > 0 || !args.positional.is_empty() {
                        f.write_str(", ")?;
                    }
                    write!(f, "${name}: {value}")?;
                }
                Ok(())
            }
            Self::Function { name, args } => {
                write!(f, "{name}(")?;
                write_joined(f, args.iter(), ", ")?;
                f.write_str(")")
            }
        }
    }
}

/// Renders items separated by `joiner`, skipping nulls
fn write_joined<'item>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'item Value>,
    joiner: &str,
) -> fmt::Result {
    let mut first = true;
    for item in items.filter(|item| !matches!(item, Value::Null)) {
        if !first {
            f.write_str(joiner)?;
        }
        first = false;
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Formats a number the way CSS expects: integers without a fraction, at most ten
/// decimals otherwise
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }

    let rendered = format!("{value:.10}");
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
