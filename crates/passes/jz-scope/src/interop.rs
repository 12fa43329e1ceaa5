//! Callables and argument binding
//!
//! Both user-defined (`@function`) and native callables declare a
//! [`ParameterList`]. Supplied arguments are matched against it by
//! [`Callable::bind`]: positional by index, named by identifier with the `$`
//! sigil optional. Parameters nobody supplied stay `None`; deciding whether that
//! is an error is left to the caller since defaults may be opaque here.

use crate::scope::ScopeId;
use jz_ast::{ArgumentListValue, CallableDefinition, Numeric, Parameter, ParameterList, Value};
use std::rc::Rc;
use thiserror::Error;

static NULL: Value = Value::Null;

/// Native implementation of a function
pub type NativeFn = fn(&BoundArguments) -> Result<Value, CallError>;

/// Failure reported by a native function
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// Argument of the wrong kind
    #[error("{parameter}: {found} is not a {expected}")]
    InvalidArgument {
        /// Parameter name
        parameter: String,
        /// Expected kind
        expected: &'static str,
        /// Rendered argument
        found: String,
    },
    /// Any other failure
    #[error("{0}")]
    Failed(String),
}

/// Failure to match arguments against parameters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// More positional arguments than parameters and no rest parameter
    #[error("Only {expected} arguments allowed, but {given} were passed")]
    TooManyArguments {
        /// Declared parameters
        expected: usize,
        /// Supplied positional arguments
        given: usize,
    },
    /// Named argument matching no parameter
    #[error("No argument named {name}")]
    UnknownArgument {
        /// Supplied name
        name: String,
    },
    /// Parameter supplied both positionally and by name
    #[error("Argument {name} was passed both by position and by name")]
    DuplicateArgument {
        /// Parameter name
        name: String,
    },
    /// Same name supplied twice
    #[error("Argument {name} was passed by name more than once")]
    RepeatedArgument {
        /// Argument name
        name: String,
    },
}

/// Arguments matched to parameter slots
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArguments {
    /// One slot per declared parameter, `None` when not supplied
    pub values: Vec<Option<Value>>,
    /// Collected rest arguments when a rest parameter is declared
    pub rest: Option<ArgumentListValue>,
}

impl BoundArguments {
    /// Value bound at `index`, `null` when unbound
    #[must_use]
    pub fn value(&self, index: usize) -> &Value {
        self.values
            .get(index)
            .and_then(Option::as_ref)
            .unwrap_or(&NULL)
    }

    /// Whether the slot at `index` received a value
    #[must_use]
    pub fn is_supplied(&self, index: usize) -> bool {
        matches!(self.values.get(index), Some(Some(_)))
    }

    /// Numeric bound at `index`
    ///
    /// # Errors
    ///
    /// Returns [`CallError::InvalidArgument`] when the value is not a number.
    pub fn number(&self, index: usize, parameter: &str) -> Result<&Numeric, CallError> {
        let value = self.value(index);
        value.as_numeric().ok_or_else(|| CallError::InvalidArgument {
            parameter: parameter.to_string(),
            expected: "number",
            found: value.to_string(),
        })
    }

    /// String or bareword text bound at `index`
    ///
    /// # Errors
    ///
    /// Returns [`CallError::InvalidArgument`] when the value is not a string.
    pub fn text(&self, index: usize, parameter: &str) -> Result<&str, CallError> {
        let value = self.value(index);
        value.as_text().ok_or_else(|| CallError::InvalidArgument {
            parameter: parameter.to_string(),
            expected: "string",
            found: value.to_string(),
        })
    }

    /// Rest arguments, empty when none were collected
    #[must_use]
    pub fn rest_values(&self) -> &[Value] {
        match &self.rest {
            Some(rest) => &rest.positional,
            None => &[],
        }
    }

    /// First parameter without a default that received no value
    #[must_use]
    pub fn first_missing<'a>(&self, parameters: &'a ParameterList) -> Option<&'a Parameter> {
        parameters
            .parameters
            .iter()
            .enumerate()
            .find(|(index, param)| param.default.is_none() && !self.is_supplied(*index))
            .map(|(_, param)| param)
    }
}

/// Callable implemented by the host
#[derive(Debug, Clone)]
pub struct NativeFunction {
    /// Name the function is registered under
    pub name: String,
    /// Declared parameters
    pub parameters: ParameterList,
    /// Implementation
    pub call: NativeFn,
}

/// Anything that can be invoked from a call expression
#[derive(Debug, Clone)]
pub enum Callable {
    /// Host function
    Native(NativeFunction),
    /// `@function` with the scope it was declared in
    User {
        /// Declaration and body
        definition: Rc<CallableDefinition>,
        /// Defining scope
        closure: ScopeId,
    },
}

impl Callable {
    /// Wraps a host function with an explicit parameter list
    #[must_use]
    pub fn native(name: impl Into<String>, parameters: ParameterList, call: NativeFn) -> Self {
        Self::Native(NativeFunction {
            name: name.into(),
            parameters,
            call,
        })
    }

    /// Callable name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Native(native) => &native.name,
            Self::User { definition, .. } => &definition.declaration.name,
        }
    }

    /// Declared parameters
    #[must_use]
    pub fn parameters(&self) -> &ParameterList {
        match self {
            Self::Native(native) => &native.parameters,
            Self::User { definition, .. } => &definition.declaration.parameters,
        }
    }

    /// Matches supplied arguments against the parameter list
    ///
    /// # Errors
    ///
    /// Returns a [`BindError`] for surplus positional arguments without a rest
    /// parameter and for unknown or duplicate named arguments.
    pub fn bind(
        &self,
        positional: Vec<Value>,
        named: Vec<(String, Value)>,
    ) -> Result<BoundArguments, BindError> {
        bind(self.parameters(), positional, named)
    }
}

/// Matches arguments against `parameters`
///
/// # Errors
///
/// See [`Callable::bind`].
pub fn bind(
    parameters: &ParameterList,
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
) -> Result<BoundArguments, BindError> {
    let declared = parameters.parameters.len();
    let given = positional.len();
    let mut values: Vec<Option<Value>> = vec![None; declared];
    let mut rest = parameters.rest.as_ref().map(|_| ArgumentListValue::default());

    for (index, value) in positional.into_iter().enumerate() {
        if index < declared {
            values[index] = Some(value);
        } else if let Some(rest) = rest.as_mut() {
            rest.positional.push(value);
        } else {
            return Err(BindError::TooManyArguments {
                expected: declared,
                given,
            });
        }
    }

    for (name, value) in named {
        match parameters.position(&name) {
            Some(index) if values[index].is_some() => {
                let name = parameters.parameters[index].name.clone();
                return Err(if index < given {
                    BindError::DuplicateArgument { name }
                } else {
                    BindError::RepeatedArgument { name }
                });
            }
            Some(index) => values[index] = Some(value),
            None => match rest.as_mut() {
                Some(rest) => {
                    let name = jz_ast::bare_name(&name).to_string();
                    if rest.keywords.iter().any(|(existing, _)| *existing == name) {
                        return Err(BindError::RepeatedArgument { name });
                    }
                    rest.keywords.push((name, value));
                }
                None => return Err(BindError::UnknownArgument { name }),
            },
        }
    }

    Ok(BoundArguments { values, rest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jz_ast::build;

    fn echo(args: &BoundArguments) -> Result<Value, CallError> {
        Ok(args.value(0).clone())
    }

    fn abc() -> Callable {
        Callable::native(
            "abc",
            ParameterList::new(
                vec![
                    Parameter::required("$a"),
                    Parameter::with_unknown_default("$b"),
                    Parameter::required("$c"),
                ],
                None,
            ),
            echo,
        )
    }

    #[test]
    fn test_bind_named_leaves_gap() {
        let bound = abc()
            .bind(
                Vec::new(),
                vec![
                    ("a".to_string(), Value::number(1.0, "")),
                    ("$c".to_string(), Value::number(3.0, "")),
                ],
            )
            .unwrap();

        assert_eq!(
            bound.values,
            vec![
                Some(Value::number(1.0, "")),
                None,
                Some(Value::number(3.0, "")),
            ]
        );
        assert_eq!(bound.first_missing(abc().parameters()), None);
    }

    #[test]
    fn test_bind_reports_missing_required() {
        let callable = abc();
        let bound = callable
            .bind(vec![Value::number(1.0, "")], Vec::new())
            .unwrap();
        let missing = bound.first_missing(callable.parameters()).unwrap();
        assert_eq!(missing.name, "$c");
    }

    #[test]
    fn test_bind_rest() {
        let params = ParameterList::new(
            vec![Parameter::with_default("$first", build::num(0.0, ""))],
            Some("$others"),
        );
        let bound = bind(
            &params,
            vec![
                Value::number(1.0, ""),
                Value::number(2.0, ""),
                Value::number(3.0, ""),
            ],
            vec![("$extra".to_string(), Value::Boolean(true))],
        )
        .unwrap();

        assert_eq!(bound.rest_values().len(), 2);
        let rest = bound.rest.unwrap();
        assert_eq!(rest.keywords, vec![("extra".to_string(), Value::Boolean(true))]);
    }

    #[test]
    fn test_bind_errors() {
        let too_many = abc().bind(vec![Value::Null; 4], Vec::new()).unwrap_err();
        assert_eq!(too_many.to_string(), "Only 3 arguments allowed, but 4 were passed");

        let duplicate = abc()
            .bind(
                vec![Value::Null],
                vec![("$a".to_string(), Value::Null)],
            )
            .unwrap_err();
        assert_eq!(duplicate, BindError::DuplicateArgument { name: "$a".to_string() });

        let repeated = abc()
            .bind(
                Vec::new(),
                vec![("$c".to_string(), Value::Null), ("c".to_string(), Value::Null)],
            )
            .unwrap_err();
        assert_eq!(repeated.to_string(), "Argument $c was passed by name more than once");

        let unknown = abc()
            .bind(Vec::new(), vec![("$z".to_string(), Value::Null)])
            .unwrap_err();
        assert_eq!(unknown, BindError::UnknownArgument { name: "$z".to_string() });
    }

    #[test]
    fn test_native_call() {
        let Callable::Native(native) = abc() else {
            panic!("expected a native callable");
        };
        let bound = bind(&native.parameters, vec![Value::quoted("x")], Vec::new()).unwrap();
        assert_eq!((native.call)(&bound), Ok(Value::quoted("x")));
        assert_eq!(
            bound.number(0, "$a").unwrap_err().to_string(),
            "$a: \"x\" is not a number"
        );
    }
}
