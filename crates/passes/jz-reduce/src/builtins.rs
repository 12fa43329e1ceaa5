//! Built-in functions
//!
//! Every built-in is a [`Callable::Native`] with an explicit parameter list, so
//! calls to it are bound exactly like calls to `@function` definitions. The same
//! callables are also registered under the `math`, `string`, `list` and `meta`
//! module namespaces.

use crate::units;
use jz_ast::{ListSeparator, ListValue, Numeric, Parameter, ParameterList, Value};
use jz_scope::{BoundArguments, CallError, Callable, NativeFn};
use rustc_hash::FxHashMap;

/// Functions grouped under each built-in module
const MODULES: &[(&str, &[&str])] = &[
    (
        "math",
        &["round", "ceil", "floor", "abs", "min", "max", "percentage", "unit", "unitless"],
    ),
    (
        "string",
        &["quote", "unquote", "str-length", "to-upper-case", "to-lower-case"],
    ),
    ("list", &["length", "nth", "join", "append", "index"]),
    ("meta", &["type-of", "inspect"]),
];

/// Global built-ins: name, parameters and implementation
///
/// A trailing `?` marks a parameter whose default is applied by the
/// implementation, a trailing `...` the rest parameter.
const FUNCTIONS: &[(&str, &[&str], NativeFn)] = &[
    ("type-of", &["$value"], type_of),
    ("unit", &["$number"], unit),
    ("unitless", &["$number"], unitless),
    ("percentage", &["$number"], percentage),
    ("round", &["$number"], round),
    ("ceil", &["$number"], ceil),
    ("floor", &["$number"], floor),
    ("abs", &["$number"], abs),
    ("min", &["$numbers..."], min),
    ("max", &["$numbers..."], max),
    ("length", &["$list"], length),
    ("nth", &["$list", "$n"], nth),
    ("join", &["$list1", "$list2", "$separator?"], join),
    ("append", &["$list", "$val", "$separator?"], append),
    ("index", &["$list", "$value"], index),
    ("quote", &["$string"], quote),
    ("unquote", &["$string"], unquote),
    ("str-length", &["$string"], str_length),
    ("to-upper-case", &["$string"], to_upper_case),
    ("to-lower-case", &["$string"], to_lower_case),
    ("if", &["$condition", "$if-true", "$if-false"], if_function),
    ("inspect", &["$value"], inspect),
];

/// Table of built-in functions
#[derive(Debug, Clone, Default)]
pub struct Builtins {
    functions: FxHashMap<String, Callable>,
}

impl Builtins {
    /// Registers the global built-ins, plus the namespaced copies when
    /// `include_modules` is set
    #[must_use]
    pub fn new(include_modules: bool) -> Self {
        let mut functions = FxHashMap::default();
        for (name, parameters, call) in FUNCTIONS {
            functions.insert(
                (*name).to_string(),
                Callable::native(*name, parameter_list(parameters), *call),
            );
        }

        if include_modules {
            for (module, names) in MODULES {
                for name in *names {
                    if let Some(callable) = functions.get(*name).cloned() {
                        functions.insert(format!("{module}.{name}"), callable);
                    }
                }
            }
        }

        Self { functions }
    }

    /// Built-in registered under `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Callable> {
        self.functions.get(name)
    }

    /// Whether `name` is a built-in
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Unqualified functions of the built-in module `module`
    ///
    /// Empty for unknown modules.
    #[must_use]
    pub fn module(&self, module: &str) -> Vec<(&'static str, &Callable)> {
        MODULES
            .iter()
            .filter(|(name, _)| *name == module)
            .flat_map(|(_, names)| names.iter())
            .filter_map(|name| Some((*name, self.functions.get(*name)?)))
            .collect()
    }
}

fn parameter_list(names: &[&str]) -> ParameterList {
    let mut parameters = Vec::new();
    let mut rest = None;
    for name in names {
        if let Some(name) = name.strip_suffix("...") {
            rest = Some(name);
        } else if let Some(name) = name.strip_suffix('?') {
            parameters.push(Parameter::with_unknown_default(name));
        } else {
            parameters.push(Parameter::required(*name));
        }
    }
    ParameterList::new(parameters, rest)
}

fn number_with(numeric: &Numeric, value: f64) -> Value {
    Value::Numeric(Numeric {
        value,
        unit: numeric.unit.clone(),
    })
}

fn type_of(args: &BoundArguments) -> Result<Value, CallError> {
    Ok(Value::unquoted(args.value(0).type_name()))
}

fn unit(args: &BoundArguments) -> Result<Value, CallError> {
    Ok(Value::quoted(args.number(0, "$number")?.unit_str()))
}

fn unitless(args: &BoundArguments) -> Result<Value, CallError> {
    Ok(Value::Boolean(args.number(0, "$number")?.unit.is_none()))
}

fn percentage(args: &BoundArguments) -> Result<Value, CallError> {
    let numeric = args.number(0, "$number")?;
    if numeric.unit.is_some() {
        return Err(CallError::InvalidArgument {
            parameter: "$number".to_string(),
            expected: "unitless number",
            found: numeric.to_string(),
        });
    }
    Ok(Value::number(numeric.value * 100.0, "%"))
}

fn round(args: &BoundArguments) -> Result<Value, CallError> {
    let numeric = args.number(0, "$number")?;
    Ok(number_with(numeric, numeric.value.round()))
}

fn ceil(args: &BoundArguments) -> Result<Value, CallError> {
    let numeric = args.number(0, "$number")?;
    Ok(number_with(numeric, numeric.value.ceil()))
}

fn floor(args: &BoundArguments) -> Result<Value, CallError> {
    let numeric = args.number(0, "$number")?;
    Ok(number_with(numeric, numeric.value.floor()))
}

fn abs(args: &BoundArguments) -> Result<Value, CallError> {
    let numeric = args.number(0, "$number")?;
    Ok(number_with(numeric, numeric.value.abs()))
}

/// Numeric argument whose value, in the unit of `best`, beats `best`
fn extremum(args: &BoundArguments, wins: fn(f64, f64) -> bool) -> Result<Value, CallError> {
    let mut best: Option<&Numeric> = None;
    for value in args.rest_values() {
        let numeric = value.as_numeric().ok_or_else(|| CallError::InvalidArgument {
            parameter: "$numbers".to_string(),
            expected: "number",
            found: value.to_string(),
        })?;

        best = Some(match best {
            None => numeric,
            Some(current) => {
                let converted = units::convert(numeric.value, numeric.unit_str(), current.unit_str())
                    .ok_or_else(|| {
                        CallError::Failed(format!("Incompatible units {current} and {numeric}"))
                    })?;
                if wins(converted, current.value) {
                    numeric
                } else {
                    current
                }
            }
        });
    }

    best.map(|numeric| Value::Numeric(numeric.clone()))
        .ok_or_else(|| CallError::Failed("At least one argument must be passed".to_string()))
}

fn min(args: &BoundArguments) -> Result<Value, CallError> {
    extremum(args, |candidate, best| candidate < best)
}

fn max(args: &BoundArguments) -> Result<Value, CallError> {
    extremum(args, |candidate, best| candidate > best)
}

fn length(args: &BoundArguments) -> Result<Value, CallError> {
    Ok(Value::number(args.value(0).to_items().len() as f64, ""))
}

fn nth(args: &BoundArguments) -> Result<Value, CallError> {
    let items = args.value(0).to_items();
    let position = args.number(1, "$n")?;
    let count = items.len();
    let invalid = || {
        CallError::Failed(format!(
            "Invalid index {position} for a list with {count} elements"
        ))
    };

    // Checked as a float so huge or non-finite indices never reach a cast
    let magnitude = position.value.abs();
    if position.value.fract() != 0.0 || magnitude < 1.0 || magnitude > count as f64 {
        return Err(invalid());
    }

    let offset = magnitude as usize;
    let index = if position.value > 0.0 { offset - 1 } else { count - offset };
    items.get(index).cloned().ok_or_else(invalid)
}

fn separator_argument(
    args: &BoundArguments,
    index: usize,
    fallback: ListSeparator,
) -> Result<ListSeparator, CallError> {
    if !args.is_supplied(index) {
        return Ok(fallback);
    }
    match args.text(index, "$separator")? {
        "auto" => Ok(fallback),
        "comma" => Ok(ListSeparator::Comma),
        "space" => Ok(ListSeparator::Space),
        "slash" => Ok(ListSeparator::Slash),
        other => Err(CallError::Failed(format!(
            "$separator: Must be \"space\", \"comma\", \"slash\", or \"auto\", got {other}"
        ))),
    }
}

fn join(args: &BoundArguments) -> Result<Value, CallError> {
    let (first, second) = (args.value(0), args.value(1));
    let fallback = match (first, second) {
        (Value::List(list), _) | (_, Value::List(list)) => list.separator,
        _ => ListSeparator::Space,
    };
    let separator = separator_argument(args, 2, fallback)?;

    let mut items = first.to_items();
    items.extend(second.to_items());
    Ok(Value::List(ListValue::new(separator, items)))
}

fn append(args: &BoundArguments) -> Result<Value, CallError> {
    let list = args.value(0);
    let separator = separator_argument(args, 2, list.separator())?;

    let mut items = list.to_items();
    items.push(args.value(1).clone());
    Ok(Value::List(ListValue::new(separator, items)))
}

fn index(args: &BoundArguments) -> Result<Value, CallError> {
    let needle = args.value(1);
    Ok(args
        .value(0)
        .to_items()
        .iter()
        .position(|item| item == needle)
        .map_or(Value::Null, |position| Value::number((position + 1) as f64, "")))
}

fn quote(args: &BoundArguments) -> Result<Value, CallError> {
    Ok(Value::quoted(args.text(0, "$string")?))
}

fn unquote(args: &BoundArguments) -> Result<Value, CallError> {
    Ok(Value::unquoted(args.text(0, "$string")?))
}

fn str_length(args: &BoundArguments) -> Result<Value, CallError> {
    Ok(Value::number(args.text(0, "$string")?.chars().count() as f64, ""))
}

fn map_text(args: &BoundArguments, map: fn(&str) -> String) -> Result<Value, CallError> {
    match args.value(0) {
        Value::String { value, quoted } => Ok(Value::String {
            value: map(value),
            quoted: *quoted,
        }),
        Value::Bareword(value) => Ok(Value::Bareword(map(value))),
        other => Err(CallError::InvalidArgument {
            parameter: "$string".to_string(),
            expected: "string",
            found: other.to_string(),
        }),
    }
}

fn to_upper_case(args: &BoundArguments) -> Result<Value, CallError> {
    map_text(args, str::to_uppercase)
}

fn to_lower_case(args: &BoundArguments) -> Result<Value, CallError> {
    map_text(args, str::to_lowercase)
}

fn if_function(args: &BoundArguments) -> Result<Value, CallError> {
    let branch = if args.value(0).is_truthy() { 1 } else { 2 };
    Ok(args.value(branch).clone())
}

fn inspect(args: &BoundArguments) -> Result<Value, CallError> {
    Ok(match args.value(0) {
        Value::Null => Value::unquoted("null"),
        value => Value::unquoted(value.to_string()),
    })
}
