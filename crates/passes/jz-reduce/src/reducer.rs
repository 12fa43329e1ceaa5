//! Expression reducer
//!
//! Turns an [`Expression`] into a [`Value`] against a frame of the
//! [`ScopeTree`]. Variables resolve to their stored values, calls are bound and
//! invoked, operators are folded with CSS unit semantics. Whether `/` divides
//! depends on the context: parenthesized groups, call arguments, `@return`,
//! conditions and math calls divide, plain declaration values keep `a/b` as a
//! slash separated list unless [`ReduceOptions::division_in_values`] is set.

use crate::builtins::Builtins;
use crate::control::{self, Step};
use crate::error::ReduceError;
use crate::units;
use jz_ast::{
    ArgumentList, ArgumentListValue, AtRule, AtRuleKind, BinaryOp, DefaultValue, EachCondition,
    Expression, ForCondition, InterpolationPart, ListSeparator, ListValue, Node, Numeric,
    ParameterList, UnaryOp, Value, bare_name,
};
use jz_scope::{Callable, Member, MemberKind, ScopeId, ScopeTree};
use jz_span::FileSpan;
use std::cmp::Ordering;

/// Most iterations a single `@for` loop may run
pub const MAX_LOOP_ITERATIONS: usize = 10_000;

/// Knobs of the reducer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceOptions {
    /// Whether `/` divides in plain declaration values
    pub division_in_values: bool,
    /// Maximum nesting of function and mixin invocations
    pub max_call_depth: usize,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self {
            division_in_values: false,
            max_call_depth: 64,
        }
    }
}

/// Expression evaluator over a scope tree
#[derive(Debug)]
pub struct Reducer<'a> {
    scopes: &'a mut ScopeTree,
    builtins: &'a Builtins,
    options: ReduceOptions,
    depth: usize,
}

impl<'a> Reducer<'a> {
    /// Creates a reducer working on `scopes`
    #[must_use]
    pub fn new(scopes: &'a mut ScopeTree, builtins: &'a Builtins, options: ReduceOptions) -> Self {
        Self {
            scopes,
            builtins,
            options,
            depth: 0,
        }
    }

    /// Starts counting invocations at `depth`, for reductions inside a mixin body
    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Options in effect
    #[must_use]
    pub fn options(&self) -> ReduceOptions {
        self.options
    }

    /// Reduces a declaration value
    ///
    /// # Errors
    ///
    /// Returns a [`ReduceError`] for unresolved names, invalid operations and
    /// failed invocations.
    pub fn reduce(&mut self, expr: &Expression, scope: ScopeId) -> Result<Value, ReduceError> {
        self.eval(expr, scope, self.options.division_in_values)
    }

    /// Reduces an expression in a context where `/` divides
    ///
    /// # Errors
    ///
    /// See [`Reducer::reduce`].
    pub fn reduce_with_division(
        &mut self,
        expr: &Expression,
        scope: ScopeId,
    ) -> Result<Value, ReduceError> {
        self.eval(expr, scope, true)
    }

    /// Truthiness of a condition
    ///
    /// # Errors
    ///
    /// See [`Reducer::reduce`].
    pub fn truthy(&mut self, expr: &Expression, scope: ScopeId) -> Result<bool, ReduceError> {
        Ok(self.reduce_with_division(expr, scope)?.is_truthy())
    }

    /// Branch of a conditional chain whose condition holds, if any
    ///
    /// # Errors
    ///
    /// See [`Reducer::reduce`].
    pub fn select_branch<'n>(
        &mut self,
        branches: impl IntoIterator<Item = &'n AtRule>,
        scope: ScopeId,
    ) -> Result<Option<&'n AtRule>, ReduceError> {
        for branch in branches {
            let taken = match &branch.kind {
                AtRuleKind::If(condition) | AtRuleKind::ElseIf(condition) => {
                    self.truthy(condition, scope)?
                }
                _ => true,
            };
            if taken {
                return Ok(Some(branch));
            }
        }
        Ok(None)
    }

    /// Variable bindings of each `@each` iteration
    ///
    /// With several variables every item is destructured; missing positions bind
    /// `null`.
    ///
    /// # Errors
    ///
    /// See [`Reducer::reduce`].
    pub fn each_iterations(
        &mut self,
        condition: &EachCondition,
        scope: ScopeId,
    ) -> Result<Vec<Vec<(String, Value)>>, ReduceError> {
        let list = self.reduce_with_division(&condition.list, scope)?;

        Ok(list
            .to_items()
            .into_iter()
            .map(|item| match condition.variables.as_slice() {
                [variable] => vec![(variable.clone(), item)],
                variables => {
                    let parts = item.to_items();
                    variables
                        .iter()
                        .enumerate()
                        .map(|(index, variable)| {
                            (variable.clone(), parts.get(index).cloned().unwrap_or(Value::Null))
                        })
                        .collect()
                }
            })
            .collect())
    }

    /// Values of the `@for` variable, counting down when `from` exceeds `to`
    ///
    /// # Errors
    ///
    /// Returns [`ReduceError::Arithmetic`] when a bound is not an integer or the
    /// loop would run more than [`MAX_LOOP_ITERATIONS`] times, and
    /// [`ReduceError::UnitMismatch`] for incompatible bound units.
    pub fn for_iterations(
        &mut self,
        condition: &ForCondition,
        scope: ScopeId,
    ) -> Result<Vec<Value>, ReduceError> {
        let span = condition.from.span().cover(condition.to.span());
        let from = self.integer_bound(&condition.from, scope)?;
        let to = self.integer_bound(&condition.to, scope)?;

        let unit = units::common_unit(from.unit_str(), to.unit_str()).ok_or_else(|| {
            ReduceError::UnitMismatch {
                left: from.unit_str().to_string(),
                right: to.unit_str().to_string(),
                span,
            }
        })?;
        let start = units::convert(from.value, from.unit_str(), unit).unwrap_or(from.value);
        let end = units::convert(to.value, to.unit_str(), unit).unwrap_or(to.value);

        let distance = (end - start).abs();
        if !distance.is_finite() || distance >= MAX_LOOP_ITERATIONS as f64 {
            return Err(ReduceError::arithmetic(
                format!("@for from {from} to {to} exceeds {MAX_LOOP_ITERATIONS} iterations"),
                span,
            ));
        }

        let step = if start <= end { 1.0 } else { -1.0 };
        let count = distance as usize + usize::from(condition.inclusive);
        Ok((0..count)
            .map(|offset| Value::number(start + step * offset as f64, unit))
            .collect())
    }

    fn integer_bound(&mut self, expr: &Expression, scope: ScopeId) -> Result<Numeric, ReduceError> {
        match self.reduce_with_division(expr, scope)? {
            Value::Numeric(numeric) if numeric.value.fract() == 0.0 => Ok(numeric),
            other => Err(ReduceError::arithmetic(
                format!("{other} is not an integer"),
                expr.span(),
            )),
        }
    }

    /// Reduces call arguments left to right, spreading a trailing `$list...`
    ///
    /// # Errors
    ///
    /// See [`Reducer::reduce`].
    pub fn reduce_arguments(
        &mut self,
        args: &ArgumentList,
        scope: ScopeId,
    ) -> Result<(Vec<Value>, Vec<(String, Value)>), ReduceError> {
        let mut positional = Vec::with_capacity(args.positional.len());
        for arg in &args.positional {
            positional.push(self.reduce_with_division(arg, scope)?);
        }

        let mut named = Vec::with_capacity(args.named.len());
        for (name, arg) in &args.named {
            named.push((name.clone(), self.reduce_with_division(arg, scope)?));
        }

        if let Some(rest) = &args.rest {
            match self.reduce_with_division(rest, scope)? {
                Value::ArgumentList(spread) => {
                    positional.extend(spread.positional);
                    named.extend(spread.keywords);
                }
                Value::List(list) => positional.extend(list.items),
                other => positional.push(other),
            }
        }

        Ok((positional, named))
    }

    /// Binds arguments to `parameters` as variables of `frame`
    ///
    /// The supplied arguments are also stored in the frame's arguments slot.
    /// Defaults are reduced in `frame`, so they see earlier parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ReduceError::Binding`] when the arguments do not fit and
    /// [`ReduceError::MissingArgument`] for a required parameter without value.
    pub fn bind_into(
        &mut self,
        callee: &str,
        parameters: &ParameterList,
        positional: Vec<Value>,
        named: Vec<(String, Value)>,
        frame: ScopeId,
        span: FileSpan,
    ) -> Result<(), ReduceError> {
        let supplied = ArgumentListValue {
            positional: positional.clone(),
            keywords: named
                .iter()
                .map(|(name, value)| (bare_name(name).to_string(), value.clone()))
                .collect(),
        };
        self.scopes
            .set_arguments(frame, Value::ArgumentList(supplied));

        let bound = jz_scope::bind(parameters, positional, named).map_err(|source| {
            ReduceError::Binding {
                callee: callee.to_string(),
                source,
                span,
            }
        })?;

        for (parameter, value) in parameters.parameters.iter().zip(bound.values) {
            let value = match (value, &parameter.default) {
                (Some(value), _) => value,
                (None, Some(DefaultValue::Expression(default))) => {
                    self.reduce_with_division(default, frame)?
                }
                (None, Some(DefaultValue::Unknown)) => Value::Null,
                (None, None) => {
                    return Err(ReduceError::MissingArgument {
                        callee: callee.to_string(),
                        parameter: parameter.name.clone(),
                        span,
                    });
                }
            };
            self.scopes
                .declare(frame, &parameter.name, Member::variable(value), parameter.span)?;
        }

        if let (Some(rest), Some(values)) = (&parameters.rest, bound.rest) {
            self.scopes.declare(
                frame,
                &rest.name,
                Member::variable(Value::ArgumentList(values)),
                rest.span,
            )?;
        }

        Ok(())
    }

    /// Invokes `callable` with reduced arguments
    ///
    /// User functions run in a fresh child of their closure frame, which is
    /// closed again afterwards.
    ///
    /// # Errors
    ///
    /// Returns binding and native failures, [`ReduceError::RecursionLimit`] and
    /// [`ReduceError::MissingReturn`].
    pub fn invoke(
        &mut self,
        callable: &Callable,
        positional: Vec<Value>,
        named: Vec<(String, Value)>,
        span: FileSpan,
    ) -> Result<Value, ReduceError> {
        match callable {
            Callable::Native(native) => {
                let bound = callable.bind(positional, named).map_err(|source| {
                    ReduceError::Binding {
                        callee: native.name.clone(),
                        source,
                        span,
                    }
                })?;
                if let Some(missing) = bound.first_missing(&native.parameters) {
                    return Err(ReduceError::MissingArgument {
                        callee: native.name.clone(),
                        parameter: missing.name.clone(),
                        span,
                    });
                }
                (native.call)(&bound).map_err(|source| ReduceError::Call {
                    callee: native.name.clone(),
                    source,
                    span,
                })
            }
            Callable::User {
                definition,
                closure,
            } => {
                let name = &definition.declaration.name;
                if self.depth >= self.options.max_call_depth {
                    return Err(ReduceError::RecursionLimit {
                        callee: name.clone(),
                        limit: self.options.max_call_depth,
                        span,
                    });
                }

                let frame = self.scopes.create_child(*closure);
                tracing::trace!(function = %name, depth = self.depth, "invoke");

                self.depth += 1;
                let result = self
                    .bind_into(
                        name,
                        &definition.declaration.parameters,
                        positional,
                        named,
                        frame,
                        span,
                    )
                    .and_then(|()| self.run_body(&definition.body, frame));
                self.depth -= 1;
                self.scopes.close(frame);

                result?.ok_or_else(|| ReduceError::MissingReturn {
                    callee: name.clone(),
                    span,
                })
            }
        }
    }

    /// Runs the statements of a function body; `Some` once `@return` is reached
    fn run_body(&mut self, nodes: &[Node], scope: ScopeId) -> Result<Option<Value>, ReduceError> {
        for step in control::statements(nodes)? {
            let returned = match step {
                Step::Conditional(_) => match self.select_branch(step.branches(), scope)? {
                    Some(branch) => self.run_scoped(branch.body(), scope, Vec::new(), branch.span)?,
                    None => None,
                },
                Step::Node(Node::Declaration(decl)) => {
                    let Some(name) = decl.variable_name() else {
                        return Err(ReduceError::InvalidStatement {
                            name: decl.prop_text(),
                            span: decl.span,
                        });
                    };
                    let value = self.reduce(&decl.value, scope)?;
                    self.scopes
                        .declare(scope, name, Member::variable(value), decl.span)?;
                    None
                }
                Step::Node(Node::AtRule(at_rule)) => self.run_at_rule(at_rule, scope)?,
                Step::Node(Node::Rule(rule)) => {
                    return Err(ReduceError::InvalidStatement {
                        name: rule.selector.to_string(),
                        span: rule.span,
                    });
                }
            };

            if returned.is_some() {
                return Ok(returned);
            }
        }
        Ok(None)
    }

    /// Runs `body` in a child frame of `scope` holding `bindings`, then closes it
    fn run_scoped(
        &mut self,
        body: &[Node],
        scope: ScopeId,
        bindings: Vec<(String, Value)>,
        span: FileSpan,
    ) -> Result<Option<Value>, ReduceError> {
        let frame = self.scopes.create_child(scope);
        let result = bindings
            .into_iter()
            .try_for_each(|(name, value)| {
                self.scopes
                    .declare(frame, &name, Member::variable(value), span)
            })
            .map_err(ReduceError::from)
            .and_then(|()| self.run_body(body, frame));
        self.scopes.close(frame);
        result
    }

    fn run_at_rule(
        &mut self,
        at_rule: &AtRule,
        scope: ScopeId,
    ) -> Result<Option<Value>, ReduceError> {
        match &at_rule.kind {
            AtRuleKind::Return(expr) => Ok(Some(self.reduce_with_division(expr, scope)?)),
            AtRuleKind::Each(condition) => {
                for bindings in self.each_iterations(condition, scope)? {
                    let returned = self.run_scoped(at_rule.body(), scope, bindings, at_rule.span)?;
                    if returned.is_some() {
                        return Ok(returned);
                    }
                }
                Ok(None)
            }
            AtRuleKind::For(condition) => {
                for value in self.for_iterations(condition, scope)? {
                    let bindings = vec![(condition.variable.clone(), value)];
                    let returned = self.run_scoped(at_rule.body(), scope, bindings, at_rule.span)?;
                    if returned.is_some() {
                        return Ok(returned);
                    }
                }
                Ok(None)
            }
            _ => Err(ReduceError::InvalidStatement {
                name: format!("@{}", at_rule.name),
                span: at_rule.span,
            }),
        }
    }

    fn eval(
        &mut self,
        expr: &Expression,
        scope: ScopeId,
        division: bool,
    ) -> Result<Value, ReduceError> {
        match expr {
            Expression::Numeric { value, unit, .. } => Ok(Value::Numeric(Numeric {
                value: *value,
                unit: unit.clone(),
            })),
            Expression::Color { value, .. } => Ok(Value::Color(value.clone())),
            Expression::String { value, quoted, .. } => Ok(Value::String {
                value: value.clone(),
                quoted: *quoted,
            }),
            Expression::Url { value, .. } => Ok(Value::Url(value.clone())),
            Expression::Ident { name, .. } => Ok(Value::Bareword(name.clone())),
            Expression::Boolean { value, .. } => Ok(Value::Boolean(*value)),
            Expression::Null { .. } => Ok(Value::Null),
            Expression::Literal { value, .. } => Ok(value.clone()),

            Expression::Variable { name, span } => {
                Ok(self.scopes.resolve_variable(scope, name, *span)?.clone())
            }

            Expression::List {
                separator,
                bracketed,
                items,
                ..
            } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, scope, division)?);
                }
                Ok(Value::List(ListValue {
                    separator: *separator,
                    bracketed: *bracketed,
                    items: values,
                }))
            }

            Expression::Call { callee, args, span } => self.call(callee, args, scope, *span),

            Expression::MathCall { name, args, .. } => self.math_call(name, args, scope),

            Expression::Binary {
                op,
                left,
                right,
                span,
            } => self.eval_binary(*op, left, right, scope, division, *span),

            Expression::Unary { op, operand, .. } => {
                let value = self.eval(operand, scope, division)?;
                Ok(eval_unary(*op, value))
            }

            Expression::Parenthesized { inner, .. } => self.eval(inner, scope, true),

            Expression::Interpolation { parts, .. } => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        InterpolationPart::Text(piece) => text.push_str(piece),
                        InterpolationPart::Expression(expr) => {
                            text.push_str(&plain_text(&self.eval(expr, scope, division)?));
                        }
                    }
                }
                Ok(Value::Bareword(text))
            }
        }
    }

    fn call(
        &mut self,
        callee: &str,
        args: &ArgumentList,
        scope: ScopeId,
        span: FileSpan,
    ) -> Result<Value, ReduceError> {
        let callable = self
            .scopes
            .get_function(scope, callee)
            .or_else(|| self.builtins.get(callee))
            .cloned();

        let Some(callable) = callable else {
            if callee.contains('.') {
                return Err(self
                    .scopes
                    .unresolved(scope, callee, MemberKind::Function, span)
                    .into());
            }

            let (mut positional, named) = self.reduce_arguments(args, scope)?;
            positional.extend(
                named
                    .into_iter()
                    .map(|(name, value)| Value::unquoted(format!("{name}: {value}"))),
            );
            return Ok(Value::Function {
                name: callee.to_string(),
                args: positional,
            });
        };

        let (positional, named) = self.reduce_arguments(args, scope)?;
        self.invoke(&callable, positional, named, span)
    }

    /// `calc`, `min`, `max` and `clamp`: folded when every argument is a
    /// compatible number, kept for the browser otherwise
    fn math_call(
        &mut self,
        name: &str,
        args: &[Expression],
        scope: ScopeId,
    ) -> Result<Value, ReduceError> {
        let mut numbers = Vec::with_capacity(args.len());
        for arg in args {
            match self.eval(arg, scope, true) {
                Ok(Value::Numeric(numeric)) => numbers.push(Some(numeric)),
                Ok(_) | Err(ReduceError::UnitMismatch { .. } | ReduceError::Arithmetic { .. }) => {
                    numbers.push(None);
                }
                Err(error) => return Err(error),
            }
        }

        let numbers: Option<Vec<Numeric>> = numbers.into_iter().collect();
        let folded = numbers.and_then(|numbers| match (name, numbers.as_slice()) {
            ("calc", [single]) => Some(single.clone()),
            ("min", [_, ..]) => pick(&numbers, Ordering::Less),
            ("max", [_, ..]) => pick(&numbers, Ordering::Greater),
            ("clamp", [lower, preferred, upper]) => {
                let at_least = pick(&[lower.clone(), preferred.clone()], Ordering::Greater)?;
                pick(&[at_least, upper.clone()], Ordering::Less)
            }
            _ => None,
        });
        if let Some(numeric) = folded {
            return Ok(Value::Numeric(numeric));
        }

        let mut rendered = Vec::with_capacity(args.len());
        for arg in args {
            rendered.push(self.substitute(arg, scope)?.to_string());
        }
        Ok(Value::Function {
            name: name.to_string(),
            args: vec![Value::Bareword(rendered.join(", "))],
        })
    }

    /// Copy of `expr` with variables and calls replaced by their values
    fn substitute(&mut self, expr: &Expression, scope: ScopeId) -> Result<Expression, ReduceError> {
        Ok(match expr {
            Expression::Variable { name, span } => Expression::from_value(
                self.scopes.resolve_variable(scope, name, *span)?.clone(),
                *span,
            ),
            Expression::Binary {
                op,
                left,
                right,
                span,
            } => Expression::Binary {
                op: *op,
                left: Box::new(self.substitute(left, scope)?),
                right: Box::new(self.substitute(right, scope)?),
                span: *span,
            },
            Expression::Unary { op, operand, span } => Expression::Unary {
                op: *op,
                operand: Box::new(self.substitute(operand, scope)?),
                span: *span,
            },
            Expression::Parenthesized { inner, span } => Expression::Parenthesized {
                inner: Box::new(self.substitute(inner, scope)?),
                span: *span,
            },
            Expression::List {
                separator,
                bracketed,
                items,
                span,
            } => {
                let mut substituted = Vec::with_capacity(items.len());
                for item in items {
                    substituted.push(self.substitute(item, scope)?);
                }
                Expression::List {
                    separator: *separator,
                    bracketed: *bracketed,
                    items: substituted,
                    span: *span,
                }
            }
            Expression::Call { span, .. }
            | Expression::MathCall { span, .. }
            | Expression::Interpolation { span, .. } => {
                Expression::from_value(self.eval(expr, scope, true)?, *span)
            }
            literal => literal.clone(),
        })
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        scope: ScopeId,
        division: bool,
        span: FileSpan,
    ) -> Result<Value, ReduceError> {
        let left = self.eval(left, scope, division)?;
        match op {
            BinaryOp::And if !left.is_truthy() => return Ok(left),
            BinaryOp::Or if left.is_truthy() => return Ok(left),
            BinaryOp::And | BinaryOp::Or => return self.eval(right, scope, division),
            _ => {}
        }

        let right = self.eval(right, scope, division)?;
        match op {
            BinaryOp::Div if !division => Ok(Value::List(ListValue::new(
                ListSeparator::Slash,
                vec![left, right],
            ))),
            BinaryOp::Eq => Ok(Value::Boolean(values_equal(&left, &right))),
            BinaryOp::Ne => Ok(Value::Boolean(!values_equal(&left, &right))),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                compare(op, &left, &right, span)
            }
            _ => arithmetic(op, &left, &right, span),
        }
    }
}

/// Number among `numbers` that is furthest towards `wanted`; `None` when units
/// cannot be compared
fn pick(numbers: &[Numeric], wanted: Ordering) -> Option<Numeric> {
    let (first, rest) = numbers.split_first()?;
    let mut best = first;
    for candidate in rest {
        let converted = units::convert(candidate.value, candidate.unit_str(), best.unit_str())?;
        if converted.partial_cmp(&best.value) == Some(wanted) {
            best = candidate;
        }
    }
    Some(best.clone())
}

fn eval_unary(op: UnaryOp, value: Value) -> Value {
    match (op, value) {
        (UnaryOp::Not, value) => Value::Boolean(!value.is_truthy()),
        (UnaryOp::Neg, Value::Numeric(numeric)) => Value::Numeric(Numeric {
            value: -numeric.value,
            unit: numeric.unit,
        }),
        (UnaryOp::Plus, value @ Value::Numeric(_)) => value,
        (op, value) => Value::Bareword(format!("{op}{value}")),
    }
}

/// Text of a value inside a larger string: strings lose their quotes
fn plain_text(value: &Value) -> String {
    match value {
        Value::String { value, .. } => value.clone(),
        other => other.to_string(),
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Numeric(left), Value::Numeric(right)) => {
            units::common_unit(left.unit_str(), right.unit_str()).is_some_and(|unit| {
                units::convert(left.value, left.unit_str(), unit)
                    == units::convert(right.value, right.unit_str(), unit)
            })
        }
        (
            Value::String { value: left, .. } | Value::Bareword(left),
            Value::String { value: right, .. } | Value::Bareword(right),
        ) => left == right,
        _ => left == right,
    }
}

/// Both operands converted to their common unit
fn common_values(
    left: &Numeric,
    right: &Numeric,
    span: FileSpan,
) -> Result<(f64, f64, String), ReduceError> {
    let mismatch = || ReduceError::UnitMismatch {
        left: left.unit_str().to_string(),
        right: right.unit_str().to_string(),
        span,
    };
    let unit = units::common_unit(left.unit_str(), right.unit_str()).ok_or_else(mismatch)?;
    let lhs = units::convert(left.value, left.unit_str(), unit).ok_or_else(mismatch)?;
    let rhs = units::convert(right.value, right.unit_str(), unit).ok_or_else(mismatch)?;
    Ok((lhs, rhs, unit.to_string()))
}

fn undefined_operation(op: BinaryOp, left: &Value, right: &Value, span: FileSpan) -> ReduceError {
    ReduceError::arithmetic(format!("Undefined operation \"{left} {op} {right}\""), span)
}

fn compare(op: BinaryOp, left: &Value, right: &Value, span: FileSpan) -> Result<Value, ReduceError> {
    let (Value::Numeric(lhs), Value::Numeric(rhs)) = (left, right) else {
        return Err(undefined_operation(op, left, right, span));
    };
    let (x, y, _) = common_values(lhs, rhs, span)?;
    Ok(Value::Boolean(match op {
        BinaryOp::Lt => x < y,
        BinaryOp::Le => x <= y,
        BinaryOp::Gt => x > y,
        _ => x >= y,
    }))
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value, span: FileSpan) -> Result<Value, ReduceError> {
    match (op, left, right) {
        (_, Value::Numeric(lhs), Value::Numeric(rhs)) => numeric_op(op, lhs, rhs, span),
        (BinaryOp::Add, Value::String { value, quoted }, other) => Ok(Value::String {
            value: format!("{value}{}", plain_text(other)),
            quoted: *quoted,
        }),
        (BinaryOp::Add, other, Value::String { value, quoted }) => Ok(Value::String {
            value: format!("{}{value}", plain_text(other)),
            quoted: *quoted,
        }),
        (BinaryOp::Add, Value::Bareword(value), other) => {
            Ok(Value::Bareword(format!("{value}{}", plain_text(other))))
        }
        _ => Err(undefined_operation(op, left, right, span)),
    }
}

fn numeric_op(
    op: BinaryOp,
    left: &Numeric,
    right: &Numeric,
    span: FileSpan,
) -> Result<Value, ReduceError> {
    match op {
        BinaryOp::Mul => match (&left.unit, &right.unit) {
            (Some(_), Some(_)) => Err(ReduceError::arithmetic(
                format!("{left}*{right} isn't a valid CSS value"),
                span,
            )),
            (Some(unit), None) | (None, Some(unit)) => {
                Ok(Value::number(left.value * right.value, unit))
            }
            (None, None) => Ok(Value::number(left.value * right.value, "")),
        },
        BinaryOp::Div => {
            if right.value == 0.0 {
                return Err(ReduceError::arithmetic("Division by zero", span));
            }
            match (&left.unit, &right.unit) {
                (_, None) => Ok(Value::Numeric(Numeric {
                    value: left.value / right.value,
                    unit: left.unit.clone(),
                })),
                (None, Some(_)) => Err(ReduceError::arithmetic(
                    format!("{left}/{right} isn't a valid CSS value"),
                    span,
                )),
                (Some(_), Some(_)) => {
                    let (x, y, _) = common_values(left, right, span)?;
                    Ok(Value::number(x / y, ""))
                }
            }
        }
        BinaryOp::Mod => {
            let (x, y, unit) = common_values(left, right, span)?;
            if y == 0.0 {
                return Err(ReduceError::arithmetic("Modulo by zero", span));
            }
            Ok(Value::number(x - y * (x / y).floor(), &unit))
        }
        BinaryOp::Add => {
            let (x, y, unit) = common_values(left, right, span)?;
            Ok(Value::number(x + y, &unit))
        }
        BinaryOp::Sub => {
            let (x, y, unit) = common_values(left, right, span)?;
            Ok(Value::number(x - y, &unit))
        }
        _ => Err(undefined_operation(
            op,
            &Value::Numeric(left.clone()),
            &Value::Numeric(right.clone()),
            span,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jz_ast::{Parameter, build};
    use std::rc::Rc;

    struct Fixture {
        scopes: ScopeTree,
        builtins: Builtins,
        root: ScopeId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut scopes = ScopeTree::new();
            let root = scopes.create_root();
            Self {
                scopes,
                builtins: Builtins::new(true),
                root,
            }
        }

        fn set(&mut self, name: &str, value: Value) {
            self.scopes.set(self.root, name, Member::variable(value));
        }

        fn define(&mut self, name: &str, parameters: ParameterList, body: Vec<Node>) {
            let Node::AtRule(AtRule {
                kind: AtRuleKind::Function(declaration),
                children: Some(body),
                ..
            }) = build::function(name, parameters, body)
            else {
                panic!("expected a function at-rule");
            };
            let callable = Callable::User {
                definition: Rc::new(jz_ast::CallableDefinition { declaration, body }),
                closure: self.root,
            };
            self.scopes
                .set(self.root, name, Member::function(callable, None));
        }

        fn reducer(&mut self) -> Reducer<'_> {
            Reducer::new(&mut self.scopes, &self.builtins, ReduceOptions::default())
        }

        fn reduce(&mut self, expr: &Expression) -> Result<Value, ReduceError> {
            let root = self.root;
            self.reducer().reduce(expr, root)
        }
    }

    fn add(left: Expression, right: Expression) -> Expression {
        build::binary(BinaryOp::Add, left, right)
    }

    #[test]
    fn test_variable_substitution() {
        let mut fixture = Fixture::new();
        fixture.set("$gap", Value::number(4.0, "px"));

        let value = fixture
            .reduce(&build::list_space(vec![build::var("$gap"), build::ident("solid")]))
            .unwrap();
        assert_eq!(value.to_string(), "4px solid");

        let error = fixture.reduce(&build::var("$gp")).unwrap_err();
        assert_eq!(error.to_string(), "Undefined variable $gp, did you mean $gap?");
    }

    #[test]
    fn test_unit_conversion() {
        let mut fixture = Fixture::new();
        let value = fixture
            .reduce(&add(build::num(1.0, "in"), build::num(2.0, "px")))
            .unwrap();
        assert_eq!(value, Value::number(98.0, "px"));

        let value = fixture
            .reduce(&add(build::num(2.0, ""), build::num(3.0, "em")))
            .unwrap();
        assert_eq!(value, Value::number(5.0, "em"));

        let error = fixture
            .reduce(&add(build::num(1.0, "px"), build::num(1.0, "em")))
            .unwrap_err();
        assert!(matches!(error, ReduceError::UnitMismatch { .. }));
    }

    #[test]
    fn test_division_needs_context() {
        let mut fixture = Fixture::new();
        let slash = build::binary(BinaryOp::Div, build::num(12.0, "px"), build::num(1.5, ""));

        let value = fixture.reduce(&slash).unwrap();
        assert_eq!(value.to_string(), "12px/1.5");

        let value = fixture.reduce(&build::paren(slash)).unwrap();
        assert_eq!(value, Value::number(8.0, "px"));

        let by_zero = build::paren(build::binary(
            BinaryOp::Div,
            build::num(1.0, ""),
            build::num(0.0, ""),
        ));
        assert_eq!(fixture.reduce(&by_zero).unwrap_err().to_string(), "Division by zero");
    }

    #[test]
    fn test_reduction_is_idempotent() {
        let mut fixture = Fixture::new();
        fixture.set("$w", Value::number(2.0, "px"));
        let expr = build::list_comma(vec![
            build::list_space(vec![build::var("$w"), build::ident("solid"), build::color("red")]),
            build::binary(BinaryOp::Div, build::num(1.0, ""), build::num(2.0, "")),
            build::call("translate", vec![build::num(10.0, "px")]),
            build::string("a"),
        ]);

        let once = fixture.reduce(&expr).unwrap();
        let twice = fixture.reduce(&Expression::from(once.clone())).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.to_string(), "2px solid red, 1/2, translate(10px), \"a\"");
    }

    #[test]
    fn test_logic_and_comparison() {
        let mut fixture = Fixture::new();
        let or = build::binary(BinaryOp::Or, build::null(), build::ident("fallback"));
        assert_eq!(fixture.reduce(&or).unwrap(), Value::Bareword("fallback".to_string()));

        let and = build::binary(BinaryOp::And, build::boolean(false), build::var("$missing"));
        assert_eq!(fixture.reduce(&and).unwrap(), Value::Boolean(false));

        let lt = build::binary(BinaryOp::Lt, build::num(1.0, "in"), build::num(100.0, "px"));
        assert_eq!(fixture.reduce(&lt).unwrap(), Value::Boolean(true));

        let eq = build::binary(BinaryOp::Eq, build::string("a"), build::ident("a"));
        assert_eq!(fixture.reduce(&eq).unwrap(), Value::Boolean(true));

        let not = build::unary(UnaryOp::Not, build::null());
        assert_eq!(fixture.reduce(&not).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_string_concatenation_and_interpolation() {
        let mut fixture = Fixture::new();
        fixture.set("$side", Value::quoted("left"));

        let concat = add(build::string("foo"), build::ident("bar"));
        assert_eq!(fixture.reduce(&concat).unwrap(), Value::quoted("foobar"));

        let interpolated = build::interpolation(vec![
            InterpolationPart::Text("border-".to_string()),
            InterpolationPart::Expression(build::var("$side")),
        ]);
        assert_eq!(
            fixture.reduce(&interpolated).unwrap(),
            Value::Bareword("border-left".to_string())
        );
    }

    #[test]
    fn test_calls() {
        let mut fixture = Fixture::new();
        let round = build::call("math.round", vec![build::num(1.6, "px")]);
        assert_eq!(fixture.reduce(&round).unwrap(), Value::number(2.0, "px"));

        let passthrough = build::call("translate", vec![build::num(1.0, "px"), build::num(2.0, "px")]);
        assert_eq!(fixture.reduce(&passthrough).unwrap().to_string(), "translate(1px, 2px)");

        let unknown = build::call("math.rnd", vec![build::num(1.0, "")]);
        assert_eq!(
            fixture.reduce(&unknown).unwrap_err().to_string(),
            "Undefined function math.rnd"
        );

        let missing = build::call("round", vec![]);
        assert_eq!(
            fixture.reduce(&missing).unwrap_err().to_string(),
            "round: missing argument $number"
        );
    }

    #[test]
    fn test_math_calls() {
        let mut fixture = Fixture::new();
        fixture.set("$gap", Value::number(10.0, "px"));

        let folded = build::math("calc", vec![add(build::num(1.0, "px"), build::var("$gap"))]);
        assert_eq!(fixture.reduce(&folded).unwrap(), Value::number(11.0, "px"));

        let kept = build::math(
            "calc",
            vec![build::binary(BinaryOp::Sub, build::num(100.0, "%"), build::var("$gap"))],
        );
        assert_eq!(fixture.reduce(&kept).unwrap().to_string(), "calc(100% - 10px)");

        let clamp = build::math(
            "clamp",
            vec![build::num(1.0, "px"), build::num(5.0, "px"), build::num(3.0, "px")],
        );
        assert_eq!(fixture.reduce(&clamp).unwrap(), Value::number(3.0, "px"));

        let mixed = build::math("min", vec![build::num(1.0, "em"), build::num(2.0, "px")]);
        assert_eq!(fixture.reduce(&mixed).unwrap().to_string(), "min(1em, 2px)");
    }

    #[test]
    fn test_user_function() {
        let mut fixture = Fixture::new();
        fixture.set("$base", Value::number(4.0, "px"));
        fixture.define(
            "spacing",
            ParameterList::new(
                vec![
                    Parameter::required("$n"),
                    Parameter::with_default("$unit", build::var("$base")),
                ],
                None,
            ),
            vec![
                build::if_block(
                    build::binary(BinaryOp::Lt, build::var("$n"), build::num(0.0, "")),
                    vec![build::return_value(build::num(0.0, ""))],
                ),
                build::return_value(build::binary(BinaryOp::Mul, build::var("$n"), build::var("$unit"))),
            ],
        );

        let call = build::call("spacing", vec![build::num(3.0, "")]);
        assert_eq!(fixture.reduce(&call).unwrap(), Value::number(12.0, "px"));

        let named = build::call_with("spacing", build::args(vec![], vec![("n", build::num(-1.0, ""))]));
        assert_eq!(fixture.reduce(&named).unwrap(), Value::number(0.0, ""));

        let missing = build::call("spacing", vec![]);
        assert_eq!(
            fixture.reduce(&missing).unwrap_err().to_string(),
            "spacing: missing argument $n"
        );
    }

    #[test]
    fn test_function_loops() {
        let mut fixture = Fixture::new();
        fixture.define(
            "first-big",
            ParameterList::new(vec![], Some("$values")),
            vec![
                build::each(
                    &["$value"],
                    build::var("$values"),
                    vec![build::if_block(
                        build::binary(BinaryOp::Gt, build::var("$value"), build::num(10.0, "")),
                        vec![build::return_value(build::var("$value"))],
                    )],
                ),
                build::return_value(build::null()),
            ],
        );

        let call = build::call(
            "first-big",
            vec![build::num(1.0, ""), build::num(20.0, ""), build::num(30.0, "")],
        );
        assert_eq!(fixture.reduce(&call).unwrap(), Value::number(20.0, ""));

        let root = fixture.root;
        let countdown = ForCondition {
            variable: "$i".to_string(),
            from: build::num(3.0, ""),
            to: build::num(1.0, ""),
            inclusive: true,
        };
        let values = fixture.reducer().for_iterations(&countdown, root).unwrap();
        assert_eq!(
            values,
            vec![Value::number(3.0, ""), Value::number(2.0, ""), Value::number(1.0, "")]
        );
    }

    #[test]
    fn test_for_bounds() {
        let mut fixture = Fixture::new();
        let root = fixture.root;
        let range = |from: f64, to: f64, inclusive: bool| ForCondition {
            variable: "$i".to_string(),
            from: build::num(from, ""),
            to: build::num(to, ""),
            inclusive,
        };

        let values = fixture.reducer().for_iterations(&range(3.0, 1.0, false), root).unwrap();
        assert_eq!(values, vec![Value::number(3.0, ""), Value::number(2.0, "")]);
        let values = fixture.reducer().for_iterations(&range(1.0, 1.0, false), root).unwrap();
        assert!(values.is_empty());

        for (from, to) in [(1.0, 1e19), (-1e30, 0.0), (0.0, f64::INFINITY)] {
            let result = fixture.reducer().for_iterations(&range(from, to, true), root);
            assert!(
                matches!(result, Err(ReduceError::Arithmetic { .. })),
                "{from} through {to} was accepted"
            );
        }
    }

    #[test]
    fn test_missing_return_and_recursion() {
        let mut fixture = Fixture::new();
        fixture.define("nothing", ParameterList::default(), vec![]);
        fixture.define(
            "forever",
            ParameterList::default(),
            vec![build::return_value(build::call("forever", vec![]))],
        );

        let error = fixture.reduce(&build::call("nothing", vec![])).unwrap_err();
        assert_eq!(error.to_string(), "Function nothing finished without @return");

        let error = fixture.reduce(&build::call("forever", vec![])).unwrap_err();
        assert!(matches!(error, ReduceError::RecursionLimit { limit: 64, .. }));
    }

    #[test]
    fn test_invalid_statement_in_function() {
        let mut fixture = Fixture::new();
        fixture.define(
            "styles",
            ParameterList::default(),
            vec![build::decl("color", build::color("red"))],
        );

        let error = fixture.reduce(&build::call("styles", vec![])).unwrap_err();
        assert_eq!(error.to_string(), "color is not allowed in a function body");
    }
}
