use std::cmp::Ordering;

use script::expression::{BinaryOperator, Expression, UnaryOperator};

use crate::builtins;
use crate::error::{DiagnosticError, RuntimeError};
use crate::executor::{ExecContext, MAX_DEPTH};
use crate::runtime_value::RuntimeValue;

/// Evaluate an expression to produce a RuntimeValue.
pub fn evaluate(
    expression: &Expression,
    ctx: &mut ExecContext<'_, '_>,
    depth: usize,
) -> Result<RuntimeValue, DiagnosticError> {
    if depth > MAX_DEPTH {
        return Err(RuntimeError::StackOverflow.into());
    }

    match expression {
        Expression::NumberLiteral(n) => Ok(RuntimeValue::Number(*n)),
        Expression::StringLiteral(s) => Ok(RuntimeValue::String(s.clone())),
        Expression::BooleanLiteral(b) => Ok(RuntimeValue::Boolean(*b)),

        Expression::Variable(name, span) => ctx.env.get_variable(name).cloned().ok_or_else(|| {
            DiagnosticError::from(RuntimeError::UndefinedVariable(name.clone()))
                .at(span, ctx.source_id)
        }),

        Expression::Call {
            function,
            arguments,
            span,
        } => {
            let mut values = Vec::with_capacity(arguments.len());
            for argument in arguments {
                values.push(evaluate(argument, ctx, depth + 1)?);
            }
            builtins::call(function, values, ctx, span)
                .map_err(|e| e.at(span, ctx.source_id))
        }

        Expression::UnaryOperation { operator, operand } => {
            let value = evaluate(operand, ctx, depth + 1)?;
            Ok(match operator {
                UnaryOperator::Negation => RuntimeValue::Number(-value.to_number()),
                UnaryOperator::LogicalNot => RuntimeValue::Boolean(!value.is_truthy()),
            })
        }

        Expression::BinaryOperation {
            operator,
            left,
            right,
            ..
        } => {
            let l = evaluate(left, ctx, depth + 1)?;
            // Short-circuit: the right operand is only evaluated when needed,
            // and the deciding operand itself is the result.
            match operator {
                BinaryOperator::LogicalAnd if !l.is_truthy() => return Ok(l),
                BinaryOperator::LogicalOr if l.is_truthy() => return Ok(l),
                BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr => {
                    return evaluate(right, ctx, depth + 1);
                }
                _ => {}
            }
            let r = evaluate(right, ctx, depth + 1)?;
            Ok(eval_binary_op(*operator, &l, &r))
        }
    }
}

/// Apply a non-short-circuiting binary operator.
pub fn eval_binary_op(op: BinaryOperator, l: &RuntimeValue, r: &RuntimeValue) -> RuntimeValue {
    match op {
        BinaryOperator::Addition => match (l, r) {
            (RuntimeValue::String(_), _) | (_, RuntimeValue::String(_)) => {
                RuntimeValue::String(format!("{}{}", l, r))
            }
            _ => RuntimeValue::Number(l.to_number() + r.to_number()),
        },
        BinaryOperator::Subtraction => RuntimeValue::Number(l.to_number() - r.to_number()),
        BinaryOperator::Multiplication => RuntimeValue::Number(l.to_number() * r.to_number()),
        BinaryOperator::Division => RuntimeValue::Number(l.to_number() / r.to_number()),
        BinaryOperator::Modulo => RuntimeValue::Number(l.to_number() % r.to_number()),
        BinaryOperator::Equality => RuntimeValue::Boolean(l == r),
        BinaryOperator::Inequality => RuntimeValue::Boolean(l != r),
        BinaryOperator::GreaterThan => compare(l, r, Ordering::is_gt),
        BinaryOperator::LessThan => compare(l, r, Ordering::is_lt),
        BinaryOperator::GreaterThanOrEqual => compare(l, r, Ordering::is_ge),
        BinaryOperator::LessThanOrEqual => compare(l, r, Ordering::is_le),
        // Handled with short-circuiting in `evaluate`.
        BinaryOperator::LogicalAnd => {
            if l.is_truthy() { r.clone() } else { l.clone() }
        }
        BinaryOperator::LogicalOr => {
            if l.is_truthy() { l.clone() } else { r.clone() }
        }
    }
}

/// Strings compare lexically with each other; everything else compares
/// numerically, and any comparison involving NaN is false.
fn compare(l: &RuntimeValue, r: &RuntimeValue, test: fn(Ordering) -> bool) -> RuntimeValue {
    let ordering = match (l, r) {
        (RuntimeValue::String(a), RuntimeValue::String(b)) => Some(a.cmp(b)),
        _ => l.to_number().partial_cmp(&r.to_number()),
    };
    RuntimeValue::Boolean(ordering.is_some_and(test))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> RuntimeValue {
        RuntimeValue::Number(n)
    }

    fn text(s: &str) -> RuntimeValue {
        RuntimeValue::String(s.to_string())
    }

    #[test]
    fn addition_concatenates_with_strings() {
        assert_eq!(eval_binary_op(BinaryOperator::Addition, &text("n="), &num(3.0)), text("n=3"));
        assert_eq!(eval_binary_op(BinaryOperator::Addition, &num(2.0), &num(3.0)), num(5.0));
    }

    #[test]
    fn comparisons_coerce_to_numbers() {
        assert_eq!(
            eval_binary_op(BinaryOperator::LessThan, &num(2.0), &text("10")),
            RuntimeValue::Boolean(true)
        );
        assert_eq!(
            eval_binary_op(BinaryOperator::LessThan, &text("2"), &text("10")),
            RuntimeValue::Boolean(false)
        );
        assert_eq!(
            eval_binary_op(BinaryOperator::GreaterThan, &num(f64::NAN), &num(1.0)),
            RuntimeValue::Boolean(false)
        );
    }

    #[test]
    fn equality_is_strict() {
        assert_eq!(
            eval_binary_op(BinaryOperator::Equality, &num(5.0), &text("5")),
            RuntimeValue::Boolean(false)
        );
    }

    #[test]
    fn division_by_zero_is_infinite() {
        assert_eq!(
            eval_binary_op(BinaryOperator::Division, &num(1.0), &num(0.0)),
            num(f64::INFINITY)
        );
    }
}
