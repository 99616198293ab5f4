use script::Program;
use script::statement::{AssignmentKind, Statement};
use tracing::{debug, trace};

use crate::environment::Environment;
use crate::error::{DiagnosticError, RuntimeError};
use crate::evaluator::{eval_binary_op, evaluate};
use crate::runtime::Runtime;
use crate::runtime_value::RuntimeValue;

/// Maximum statement/expression nesting before the interpreter gives up.
pub const MAX_DEPTH: usize = 64;

/// Everything a statement or expression needs while executing.
pub struct ExecContext<'r, 'a> {
    pub env: Environment,
    pub runtime: &'r mut Runtime<'a>,
    pub diagnostics: Vec<DiagnosticError>,
    pub source_id: usize,
}

/// How control leaves a statement.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Flow {
    Normal,
    Break,
}

/// Execute a whole program. On success returns the final environment (its
/// global scope holds top-level variables) and the warnings raised.
pub fn execute_program(
    program: &Program,
    runtime: &mut Runtime<'_>,
) -> Result<(Environment, Vec<DiagnosticError>), DiagnosticError> {
    let mut env = Environment::new();
    let mut diagnostics = Vec::new();
    execute_into(program, runtime, &mut env, &mut diagnostics)?;
    Ok((env, diagnostics))
}

/// Execute a program against a caller-owned environment. The environment and
/// the warnings raised so far are left in place even when execution fails,
/// so callers can inspect the state a failed run reached.
pub fn execute_into(
    program: &Program,
    runtime: &mut Runtime<'_>,
    env: &mut Environment,
    diagnostics: &mut Vec<DiagnosticError>,
) -> Result<(), DiagnosticError> {
    let mut ctx = ExecContext {
        env: std::mem::take(env),
        runtime,
        diagnostics: std::mem::take(diagnostics),
        source_id: program.source_id,
    };

    debug!(target: "interpreter", statements = program.statements.len(), "executing program");
    let result = execute_top_level(program, &mut ctx);
    *env = ctx.env;
    *diagnostics = ctx.diagnostics;
    result
}

fn execute_top_level(program: &Program, ctx: &mut ExecContext<'_, '_>) -> Result<(), DiagnosticError> {
    for statement in &program.statements {
        if execute_statement(statement, ctx, 0)? == Flow::Break {
            let mut err = DiagnosticError::from(RuntimeError::BreakOutsideLoop);
            err.span = Some(statement.span().clone());
            err.source_id = program.source_id;
            return Err(err);
        }
    }
    Ok(())
}

fn execute_statement(
    statement: &Statement,
    ctx: &mut ExecContext<'_, '_>,
    depth: usize,
) -> Result<Flow, DiagnosticError> {
    if depth > MAX_DEPTH {
        let mut err = DiagnosticError::from(RuntimeError::StackOverflow);
        err.span = Some(statement.span().clone());
        err.source_id = ctx.source_id;
        return Err(err);
    }

    let span = statement.span();
    let source_id = ctx.source_id;

    match statement {
        Statement::Let {
            variable, value, ..
        } => {
            let value = evaluate(value, ctx, depth + 1).map_err(|e| e.at(span, source_id))?;
            ctx.env.declare(variable, value);
            Ok(Flow::Normal)
        }

        Statement::Assignment {
            variable,
            kind,
            value,
            ..
        } => {
            let value = evaluate(value, ctx, depth + 1).map_err(|e| e.at(span, source_id))?;
            let value = match kind {
                AssignmentKind::Replace => value,
                AssignmentKind::Add => {
                    let current = read(ctx, variable).map_err(|e| e.at(span, source_id))?;
                    eval_binary_op(script::expression::BinaryOperator::Addition, &current, &value)
                }
            };
            ctx.env
                .assign(variable, value)
                .map_err(|e| DiagnosticError::from(e).at(span, source_id))?;
            Ok(Flow::Normal)
        }

        Statement::Increment { variable, .. } => {
            let current = read(ctx, variable).map_err(|e| e.at(span, source_id))?;
            ctx.env
                .assign(variable, RuntimeValue::Number(current.to_number() + 1.0))
                .map_err(|e| DiagnosticError::from(e).at(span, source_id))?;
            Ok(Flow::Normal)
        }

        Statement::Expression { value, .. } => {
            evaluate(value, ctx, depth + 1).map_err(|e| e.at(span, source_id))?;
            Ok(Flow::Normal)
        }

        Statement::If {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            let condition = evaluate(condition, ctx, depth + 1).map_err(|e| e.at(span, source_id))?;
            if condition.is_truthy() {
                execute_scoped(then_branch, ctx, depth + 1)
            } else if let Some(else_branch) = else_branch {
                execute_scoped(else_branch, ctx, depth + 1)
            } else {
                Ok(Flow::Normal)
            }
        }

        Statement::While {
            condition, body, ..
        } => {
            loop {
                let test = evaluate(condition, ctx, depth + 1).map_err(|e| e.at(span, source_id))?;
                if !test.is_truthy() {
                    break;
                }
                if execute_scoped(body, ctx, depth + 1)? == Flow::Break {
                    trace!(target: "interpreter", "while loop broke out");
                    break;
                }
            }
            Ok(Flow::Normal)
        }

        Statement::For {
            init,
            condition,
            update,
            body,
            ..
        } => {
            ctx.env.push_scope();
            let result = execute_for(init.as_deref(), condition.as_ref(), update.as_deref(), body, ctx, depth);
            ctx.env.pop_scope();
            result.map_err(|e| e.at(span, source_id))
        }

        Statement::Break { .. } => Ok(Flow::Break),

        Statement::Block { statements, .. } => execute_scoped(statements, ctx, depth + 1),
    }
}

/// Body of a `for` statement; the caller owns the header scope.
fn execute_for(
    init: Option<&Statement>,
    condition: Option<&script::expression::Expression>,
    update: Option<&Statement>,
    body: &[Statement],
    ctx: &mut ExecContext<'_, '_>,
    depth: usize,
) -> Result<Flow, DiagnosticError> {
    if let Some(init) = init {
        execute_statement(init, ctx, depth + 1)?;
    }
    loop {
        if let Some(condition) = condition {
            if !evaluate(condition, ctx, depth + 1)?.is_truthy() {
                break;
            }
        }
        if execute_scoped(body, ctx, depth + 1)? == Flow::Break {
            trace!(target: "interpreter", "for loop broke out");
            break;
        }
        if let Some(update) = update {
            execute_statement(update, ctx, depth + 1)?;
        }
    }
    Ok(Flow::Normal)
}

/// Run statements in a fresh scope, stopping at the first `break`.
fn execute_scoped(
    statements: &[Statement],
    ctx: &mut ExecContext<'_, '_>,
    depth: usize,
) -> Result<Flow, DiagnosticError> {
    ctx.env.push_scope();
    let mut flow = Ok(Flow::Normal);
    for statement in statements {
        flow = execute_statement(statement, ctx, depth);
        if !matches!(flow, Ok(Flow::Normal)) {
            break;
        }
    }
    ctx.env.pop_scope();
    flow
}

fn read(ctx: &ExecContext<'_, '_>, variable: &str) -> Result<RuntimeValue, DiagnosticError> {
    ctx.env
        .get_variable(variable)
        .cloned()
        .ok_or_else(|| RuntimeError::UndefinedVariable(variable.to_string()).into())
}
