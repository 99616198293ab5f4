use std::ops::Range;

use tracing::{debug, warn};

use crate::error::{DiagnosticError, RuntimeError};
use crate::executor::ExecContext;
use crate::host::SpriteDraw;
use crate::runtime::SPRITE_SIZE;
use crate::runtime_value::RuntimeValue;

/// Dispatch a call to a host builtin. Missing arguments read as `undefined`.
pub fn call(
    function: &str,
    arguments: Vec<RuntimeValue>,
    ctx: &mut ExecContext<'_, '_>,
    span: &Range<usize>,
) -> Result<RuntimeValue, DiagnosticError> {
    let first = arguments.first().cloned().unwrap_or(RuntimeValue::Undefined);

    match function {
        "print" => {
            ctx.runtime
                .host
                .print(&join(&arguments))
                .map_err(RuntimeError::from)?;
            Ok(RuntimeValue::Undefined)
        }
        "alert" => {
            ctx.runtime
                .host
                .alert(&first.to_string())
                .map_err(RuntimeError::from)?;
            Ok(RuntimeValue::Undefined)
        }
        "confirm" => {
            let answer = ctx
                .runtime
                .host
                .confirm(&first.to_string())
                .map_err(RuntimeError::from)?;
            Ok(RuntimeValue::Boolean(answer))
        }
        "prompt" => {
            let answer = ctx
                .runtime
                .host
                .prompt(&first.to_string())
                .map_err(RuntimeError::from)?;
            Ok(answer.map_or(RuntimeValue::Undefined, RuntimeValue::String))
        }
        "warn" => {
            emit_warning(ctx, join(&arguments), span);
            Ok(RuntimeValue::Undefined)
        }
        "draw_sprite" => {
            draw_sprite(&first.to_string(), ctx, span);
            Ok(RuntimeValue::Undefined)
        }
        _ => Err(RuntimeError::UndefinedFunction(function.to_string()).into()),
    }
}

/// Join arguments the way a console does: space separated, each displayed.
fn join(arguments: &[RuntimeValue]) -> String {
    arguments
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn emit_warning(ctx: &mut ExecContext<'_, '_>, message: String, span: &Range<usize>) {
    warn!(target: "interpreter", "{}", message);
    ctx.runtime.host.warn(&message);
    ctx.diagnostics
        .push(DiagnosticError::warning(message, span.clone(), ctx.source_id));
}

/// Resolve `name` in the asset store and draw it at a random spot on the
/// canvas. Missing assets and missing canvases only warn.
fn draw_sprite(name: &str, ctx: &mut ExecContext<'_, '_>, span: &Range<usize>) {
    if ctx.runtime.assets.get(name).is_none() {
        emit_warning(ctx, format!("Costume not found: {}", name), span);
        return;
    }
    let Some((width, height)) = ctx.runtime.host.canvas_size() else {
        emit_warning(ctx, "Canvas not found! Cannot draw sprite.".to_string(), span);
        return;
    };

    let (x, y) = ctx.runtime.sprite_position(width, height);
    debug!(target: "interpreter", sprite = name, x, y, "drawing sprite");
    ctx.runtime.host.draw_sprite(SpriteDraw {
        name: name.to_string(),
        x,
        y,
        width: SPRITE_SIZE,
        height: SPRITE_SIZE,
    });
}
