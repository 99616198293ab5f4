use interpreter::{DiagnosticError, Environment, Runtime, RuntimeError, RuntimeValue};
use tracing::{error, info, warn};

use crate::codegen::{LOOP_GUARD_LIMIT, LOOP_GUARD_VARIABLE, loop_guard_prelude};
use crate::compiler::compile;
use crate::registry::Registry;
use crate::tree::BlockInstance;

/// Source id the generated program is parsed and reported under.
pub const PROGRAM_SOURCE_ID: usize = 0;

/// A whole workspace compiled into one unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    /// Prelude plus every root's executable fragment.
    pub executable: String,
    /// Every root's display fragment.
    pub display: String,
}

/// What happened during one run. Execution faults are captured here rather
/// than returned, since a failed run still has a display text and any side
/// effects it made before failing.
#[derive(Debug)]
pub struct RunReport {
    pub program: Program,
    pub warnings: Vec<DiagnosticError>,
    pub error: Option<DiagnosticError>,
    /// Loop bodies entered, summed over every loop in every root.
    pub loop_iterations: u64,
    pub guard_tripped: bool,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Compile every root at depth 0 and join them in order behind the shared
/// loop-guard prelude.
pub fn assemble<'b>(
    roots: impl IntoIterator<Item = &'b BlockInstance>,
    registry: &Registry,
) -> Program {
    let mut executable = vec![loop_guard_prelude()];
    let mut display = Vec::new();

    for root in roots {
        let fragment = compile(root, 0, registry);
        if fragment.is_empty() {
            continue;
        }
        executable.push(fragment.executable);
        display.push(fragment.display);
    }

    Program {
        executable: executable.join("\n"),
        display: display.join("\n"),
    }
}

/// Compile and execute the roots as a single program.
pub fn run<'b>(
    roots: impl IntoIterator<Item = &'b BlockInstance>,
    registry: &Registry,
    runtime: &mut Runtime<'_>,
) -> RunReport {
    let program = assemble(roots, registry);
    runtime.host.clear_canvas();

    let mut env = Environment::new();
    let mut warnings = Vec::new();
    let result = match script::Program::parse(&program.executable, PROGRAM_SOURCE_ID) {
        Ok(parsed) => interpreter::execute_into(&parsed, runtime, &mut env, &mut warnings),
        Err(errors) => Err(parse_failure(&errors)),
    };

    let error = match result {
        Ok(()) => None,
        Err(err) => {
            error!(target: "blocks", error = %err, "program execution failed");
            Some(err)
        }
    };

    let loop_iterations = match env.globals().get_variable(LOOP_GUARD_VARIABLE) {
        Some(RuntimeValue::Number(n)) if *n > 0.0 => *n as u64,
        _ => 0,
    };
    let guard_tripped = loop_iterations > LOOP_GUARD_LIMIT;
    if guard_tripped {
        warn!(
            target: "blocks",
            limit = LOOP_GUARD_LIMIT,
            "loop guard stopped the program's loops early"
        );
    }

    info!(
        target: "blocks",
        loop_iterations,
        warnings = warnings.len(),
        failed = error.is_some(),
        "run finished"
    );

    RunReport {
        program,
        warnings,
        error,
        loop_iterations,
        guard_tripped,
    }
}

/// Generated text that fails to parse is a compiler bug; report the first
/// error the way runtime faults are reported.
fn parse_failure(errors: &[script::parser::ParseError]) -> DiagnosticError {
    let message = errors
        .first()
        .map(|e| format!("generated program does not parse: {}", e))
        .unwrap_or_else(|| "generated program does not parse".to_string());
    let mut err = DiagnosticError::from(RuntimeError::Custom(message));
    err.span = errors.first().map(|e| e.span.clone());
    err.source_id = PROGRAM_SOURCE_ID;
    err
}
