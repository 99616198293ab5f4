use interpreter::{Asset, AssetStore, BufferHost, RuntimeValue, Runtime};
use script::expression::{Expression, UnaryOperator};
use script::statement::Statement;

fn run_with(source: &str, host: &mut BufferHost, assets: &AssetStore) -> interpreter::Environment {
    let program = script::Program::parse(source, 0).expect("parse failed");
    let mut runtime = Runtime::new(host, assets).with_seed(7);
    let (env, _) = interpreter::execute_program(&program, &mut runtime).expect("execution failed");
    env
}

fn run(source: &str) -> String {
    let mut host = BufferHost::new();
    run_with(source, &mut host, &AssetStore::new());
    host.output_text()
}

#[test]
fn arithmetic() {
    assert_eq!(run("print(2 + 3);"), "5");
    assert_eq!(run("print(10 - 4);"), "6");
    assert_eq!(run("print(3 * 7);"), "21");
    assert_eq!(run("print(15 / 6);"), "2.5");
    assert_eq!(run("print(10 % 3);"), "1");
}

#[test]
fn operator_precedence() {
    assert_eq!(run("print(2 + 3 * 4);"), "14");
    assert_eq!(run("print((2 + 3) * 4);"), "20");
}

#[test]
fn unary_operators() {
    assert_eq!(run("print(-5 + 10);"), "5");
    assert_eq!(run("print(!false);"), "true");
    assert_eq!(run("print(!\"\");"), "true");
}

#[test]
fn string_concatenation() {
    assert_eq!(run("let n = 3; print(\"n = \" + n);"), "n = 3");
}

#[test]
fn print_joins_arguments_with_spaces() {
    assert_eq!(run("print(\"a\", 1, true);"), "a 1 true");
}

#[test]
fn logical_operators_short_circuit() {
    // `nope` is undefined; evaluating it would fail the run.
    assert_eq!(run("print(false && nope);"), "false");
    assert_eq!(run("print(\"x\" || nope);"), "x");
}

#[test]
fn for_loop_counts() {
    assert_eq!(
        run("for (let i0 = 0; i0 < 3; i0++) { print(i0); }"),
        "0\n1\n2"
    );
}

#[test]
fn loop_variable_is_scoped_to_the_loop() {
    let program = script::Program::parse("for (let i = 0; i < 1; i++) { } print(i);", 0).unwrap();
    let mut host = BufferHost::new();
    let assets = AssetStore::new();
    let mut runtime = Runtime::new(&mut host, &assets);
    let err = interpreter::execute_program(&program, &mut runtime).unwrap_err();
    assert_eq!(err.to_string(), "i is not defined");
}

#[test]
fn while_with_break() {
    let src = "let n = 0;\nwhile (true) {\n  n++;\n  if (n > 4) {\n    break;\n  }\n}\nprint(n);";
    assert_eq!(run(src), "5");
}

#[test]
fn break_only_leaves_innermost_loop() {
    let src = "for (let i0 = 0; i0 < 2; i0++) {\n  while (true) { print(i0); break; }\n}";
    assert_eq!(run(src), "0\n1");
}

#[test]
fn compound_assignment_updates_outer_scope() {
    let mut host = BufferHost::new();
    let env = run_with(
        "let total = 0; for (let i = 1; i <= 4; i++) { total += i; }",
        &mut host,
        &AssetStore::new(),
    );
    assert_eq!(
        env.globals().get_variable("total"),
        Some(&RuntimeValue::Number(10.0))
    );
}

#[test]
fn dialogs_use_scripted_answers() {
    let mut host = BufferHost::new()
        .with_confirm_answers([true])
        .with_prompt_answers(["Ada"]);
    run_with(
        "alert(\"Hi!\");\nif (confirm(\"Go?\")) { print(\"yes\"); }\nprint(\"name: \" + prompt(\"Name?\"));\nprint(prompt(\"Again?\"));",
        &mut host,
        &AssetStore::new(),
    );
    assert_eq!(host.alerts, vec!["Hi!".to_string()]);
    assert_eq!(host.output, vec!["yes", "name: Ada", "undefined"]);
}

#[test]
fn warn_is_collected_as_a_diagnostic() {
    let program = script::Program::parse("warn(\"careful\", 1);", 0).unwrap();
    let mut host = BufferHost::new();
    let assets = AssetStore::new();
    let mut runtime = Runtime::new(&mut host, &assets);
    let (_, warnings) = interpreter::execute_program(&program, &mut runtime).unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].is_warning);
    assert_eq!(warnings[0].to_string(), "careful 1");
    assert_eq!(host.warnings, vec!["careful 1".to_string()]);
}

#[test]
fn draw_sprite_resolves_assets_by_name() {
    let assets: AssetStore = [Asset::new("cat.png", vec![0x89, 0x50])].into_iter().collect();
    let mut host = BufferHost::new();
    run_with("draw_sprite(\"cat.png\");\ndraw_sprite(\"dog.png\");", &mut host, &assets);
    assert_eq!(host.draws.len(), 1);
    assert_eq!(host.draws[0].name, "cat.png");
    assert_eq!(host.draws[0].width, 100.0);
    assert_eq!(host.warnings, vec!["Costume not found: dog.png".to_string()]);
}

#[test]
fn draw_sprite_without_canvas_warns() {
    let assets: AssetStore = [Asset::new("cat.png", vec![])].into_iter().collect();
    let mut host = BufferHost::new().with_canvas(None);
    run_with("draw_sprite(\"cat.png\");", &mut host, &assets);
    assert!(host.draws.is_empty());
    assert_eq!(host.warnings.len(), 1);
}

#[test]
fn runtime_error_carries_span() {
    let source = "print(1);\nexplode();\nprint(2);";
    let program = script::Program::parse(source, 4).unwrap();
    let mut host = BufferHost::new();
    let assets = AssetStore::new();
    let mut runtime = Runtime::new(&mut host, &assets);
    let err = interpreter::execute_program(&program, &mut runtime).unwrap_err();
    assert_eq!(err.to_string(), "explode is not a function");
    assert_eq!(err.source_id, 4);
    assert_eq!(err.span, Some(10..19));
    // Side effects before the fault are kept.
    assert_eq!(host.output, vec!["1".to_string()]);
}

#[test]
fn break_outside_loop_is_an_error() {
    let program = script::Program::parse("break;", 0).unwrap();
    let mut host = BufferHost::new();
    let assets = AssetStore::new();
    let mut runtime = Runtime::new(&mut host, &assets);
    let err = interpreter::execute_program(&program, &mut runtime).unwrap_err();
    assert!(matches!(err.error, interpreter::RuntimeError::BreakOutsideLoop));
}

#[test]
fn deep_nesting_is_reported_not_crashed() {
    let mut statement = Statement::Block {
        statements: Vec::new(),
        span: 0..0,
    };
    for _ in 0..200 {
        statement = Statement::Block {
            statements: vec![statement],
            span: 0..0,
        };
    }
    let program = script::Program {
        statements: vec![statement],
        source_id: 0,
    };
    let mut host = BufferHost::new();
    let assets = AssetStore::new();
    let mut runtime = Runtime::new(&mut host, &assets);
    let err = interpreter::execute_program(&program, &mut runtime).unwrap_err();
    assert!(matches!(err.error, interpreter::RuntimeError::StackOverflow));
}

#[test]
fn nesting_within_the_parser_limit_runs() {
    let source = format!("{}print(\"deep\");{}", "{ ".repeat(40), " }".repeat(40));
    assert_eq!(run(&source), "deep");
}

#[test]
fn for_header_errors_carry_the_loop_span() {
    let mut condition = Expression::BooleanLiteral(true);
    for _ in 0..100 {
        condition = Expression::UnaryOperation {
            operator: UnaryOperator::LogicalNot,
            operand: Box::new(condition),
        };
    }
    let program = script::Program {
        statements: vec![Statement::For {
            init: None,
            condition: Some(condition),
            update: None,
            body: Vec::new(),
            span: 4..30,
        }],
        source_id: 2,
    };
    let mut host = BufferHost::new();
    let assets = AssetStore::new();
    let mut runtime = Runtime::new(&mut host, &assets);
    let err = interpreter::execute_program(&program, &mut runtime).unwrap_err();
    assert!(matches!(err.error, interpreter::RuntimeError::StackOverflow));
    assert_eq!(err.span, Some(4..30));
    assert_eq!(err.source_id, 2);
}

#[test]
fn failed_run_keeps_environment_and_warnings() {
    let program = script::Program::parse("let n = 2; warn(\"careful\"); n = n + missing;", 0).unwrap();
    let mut host = BufferHost::new();
    let assets = AssetStore::new();
    let mut runtime = Runtime::new(&mut host, &assets);
    let mut env = interpreter::Environment::new();
    let mut warnings = Vec::new();
    let err = interpreter::execute_into(&program, &mut runtime, &mut env, &mut warnings).unwrap_err();
    assert_eq!(err.to_string(), "missing is not defined");
    assert_eq!(env.get_variable("n"), Some(&RuntimeValue::Number(2.0)));
    assert_eq!(warnings.len(), 1);
}
