use blocks::{BlockId, Workspace};
use interpreter::{Asset, BufferHost};

fn place(ws: &mut Workspace, block_type: &str) -> BlockId {
    let block = ws.instantiate(block_type);
    ws.add_root(block, 0.0, 0.0).expect("root placement")
}

fn add_child(ws: &mut Workspace, parent: BlockId, block_type: &str) -> BlockId {
    let block = ws.instantiate(block_type);
    let id = block.id;
    ws.push_child(parent, block).expect("child placement");
    id
}

#[test]
fn hello_world() {
    let mut ws = Workspace::new();
    place(&mut ws, "print");

    let mut host = BufferHost::new();
    let report = ws.run(&mut host, None);
    assert!(report.succeeded());
    assert_eq!(host.output_text(), "Hello World!");
    assert_eq!(report.program.display, "print(\"Hello World!\");");
}

#[test]
fn repeat_three_times() {
    let mut ws = Workspace::new();
    let repeat = place(&mut ws, "repeat");
    ws.set_literal(repeat, "input1", "3").unwrap();
    let print = add_child(&mut ws, repeat, "print");
    ws.set_literal(print, "input1", "tick").unwrap();

    let mut host = BufferHost::new();
    let report = ws.run(&mut host, None);
    assert_eq!(host.output, vec!["tick", "tick", "tick"]);
    assert_eq!(
        report.program.display,
        "for (let i0 = 0; i0 < 3; i0++) {\n  print(\"tick\");\n}"
    );
}

#[test]
fn reporter_in_print_slot() {
    let mut ws = Workspace::new();
    let print = place(&mut ws, "print");
    let value = ws.instantiate("value");
    ws.insert_reporter(print, "input1", value).unwrap();

    let mut host = BufferHost::new();
    ws.run(&mut host, None);
    assert_eq!(host.output_text(), "5");
}

#[test]
fn empty_containers_still_run() {
    let mut ws = Workspace::new();
    place(&mut ws, "repeat");
    place(&mut ws, "forever");
    place(&mut ws, "print");

    let mut host = BufferHost::new();
    let report = ws.run(&mut host, None);
    assert!(report.succeeded(), "{:?}", report.error);
    assert_eq!(host.output, vec!["Hello World!"]);
    assert!(report.guard_tripped);
}

#[test]
fn nested_repeats_multiply() {
    let mut ws = Workspace::new();
    let outer = place(&mut ws, "repeat");
    ws.set_literal(outer, "input1", "2").unwrap();
    let inner = add_child(&mut ws, outer, "repeat");
    ws.set_literal(inner, "input1", "4").unwrap();
    add_child(&mut ws, inner, "print");

    let mut host = BufferHost::new();
    let report = ws.run(&mut host, None);
    assert_eq!(host.output.len(), 8);
    // 2 outer bodies + 8 inner bodies.
    assert_eq!(report.loop_iterations, 10);
}

#[test]
fn dialogs_reach_the_host() {
    let mut ws = Workspace::new();
    place(&mut ws, "alert");
    place(&mut ws, "confirm");
    place(&mut ws, "prompt");

    let mut host = BufferHost::new().with_confirm_answers([true]).with_prompt_answers(["Ada"]);
    let report = ws.run(&mut host, None);
    assert!(report.succeeded());
    assert_eq!(host.alerts, vec!["Hi!"]);
}

#[test]
fn sprites_draw_from_assets() {
    let mut ws = Workspace::new();
    ws.assets.add(Asset::new("cat.png", vec![1, 2, 3]));
    let sprite = place(&mut ws, "add_sprite");
    ws.set_literal(sprite, "imageinput1", "cat.png").unwrap();

    let mut first = BufferHost::new();
    let mut second = BufferHost::new();
    ws.run(&mut first, Some(9));
    ws.run(&mut second, Some(9));
    assert_eq!(first.draws.len(), 1);
    assert_eq!(first.draws, second.draws);
    assert_eq!(first.draws[0].name, "cat.png");
    assert_eq!(first.draws[0].width, 100.0);
}

#[test]
fn no_canvas_only_warns() {
    let mut ws = Workspace::new();
    ws.assets.add(Asset::new("cat.png", vec![1]));
    let sprite = place(&mut ws, "add_sprite");
    ws.set_literal(sprite, "imageinput1", "cat.png").unwrap();
    place(&mut ws, "print");

    let mut host = BufferHost::new().with_canvas(None);
    let report = ws.run(&mut host, None);
    assert!(report.succeeded());
    assert_eq!(host.warnings, vec!["Canvas not found! Cannot draw sprite."]);
    assert_eq!(host.output, vec!["Hello World!"]);
}

#[test]
fn quotes_in_literals_stay_literal() {
    let mut ws = Workspace::new();
    let print = place(&mut ws, "print");
    ws.set_literal(print, "input1", "say \"hi\"); alert(\"x").unwrap();

    let mut host = BufferHost::new();
    let report = ws.run(&mut host, None);
    assert!(report.succeeded());
    assert_eq!(host.output, vec!["say \"hi\"); alert(\"x"]);
    assert!(host.alerts.is_empty());
}

#[test]
fn snapshot_round_trip_compiles_identically() {
    let mut ws = Workspace::new();
    let forever = place(&mut ws, "forever");
    let repeat = add_child(&mut ws, forever, "repeat");
    let print = add_child(&mut ws, repeat, "print");
    let value = ws.instantiate("value");
    ws.insert_reporter(print, "input1", value).unwrap();

    let json = ws.to_json().unwrap();
    let mut restored = Workspace::new();
    restored.load_json(&json).unwrap();
    assert_eq!(restored.compile(), ws.compile());
}
