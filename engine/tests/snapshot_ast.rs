// Snapshot tests: lock the canonical script printer and diagnostic rendering.
//
// Uses the library API (parse → apply) and snapshots the Display output
// inline. Run `cargo insta review` after intentional output changes.

use lumen::registry::Registry;
use lumen::world::World;

fn canonical(source: &str) -> String {
    let result = lumen::parser::parse(source);
    assert!(result.errors.is_empty(), "parse errors: {:#?}", result.errors);
    result.unit.expect("unit").to_string().trim_end().to_string()
}

fn diagnostics(source: &str) -> String {
    let unit = lumen::parser::parse(source).unit.expect("unit");
    let mut world = World::new();
    let root = world.root();
    Registry::with_builtins()
        .expect("builtins")
        .populate(&mut world, root)
        .expect("populate");
    let applied = lumen::resolve::apply(&mut world, root, &unit);
    applied
        .diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn mouse_trail_script() {
    let printed = canonical(
        "a = window( width = 64,height=48 )  // main window\n\
         b=a.mouse-motion\n\
         a.display.source=b\n",
    );
    insta::assert_snapshot!(printed, @r"
    a = window(width=64, height=48)
    b = a.mouse-motion
    a.display.source = b
    ");
}

#[test]
fn literals_print_canonically() {
    let printed = canonical(
        "t = text(s=\"say \\\"hi\\\"\\n\", on=true, mask=0x1F, gain=2.50, n=0)",
    );
    insta::assert_snapshot!(printed, @r#"t = text(s="say \"hi\"\n", on=true, mask=31, gain=2.5, n=0)"#);
}

#[test]
fn comments_and_blank_lines_vanish() {
    let printed = canonical(
        "/* header\n   block */\n\nw = window()\n\n// trailing\nm = w.mouse-motion(decay=0.5)\n",
    );
    insta::assert_snapshot!(printed, @r"
    w = window()
    m = w.mouse-motion(decay=0.5)
    ");
}

#[test]
fn semantic_diagnostics() {
    let rendered = diagnostics(
        "a = window(width=32, height=32)\n\
         b = a.mouse-motion\n\
         c = nowhere()\n\
         b = a.mouse-motion\n\
         a.display.nope = b\n",
    );
    insta::assert_snapshot!(rendered, @r"
    line 3: error[E0200]: unresolved name 'nowhere'
    line 4: error[E0201]: 'b' is already defined
    line 5: error[E0206]: 'display' has no input 'nope'
      hint: inputs are: source
    ");
}
