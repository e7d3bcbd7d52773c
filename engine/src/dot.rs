// dot.rs — Graphviz DOT output for the node network
//
// Renders every node of the world, one cluster per scope (nested like the
// scope tree), with an edge per connected input labelled by slot name.
//
// Preconditions: none; works on a partially built or cyclic network.
// Postconditions: returns a valid DOT string.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::fmt::Write;

use crate::world::{Member, NodeId, ScopeId, World};

/// Emit the world's node network as a Graphviz DOT string.
pub fn emit_dot(world: &World) -> String {
    let mut buf = String::new();
    writeln!(buf, "digraph lumen {{").unwrap();
    writeln!(buf, "    rankdir=LR;").unwrap();
    writeln!(buf, "    node [fontname=\"Helvetica\", fontsize=10];").unwrap();
    writeln!(buf, "    edge [fontname=\"Helvetica\", fontsize=9];").unwrap();

    write_scope_contents(&mut buf, world, world.root(), "    ");

    let mut edges = Vec::new();
    for id in world.collect_nodes() {
        let Some(node) = world.node(id) else { continue };
        for (slot, spec) in node.delegate.inputs.iter().enumerate() {
            if let Some(source) = node.inputs[slot] {
                edges.push((source, id, spec.name.as_str()));
            }
        }
    }
    if !edges.is_empty() {
        writeln!(buf).unwrap();
        for (source, target, slot) in edges {
            writeln!(
                buf,
                "    {} -> {} [label=\"{}\"];",
                dot_node_id(source),
                dot_node_id(target),
                escape(slot)
            )
            .unwrap();
        }
    }

    writeln!(buf, "}}").unwrap();
    buf
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn write_scope_contents(buf: &mut String, world: &World, scope: ScopeId, indent: &str) {
    let Some(s) = world.scope(scope) else { return };
    for (name, member) in s.members() {
        match member {
            Member::Node(id) => write_node(buf, world, *id, indent),
            Member::Scope(child) => {
                let Some(c) = world.scope(*child) else { continue };
                writeln!(buf).unwrap();
                writeln!(buf, "{indent}subgraph cluster_s{} {{", child.0).unwrap();
                writeln!(
                    buf,
                    "{indent}    label=\"{}: {}\";",
                    escape(&c.delegate.name),
                    escape(name)
                )
                .unwrap();
                writeln!(buf, "{indent}    style=rounded;").unwrap();
                writeln!(buf, "{indent}    color=gray50;").unwrap();
                write_scope_contents(buf, world, *child, &format!("{indent}    "));
                writeln!(buf, "{indent}}}").unwrap();
            }
            Member::NodeDelegate(_) | Member::ScopeDelegate(_) => {}
        }
    }
}

fn write_node(buf: &mut String, world: &World, id: NodeId, indent: &str) {
    let Some(node) = world.node(id) else { return };
    let color = if node.delegate.produces.is_some() {
        "lightblue"
    } else {
        "lightsalmon"
    };
    writeln!(
        buf,
        "{indent}{} [shape=box, style=filled, fillcolor={color}, label=\"{}\\n{}\"];",
        dot_node_id(id),
        escape(&node.name),
        escape(&node.delegate.name)
    )
    .unwrap();
}

fn dot_node_id(id: NodeId) -> String {
    format!("n{}", id.0)
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::registry::Registry;
    use crate::resolve::apply;

    fn emit(source: &str) -> String {
        let mut world = World::new();
        let root = world.root();
        Registry::with_builtins()
            .unwrap()
            .populate(&mut world, root)
            .unwrap();
        let unit = parse(source).unit.expect("parse");
        assert!(apply(&mut world, root, &unit).is_ok());
        emit_dot(&world)
    }

    const TRAIL: &str = "a = window(width=4, height=4, title=\"say \\\"hi\\\"\")\nb = a.mouse-motion\na.display.source = b\n";

    #[test]
    fn valid_dot_structure() {
        let dot = emit(TRAIL);
        assert!(dot.starts_with("digraph lumen {"));
        assert!(dot.trim_end().ends_with('}'));
        assert_eq!(dot.matches('{').count(), dot.matches('}').count());
    }

    #[test]
    fn one_cluster_per_scope() {
        let dot = emit(TRAIL);
        assert_eq!(dot.matches("subgraph cluster_").count(), 1);
        assert!(dot.contains("label=\"window: a\";"));
    }

    #[test]
    fn edges_carry_slot_names() {
        let dot = emit(TRAIL);
        assert!(dot.contains("[label=\"source\"]"));
        assert_eq!(dot.matches(" -> ").count(), 1);
    }

    #[test]
    fn sinks_are_coloured_apart() {
        let dot = emit(TRAIL);
        let display = dot.lines().find(|l| l.contains("display\\ndisplay")).unwrap();
        assert!(display.contains("lightsalmon"));
        let motion = dot.lines().find(|l| l.contains("b\\nmouse-motion")).unwrap();
        assert!(motion.contains("lightblue"));
    }

    #[test]
    fn deterministic_output() {
        assert_eq!(emit(TRAIL), emit(TRAIL));
    }

    #[test]
    fn escape_quotes() {
        assert_eq!(escape("say \"hi\""), "say \\\"hi\\\"");
    }
}
