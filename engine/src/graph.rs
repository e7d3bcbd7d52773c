// graph.rs — Graph construction and per-frame scheduling
//
// Gathers every node in the world, orders them topologically over their
// connected inputs, checks that every mandatory input is connected, and
// sets the nodes up in order. The resulting `Graph` drives the per-frame
// update loop and the final teardown.
//
// Preconditions: statement application succeeded on the world.
// Postconditions: on `Ok`, every node in `order` is set up and each appears
//                 after every node it reads from.
// Failure modes: cycles, unconnected mandatory inputs, incompatible outputs
//                and setup failures (`GraphError`). Nodes already set up are
//                torn down before the error is returned.
// Side effects: runs node setup/update/destroy callbacks.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use tracing::{debug, error};

use crate::profile::Profiler;
use crate::value::OutputKind;
use crate::world::{NodeId, World};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("dependency cycle between {}", .nodes.join(", "))]
    Cycle { nodes: Vec<String> },
    #[error("mandatory input '{slot}' of '{node}' is not connected ({missing} unconnected in total)")]
    Incomplete {
        node: String,
        slot: String,
        missing: usize,
    },
    #[error("input '{slot}' of '{node}' cannot read {found} output")]
    Incompatible {
        node: String,
        slot: String,
        found: OutputKind,
    },
    #[error("setup of '{node}' failed: {reason}")]
    Setup { node: String, reason: String },
}

/// A validated, set-up node network.
#[derive(Debug)]
pub struct Graph {
    order: Vec<NodeId>,
}

impl Graph {
    /// Gather, sort, validate and set up every node of `world`.
    pub fn build(world: &mut World) -> Result<Graph, GraphError> {
        let gathered = world.collect_nodes();
        let order = sort(world, &gathered)?;
        check_complete(world, &order)?;
        setup_all(world, &order)?;
        debug!(nodes = order.len(), "graph built");
        Ok(Graph { order })
    }

    /// Node ids in update order.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Dotted node paths in update order.
    pub fn describe(&self, world: &World) -> Vec<String> {
        self.order.iter().map(|&id| world.node_path(id)).collect()
    }

    /// Run one frame: every node's update, in order.
    pub fn update(&self, world: &mut World) {
        for &id in &self.order {
            world.with_node(id, |node, ctx| {
                if let Some(update) = node.delegate.update {
                    update(node, ctx);
                }
            });
        }
    }

    /// Run one frame, timing each node and the whole frame.
    pub fn update_profiled(&self, world: &mut World, profiler: &mut Profiler) {
        let frame_start = Instant::now();
        for &id in &self.order {
            let start = Instant::now();
            world.with_node(id, |node, ctx| {
                if let Some(update) = node.delegate.update {
                    update(node, ctx);
                }
            });
            profiler.record(id, start.elapsed());
        }
        profiler.record_frame(frame_start.elapsed());
    }

    /// Destroy every node in reverse order and disconnect all inputs.
    /// Nodes stay owned by their scopes.
    pub fn teardown(self, world: &mut World) {
        teardown_nodes(world, &self.order);
        debug!(nodes = self.order.len(), "graph torn down");
    }
}

// ── Sort ────────────────────────────────────────────────────────────────────

/// Kahn's algorithm, FIFO in gather order. Leftover nodes form or feed a
/// cycle and are reported by path.
fn sort(world: &World, gathered: &[NodeId]) -> Result<Vec<NodeId>, GraphError> {
    let position: HashMap<NodeId, usize> = gathered
        .iter()
        .enumerate()
        .map(|(i, &id)| (id, i))
        .collect();
    let mut in_degree = vec![0usize; gathered.len()];
    let mut readers: Vec<Vec<usize>> = vec![Vec::new(); gathered.len()];

    for (i, &id) in gathered.iter().enumerate() {
        let Some(node) = world.node(id) else { continue };
        for source in node.inputs.iter().flatten() {
            if let Some(&src) = position.get(source) {
                in_degree[i] += 1;
                readers[src].push(i);
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..gathered.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(gathered.len());

    while let Some(i) = queue.pop_front() {
        order.push(gathered[i]);
        for &next in &readers[i] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() < gathered.len() {
        let nodes: Vec<String> = (0..gathered.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| world.node_path(gathered[i]))
            .collect();
        error!(nodes = ?nodes, "unresolvable dependency cycle");
        return Err(GraphError::Cycle { nodes });
    }
    Ok(order)
}

// ── Completeness ────────────────────────────────────────────────────────────

fn check_complete(world: &World, order: &[NodeId]) -> Result<(), GraphError> {
    let mut missing: Vec<(String, String)> = Vec::new();
    for &id in order {
        let Some(node) = world.node(id) else { continue };
        for (slot, spec) in node.delegate.inputs.iter().enumerate() {
            if spec.mandatory && node.inputs[slot].is_none() {
                let path = world.node_path(id);
                error!(node = %path, slot = %spec.name, "mandatory input not connected");
                missing.push((path, spec.name.clone()));
            }
        }
    }
    let total = missing.len();
    match missing.into_iter().next() {
        None => Ok(()),
        Some((node, slot)) => Err(GraphError::Incomplete {
            node,
            slot,
            missing: total,
        }),
    }
}

// ── Setup ───────────────────────────────────────────────────────────────────

fn setup_all(world: &mut World, order: &[NodeId]) -> Result<(), GraphError> {
    for (done, &id) in order.iter().enumerate() {
        if let Err(e) = setup_one(world, id) {
            error!(node = %world.node_path(id), "{e}");
            // The failing node itself may have completed its own setup.
            release_nodes(world, &order[..=done]);
            return Err(e);
        }
    }
    Ok(())
}

fn setup_one(world: &mut World, id: NodeId) -> Result<(), GraphError> {
    let path = world.node_path(id);
    let Some(node) = world.node(id) else {
        return Ok(());
    };

    for (slot, spec) in node.delegate.inputs.iter().enumerate() {
        let Some(source) = node.inputs[slot] else { continue };
        let desc = world.node(source).and_then(|s| s.output_desc());
        match desc {
            Some(d) if spec.accepts_kind(d.kind) => {}
            Some(d) => {
                return Err(GraphError::Incompatible {
                    node: path,
                    slot: spec.name.clone(),
                    found: d.kind,
                })
            }
            None => {
                return Err(GraphError::Setup {
                    node: path,
                    reason: format!("input '{}' reads from a node with no output", spec.name),
                })
            }
        }
    }

    let outcome = world.with_node(id, |node, ctx| {
        if let Some(setup) = node.delegate.setup {
            setup(node, ctx)?;
        }
        node.set_up = true;
        match (node.delegate.produces, node.output_desc()) {
            (None, _) => Ok(()),
            (Some(kind), Some(desc)) if desc.kind == kind => Ok(()),
            (Some(kind), Some(desc)) => Err(format!(
                "declared {} output but the delegate produces {}",
                desc.kind, kind
            )),
            (Some(kind), None) => Err(format!("no {kind} output declared")),
        }
    });

    match outcome {
        Some(Err(reason)) => Err(GraphError::Setup { node: path, reason }),
        _ => {
            debug!(node = %path, "node set up");
            Ok(())
        }
    }
}

// ── Teardown ────────────────────────────────────────────────────────────────

fn teardown_nodes(world: &mut World, nodes: &[NodeId]) {
    release_nodes(world, nodes);
    for &id in nodes {
        if let Some(node) = world.node_mut(id) {
            node.disconnect_all();
        }
    }
}

/// Destroy set-up nodes in reverse order, keeping their wiring.
fn release_nodes(world: &mut World, nodes: &[NodeId]) {
    for &id in nodes.iter().rev() {
        let Some(node) = world.node_mut(id) else { continue };
        if node.set_up {
            if let Some(destroy) = node.delegate.destroy {
                destroy(node);
            }
            node.set_up = false;
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
