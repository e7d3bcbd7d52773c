// node.rs — Node records and the update context
//
// A node is one instance of a node delegate: a fixed set of input slots
// (weak `NodeId` edges into the world arena), a fixed set of parameter
// values, the output descriptor declared during setup, and opaque state
// owned by the delegate's callbacks.
//
// Preconditions: `inputs` and `params` are sized from the delegate schema.
// Postconditions: none (record types).
// Failure modes: none.
// Side effects: none.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::delegate::NodeDelegate;
use crate::scope::ScopeId;
use crate::strtab::Name;
use crate::value::{Output, OutputDesc, ParamValue};
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

// ── Node ──

pub struct Node {
    pub name: Name,
    pub delegate: Rc<NodeDelegate>,
    /// Scope that registered the delegate ("which window am I in").
    pub owner: ScopeId,
    /// Scope whose member dictionary holds this node.
    pub parent: ScopeId,
    pub inputs: Box<[Option<NodeId>]>,
    pub params: Box<[ParamValue]>,
    pub(crate) output: Option<OutputDesc>,
    state: Option<Box<dyn Any>>,
    pub(crate) set_up: bool,
}

impl Node {
    /// A fresh, unconnected node with parameters at their schema defaults.
    pub fn new(name: Name, delegate: Rc<NodeDelegate>, owner: ScopeId, parent: ScopeId) -> Self {
        let inputs = vec![None; delegate.inputs.len()].into_boxed_slice();
        let params = delegate.params.iter().map(|p| p.default.clone()).collect();
        Node {
            name,
            delegate,
            owner,
            parent,
            inputs,
            params,
            output: None,
            state: None,
            set_up: false,
        }
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.delegate.param_index(name).map(|i| &self.params[i])
    }

    pub fn input(&self, slot: usize) -> Option<NodeId> {
        self.inputs.get(slot).copied().flatten()
    }

    pub fn input_named(&self, name: &str) -> Option<NodeId> {
        self.delegate.input_index(name).and_then(|i| self.input(i))
    }

    pub fn connect(&mut self, slot: usize, source: NodeId) {
        self.inputs[slot] = Some(source);
    }

    pub fn disconnect_all(&mut self) {
        self.inputs.iter_mut().for_each(|i| *i = None);
    }

    /// Declare the shape of this node's output. Called from setup.
    pub fn declare_output(&mut self, desc: OutputDesc) {
        self.output = Some(desc);
    }

    pub fn output_desc(&self) -> Option<OutputDesc> {
        self.output
    }

    /// Current output, through the delegate's `output` callback.
    pub fn output(&self) -> Option<Output<'_>> {
        self.delegate.output.and_then(|f| f(self))
    }

    pub fn is_set_up(&self) -> bool {
        self.set_up
    }

    pub fn set_state<T: Any>(&mut self, state: T) {
        self.state = Some(Box::new(state));
    }

    pub fn state<T: Any>(&self) -> Option<&T> {
        self.state.as_ref().and_then(|s| s.downcast_ref())
    }

    pub fn state_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.state.as_mut().and_then(|s| s.downcast_mut())
    }

    pub fn clear_state(&mut self) {
        self.state = None;
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("delegate", &self.delegate.name)
            .field("owner", &self.owner)
            .field("parent", &self.parent)
            .field("inputs", &self.inputs)
            .field("params", &self.params)
            .field("output", &self.output)
            .finish()
    }
}

// ── Update context ──

/// Read-only view of the world handed to node setup and update.
///
/// The node being called is detached from the arena for the duration of the
/// call, so it cannot observe itself through the context.
pub struct NodeCtx<'w> {
    world: &'w World,
}

impl<'w> NodeCtx<'w> {
    pub(crate) fn new(world: &'w World) -> Self {
        NodeCtx { world }
    }

    pub fn world(&self) -> &'w World {
        self.world
    }

    /// Output of the node connected to `slot`, if any.
    pub fn input(&self, node: &Node, slot: usize) -> Option<Output<'w>> {
        let source = node.input(slot)?;
        self.world.node(source)?.output()
    }

    pub fn input_named(&self, node: &Node, name: &str) -> Option<Output<'w>> {
        self.input(node, node.delegate.input_index(name)?)
    }

    pub fn scope_state<T: Any>(&self, scope: ScopeId) -> Option<&'w T> {
        self.world.scope(scope)?.state()
    }
}
