// delegate.rs — Node and scope delegates
//
// A delegate is the immutable, shared description of a kind of node or
// scope: its name, its input and parameter schema (plain data, introspected
// during statement application) and a table of optional lifecycle callbacks.
// Delegates are registered into scopes and shared by every instance through
// `Rc`; instances never own them.

use std::fmt;
use std::rc::Rc;

use crate::node::{Node, NodeCtx};
use crate::value::{Output, OutputKind, ParamType, ParamValue};
use crate::world::{ScopeId, World};

// ── Lifecycle signatures ──

/// Allocate node state and declare the output shape.
pub type NodeSetupFn = fn(&mut Node, &NodeCtx<'_>) -> Result<(), String>;
/// Recompute node state for the current frame.
pub type NodeUpdateFn = fn(&mut Node, &NodeCtx<'_>);
pub type NodeDestroyFn = fn(&mut Node);
/// Expose already-computed state. Must not recompute.
pub type NodeOutputFn = fn(&Node) -> Option<Output<'_>>;

pub type ScopeSetupFn = fn(&mut World, ScopeId) -> Result<(), String>;
pub type ScopeDestroyFn = fn(&mut World, ScopeId);

// ── Schema ──

/// A named input connection point.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub name: String,
    pub mandatory: bool,
    /// Accepted output kind; `None` accepts any.
    pub accepts: Option<OutputKind>,
}

impl InputSpec {
    pub fn mandatory(name: &str) -> Self {
        InputSpec {
            name: name.to_string(),
            mandatory: true,
            accepts: None,
        }
    }

    pub fn optional(name: &str) -> Self {
        InputSpec {
            name: name.to_string(),
            mandatory: false,
            accepts: None,
        }
    }

    pub fn accepting(mut self, kind: OutputKind) -> Self {
        self.accepts = Some(kind);
        self
    }

    pub fn accepts_kind(&self, kind: OutputKind) -> bool {
        self.accepts.map_or(true, |k| k == kind)
    }
}

/// A named, typed parameter. The type is the type of the default.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub default: ParamValue,
}

impl ParamSpec {
    pub fn new(name: &str, default: ParamValue) -> Self {
        ParamSpec {
            name: name.to_string(),
            default,
        }
    }

    pub fn ty(&self) -> ParamType {
        self.default.ty()
    }
}

fn index_of<T>(items: &[T], name: &str, key: impl Fn(&T) -> &str) -> Option<usize> {
    items.iter().position(|item| key(item) == name)
}

// ── Node delegate ──

pub struct NodeDelegate {
    pub name: String,
    pub inputs: Vec<InputSpec>,
    pub params: Vec<ParamSpec>,
    /// Kind of output this node exposes; `None` for pure sinks.
    pub produces: Option<OutputKind>,
    pub setup: Option<NodeSetupFn>,
    pub update: Option<NodeUpdateFn>,
    pub destroy: Option<NodeDestroyFn>,
    pub output: Option<NodeOutputFn>,
}

impl NodeDelegate {
    pub fn new(name: &str) -> Self {
        NodeDelegate {
            name: name.to_string(),
            inputs: Vec::new(),
            params: Vec::new(),
            produces: None,
            setup: None,
            update: None,
            destroy: None,
            output: None,
        }
    }

    pub fn with_input(mut self, input: InputSpec) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_param(mut self, name: &str, default: ParamValue) -> Self {
        self.params.push(ParamSpec::new(name, default));
        self
    }

    /// Declare the output kind together with the callback exposing it.
    pub fn with_output(mut self, kind: OutputKind, output: NodeOutputFn) -> Self {
        self.produces = Some(kind);
        self.output = Some(output);
        self
    }

    pub fn on_setup(mut self, f: NodeSetupFn) -> Self {
        self.setup = Some(f);
        self
    }

    pub fn on_update(mut self, f: NodeUpdateFn) -> Self {
        self.update = Some(f);
        self
    }

    pub fn on_destroy(mut self, f: NodeDestroyFn) -> Self {
        self.destroy = Some(f);
        self
    }

    pub fn input_index(&self, name: &str) -> Option<usize> {
        index_of(&self.inputs, name, |i| &i.name)
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        index_of(&self.params, name, |p| &p.name)
    }

    pub fn into_shared(self) -> Rc<NodeDelegate> {
        Rc::new(self)
    }
}

impl fmt::Debug for NodeDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeDelegate")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("params", &self.params)
            .field("produces", &self.produces)
            .finish_non_exhaustive()
    }
}

// ── Scope delegate ──

pub struct ScopeDelegate {
    pub name: String,
    pub params: Vec<ParamSpec>,
    pub setup: Option<ScopeSetupFn>,
    pub destroy: Option<ScopeDestroyFn>,
}

impl ScopeDelegate {
    pub fn new(name: &str) -> Self {
        ScopeDelegate {
            name: name.to_string(),
            params: Vec::new(),
            setup: None,
            destroy: None,
        }
    }

    /// The delegate of a world's root scope: no parameters, no callbacks.
    pub fn root() -> Self {
        ScopeDelegate::new("root")
    }

    pub fn with_param(mut self, name: &str, default: ParamValue) -> Self {
        self.params.push(ParamSpec::new(name, default));
        self
    }

    pub fn on_setup(mut self, f: ScopeSetupFn) -> Self {
        self.setup = Some(f);
        self
    }

    pub fn on_destroy(mut self, f: ScopeDestroyFn) -> Self {
        self.destroy = Some(f);
        self
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        index_of(&self.params, name, |p| &p.name)
    }

    pub fn into_shared(self) -> Rc<ScopeDelegate> {
        Rc::new(self)
    }
}

impl fmt::Debug for ScopeDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeDelegate")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
