// world.rs — Arena owning every node and scope
//
// The world replaces process-wide state: it owns the node and scope arenas,
// the root scope and the string table, and is threaded explicitly through
// statement application, graph construction and every delegate callback.
// Arena slots are never reused, so a stale id resolves to `None`.
//
// Preconditions: none.
// Postconditions: every live node and scope is reachable from the root
//                 through exactly one owning member entry.
// Failure modes: name clashes and scope setup failures (`WorldError`).
// Side effects: runs scope setup/destroy and node destroy callbacks.

use std::rc::Rc;

use tracing::debug;

use crate::delegate::{NodeDelegate, ScopeDelegate};
use crate::node::NodeCtx;
use crate::strtab::{Name, StringTable};
use crate::value::ParamValue;

pub use crate::node::{Node, NodeId};
pub use crate::scope::{Member, Scope, ScopeId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("'{name}' is already defined in '{scope}'")]
    AlreadyDefined { name: String, scope: String },
    #[error("setup of scope '{name}' failed: {reason}")]
    ScopeSetup { name: String, reason: String },
}

/// A successful path lookup: the member found and the scope containing it.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub member: Member,
    pub container: ScopeId,
}

pub struct World {
    nodes: Vec<Option<Node>>,
    scopes: Vec<Option<Scope>>,
    root: ScopeId,
    names: StringTable,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        let mut names = StringTable::new();
        let root = Scope::new(
            names.intern("root"),
            ScopeDelegate::root().into_shared(),
            None,
            None,
        );
        World {
            nodes: Vec::new(),
            scopes: vec![Some(root)],
            root: ScopeId(0),
            names,
        }
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn intern(&mut self, text: &str) -> Name {
        self.names.intern(text)
    }

    // ── Arena access ──

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())?.as_ref()
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())?.as_mut()
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.index())?.as_ref()
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        self.scopes.get_mut(id.index())?.as_mut()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.iter().filter(|s| s.is_some()).count()
    }

    /// Detach a node, call `f` with it and a read-only context over the rest
    /// of the world, then put it back.
    pub(crate) fn with_node<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut Node, &NodeCtx<'_>) -> R,
    ) -> Option<R> {
        let mut node = self.nodes.get_mut(id.index())?.take()?;
        let result = {
            let ctx = NodeCtx::new(self);
            f(&mut node, &ctx)
        };
        self.nodes[id.index()] = Some(node);
        Some(result)
    }

    // ── Resolution ──

    /// Resolve a dotted path starting at `scope`.
    ///
    /// Every segment but the last must name a child scope.
    pub fn resolve(&self, scope: ScopeId, path: &[&str]) -> Option<Resolved> {
        let (last, prefix) = path.split_last()?;
        let mut current = scope;
        for segment in prefix {
            match self.scope(current)?.member(segment)? {
                Member::Scope(child) => current = *child,
                _ => return None,
            }
        }
        let member = self.scope(current)?.member(last)?.clone();
        Some(Resolved {
            member,
            container: current,
        })
    }

    /// Resolve a path that must name a scope. The empty path is `scope` itself.
    pub fn resolve_scope(&self, scope: ScopeId, path: &[&str]) -> Option<ScopeId> {
        if path.is_empty() {
            return self.scope(scope).map(|_| scope);
        }
        match self.resolve(scope, path)?.member {
            Member::Scope(id) => Some(id),
            _ => None,
        }
    }

    // ── Population ──

    /// Register delegates as members of `scope`, then instantiate and set up
    /// each scope-instance delegate under its own name.
    ///
    /// Every failure is collected; successful registrations are kept.
    pub fn populate(
        &mut self,
        scope: ScopeId,
        node_delegates: &[Rc<NodeDelegate>],
        scope_delegates: &[Rc<ScopeDelegate>],
        instances: &[Rc<ScopeDelegate>],
    ) -> Result<(), Vec<WorldError>> {
        let mut errors = Vec::new();
        for d in node_delegates {
            let name = self.intern(&d.name);
            if let Err(e) = self.insert_member(scope, name, Member::NodeDelegate(Rc::clone(d))) {
                errors.push(e);
            }
        }
        for d in scope_delegates {
            let name = self.intern(&d.name);
            if let Err(e) = self.insert_member(scope, name, Member::ScopeDelegate(Rc::clone(d))) {
                errors.push(e);
            }
        }
        for d in instances {
            let name = self.intern(&d.name);
            let params = d.params.iter().map(|p| p.default.clone()).collect();
            if let Err(e) = self.instantiate_scope(scope, name, Rc::clone(d), scope, params) {
                errors.push(e);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn insert_member(
        &mut self,
        scope: ScopeId,
        name: Name,
        member: Member,
    ) -> Result<(), WorldError> {
        let scope_name = self.scope_path(scope);
        let Some(target) = self.scope_mut(scope) else {
            return Err(WorldError::AlreadyDefined {
                name: name.to_string(),
                scope: scope_name,
            });
        };
        target
            .insert_member(Rc::clone(&name), member)
            .map_err(|_| WorldError::AlreadyDefined {
                name: name.to_string(),
                scope: scope_name,
            })
    }

    // ── Instantiation ──

    /// Create a node from `delegate` and insert it into `parent` as `name`.
    pub fn instantiate_node(
        &mut self,
        parent: ScopeId,
        name: Name,
        delegate: Rc<NodeDelegate>,
        owner: ScopeId,
        params: Box<[ParamValue]>,
    ) -> Result<NodeId, WorldError> {
        self.ensure_free(parent, &name)?;
        let id = NodeId(self.nodes.len() as u32);
        let mut node = Node::new(Rc::clone(&name), delegate, owner, parent);
        node.params = params;
        self.nodes.push(Some(node));
        self.insert_member(parent, name, Member::Node(id))?;
        debug!(node = %self.node_path(id), "node instantiated");
        Ok(id)
    }

    /// Create a scope from `delegate`, run its setup, and only then insert it
    /// into `parent` as `name`. A failed setup frees whatever it created.
    pub fn instantiate_scope(
        &mut self,
        parent: ScopeId,
        name: Name,
        delegate: Rc<ScopeDelegate>,
        owner: ScopeId,
        params: Box<[ParamValue]>,
    ) -> Result<ScopeId, WorldError> {
        self.ensure_free(parent, &name)?;
        let id = ScopeId(self.scopes.len() as u32);
        let mut scope = Scope::new(Rc::clone(&name), Rc::clone(&delegate), Some(owner), Some(parent));
        scope.params = params;
        self.scopes.push(Some(scope));

        if let Some(setup) = delegate.setup {
            if let Err(reason) = setup(self, id) {
                self.release_scope(id);
                return Err(WorldError::ScopeSetup {
                    name: name.to_string(),
                    reason,
                });
            }
        }
        if let Some(s) = self.scope_mut(id) {
            s.set_up = true;
        }
        self.insert_member(parent, name, Member::Scope(id))?;
        debug!(scope = %self.scope_path(id), delegate = %delegate.name, "scope instantiated");
        Ok(id)
    }

    fn ensure_free(&self, scope: ScopeId, name: &str) -> Result<(), WorldError> {
        match self.scope(scope) {
            Some(s) if !s.contains(name) => Ok(()),
            _ => Err(WorldError::AlreadyDefined {
                name: name.to_string(),
                scope: self.scope_path(scope),
            }),
        }
    }

    // ── Destruction ──

    /// Destroy a scope and everything it owns, then unlink it from its parent.
    pub fn destroy_scope(&mut self, id: ScopeId) {
        let unlink = self
            .scope(id)
            .and_then(|s| s.parent.map(|p| (p, Rc::clone(&s.name))));
        self.release_scope(id);
        if let Some((parent, name)) = unlink {
            if let Some(p) = self.scope_mut(parent) {
                p.remove_member(&name);
            }
        }
    }

    /// Children first, then the scope's own destroy callback, then the slot.
    fn release_scope(&mut self, id: ScopeId) {
        let members = match self.scope_mut(id) {
            Some(s) => s.members.drain(),
            None => return,
        };
        for (_, member) in members {
            match member {
                Member::Node(node) => self.release_node(node),
                Member::Scope(child) => self.release_scope(child),
                Member::NodeDelegate(_) | Member::ScopeDelegate(_) => {}
            }
        }
        let (destroy, set_up) = match self.scope(id) {
            Some(s) => (s.delegate.destroy, s.set_up),
            None => return,
        };
        if set_up {
            if let Some(destroy) = destroy {
                destroy(self, id);
            }
        }
        self.scopes[id.index()] = None;
    }

    fn release_node(&mut self, id: NodeId) {
        let Some(mut node) = self.nodes.get_mut(id.index()).and_then(Option::take) else {
            return;
        };
        if node.set_up {
            if let Some(destroy) = node.delegate.destroy {
                destroy(&mut node);
            }
        }
    }

    /// Destroy everything the root owns. The root itself stays usable.
    pub fn clear(&mut self) {
        let members = match self.scope_mut(self.root) {
            Some(s) => s.members.drain(),
            None => return,
        };
        let mut keep = Vec::new();
        for (name, member) in members {
            match member {
                Member::Node(node) => self.release_node(node),
                Member::Scope(child) => self.release_scope(child),
                shared => keep.push((name, shared)),
            }
        }
        let root = self.root;
        if let Some(r) = self.scope_mut(root) {
            for (name, member) in keep {
                let _ = r.insert_member(name, member);
            }
        }
    }

    // ── Traversal ──

    /// Every node, depth-first from the root in member slot order.
    ///
    /// A child scope's nodes appear at the child's slot position.
    pub fn collect_nodes(&self) -> Vec<NodeId> {
        fn walk(world: &World, scope: ScopeId, out: &mut Vec<NodeId>) {
            let Some(s) = world.scope(scope) else { return };
            for (_, member) in s.members() {
                match member {
                    Member::Node(id) => out.push(*id),
                    Member::Scope(child) => walk(world, *child, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(self, self.root, &mut out);
        out
    }

    /// Dotted path of a scope from the root; the root itself is `""`.
    pub fn scope_path(&self, id: ScopeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(sid) = current {
            let Some(s) = self.scope(sid) else { break };
            if s.parent.is_some() {
                segments.push(s.name.to_string());
            }
            current = s.parent;
        }
        segments.reverse();
        segments.join(".")
    }

    pub fn node_path(&self, id: NodeId) -> String {
        let Some(node) = self.node(id) else {
            return format!("<{id}>");
        };
        let prefix = self.scope_path(node.parent);
        if prefix.is_empty() {
            node.name.to_string()
        } else {
            format!("{prefix}.{}", node.name)
        }
    }
}

impl Drop for World {
    fn drop(&mut self) {
        self.clear();
    }
}
