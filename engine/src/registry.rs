// registry.rs — Delegate registry
//
// Gathers the node delegates, scope delegates and scope-instance delegates
// (built-ins and plugins) available to a script, and populates a scope with
// them before statement application.
//
// Preconditions: none.
// Postconditions: delegate names are unique across all three kinds.
// Failure modes: duplicate names, plugins with parameters (`RegistryError`).
// Side effects: `populate` instantiates scope-instance delegates in the world.

use std::rc::Rc;

use tracing::debug;

use crate::delegate::{NodeDelegate, ScopeDelegate};
use crate::world::{ScopeId, World, WorldError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate delegate '{name}'")]
    DuplicateDelegate { name: String },
    #[error("plugin '{name}' declares {count} parameter(s); plugins take none")]
    PluginParams { name: String, count: usize },
}

/// A registered delegate, by kind.
#[derive(Debug, Clone)]
pub enum Entry {
    Node(Rc<NodeDelegate>),
    Scope(Rc<ScopeDelegate>),
    /// Instantiated once under its own name when a scope is populated.
    Instance(Rc<ScopeDelegate>),
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::Node(d) => &d.name,
            Entry::Scope(d) | Entry::Instance(d) => &d.name,
        }
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    nodes: Vec<Rc<NodeDelegate>>,
    scopes: Vec<Rc<ScopeDelegate>>,
    instances: Vec<Rc<ScopeDelegate>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in delegates.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Registry::new();
        crate::builtins::install(&mut registry)?;
        Ok(registry)
    }

    pub fn add_node(&mut self, delegate: NodeDelegate) -> Result<(), RegistryError> {
        self.ensure_unique(&delegate.name)?;
        debug!(delegate = %delegate.name, "node delegate registered");
        self.nodes.push(delegate.into_shared());
        Ok(())
    }

    pub fn add_scope(&mut self, delegate: ScopeDelegate) -> Result<(), RegistryError> {
        self.ensure_unique(&delegate.name)?;
        debug!(delegate = %delegate.name, "scope delegate registered");
        self.scopes.push(delegate.into_shared());
        Ok(())
    }

    /// Register a plugin's scope delegate. Treated exactly like a built-in
    /// scope-instance delegate; it must have an empty parameter schema.
    pub fn add_plugin(&mut self, delegate: ScopeDelegate) -> Result<(), RegistryError> {
        if !delegate.params.is_empty() {
            return Err(RegistryError::PluginParams {
                name: delegate.name.clone(),
                count: delegate.params.len(),
            });
        }
        self.ensure_unique(&delegate.name)?;
        debug!(plugin = %delegate.name, "plugin registered");
        self.instances.push(delegate.into_shared());
        Ok(())
    }

    fn ensure_unique(&self, name: &str) -> Result<(), RegistryError> {
        if self.lookup(name).is_some() {
            return Err(RegistryError::DuplicateDelegate {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<Entry> {
        self.entries().find(|e| e.name() == name)
    }

    /// All entries: node delegates, then scope delegates, then instances.
    pub fn entries(&self) -> impl Iterator<Item = Entry> + '_ {
        let nodes = self.nodes.iter().cloned().map(Entry::Node);
        let scopes = self.scopes.iter().cloned().map(Entry::Scope);
        let instances = self.instances.iter().cloned().map(Entry::Instance);
        nodes.chain(scopes).chain(instances)
    }

    pub fn len(&self) -> usize {
        self.nodes.len() + self.scopes.len() + self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register every delegate into `scope` and instantiate the instances.
    pub fn populate(&self, world: &mut World, scope: ScopeId) -> Result<(), Vec<WorldError>> {
        world.populate(scope, &self.nodes, &self.scopes, &self.instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ParamValue;
    use crate::world::Member;

    #[test]
    fn names_are_unique_across_kinds() {
        let mut reg = Registry::new();
        reg.add_node(NodeDelegate::new("noise")).unwrap();
        let err = reg.add_scope(ScopeDelegate::new("noise")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateDelegate {
                name: "noise".into()
            }
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn plugins_take_no_params() {
        let mut reg = Registry::new();
        let bad = ScopeDelegate::new("midi").with_param("port", ParamValue::Int(0));
        let err = reg.add_plugin(bad).unwrap_err();
        assert!(matches!(err, RegistryError::PluginParams { count: 1, .. }));
        reg.add_plugin(ScopeDelegate::new("midi")).unwrap();
        assert!(matches!(reg.lookup("midi"), Some(Entry::Instance(_))));
    }

    #[test]
    fn populate_instantiates_plugins() {
        let mut reg = Registry::new();
        reg.add_node(NodeDelegate::new("noise")).unwrap();
        reg.add_plugin(ScopeDelegate::new("midi")).unwrap();
        let mut world = World::new();
        let root = world.root();
        reg.populate(&mut world, root).unwrap();
        assert!(matches!(
            world.resolve(root, &["noise"]).map(|r| r.member),
            Some(Member::NodeDelegate(_))
        ));
        assert!(matches!(
            world.resolve(root, &["midi"]).map(|r| r.member),
            Some(Member::Scope(_))
        ));
    }

    #[test]
    fn builtins_include_window() {
        let reg = Registry::with_builtins().unwrap();
        assert!(matches!(reg.lookup("window"), Some(Entry::Scope(_))));
    }
}
