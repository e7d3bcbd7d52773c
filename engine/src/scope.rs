// scope.rs — Scope records and members
//
// A scope is a named namespace instantiated from a scope delegate. Its member
// dictionary owns the nodes and child scopes it contains (by arena id) and
// shares the delegates registered into it.
//
// Preconditions: none (types only).
// Postconditions: member names are unique within a scope.
// Failure modes: `insert_member` hands the member back on a name clash.
// Side effects: none.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::delegate::{NodeDelegate, ScopeDelegate};
use crate::dict::Dict;
use crate::node::NodeId;
use crate::strtab::Name;
use crate::value::ParamValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

// ── Member ──

/// An entry in a scope's namespace.
///
/// `Node` and `Scope` are owned by the containing scope; delegates are shared.
#[derive(Debug, Clone)]
pub enum Member {
    Node(NodeId),
    Scope(ScopeId),
    NodeDelegate(Rc<NodeDelegate>),
    ScopeDelegate(Rc<ScopeDelegate>),
}

impl Member {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Member::Node(_) => "node",
            Member::Scope(_) => "scope",
            Member::NodeDelegate(_) => "node type",
            Member::ScopeDelegate(_) => "scope type",
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Member::Node(_) | Member::Scope(_))
    }
}

// ── Scope ──

pub struct Scope {
    pub name: Name,
    pub delegate: Rc<ScopeDelegate>,
    /// Scope whose registration produced this instance; `None` for the root.
    pub owner: Option<ScopeId>,
    pub parent: Option<ScopeId>,
    pub params: Box<[ParamValue]>,
    pub(crate) members: Dict<Member>,
    state: Option<Box<dyn Any>>,
    pub(crate) set_up: bool,
}

impl Scope {
    /// A fresh scope with parameters at their schema defaults.
    pub fn new(
        name: Name,
        delegate: Rc<ScopeDelegate>,
        owner: Option<ScopeId>,
        parent: Option<ScopeId>,
    ) -> Self {
        let params = delegate.params.iter().map(|p| p.default.clone()).collect();
        Scope {
            name,
            delegate,
            owner,
            parent,
            params,
            members: Dict::new(),
            state: None,
            set_up: false,
        }
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// Insert a member. On a name clash the member is handed back unchanged.
    pub fn insert_member(&mut self, name: Name, member: Member) -> Result<(), Member> {
        self.members.insert(name, member)
    }

    pub(crate) fn remove_member(&mut self, name: &str) -> Option<Member> {
        self.members.remove(name)
    }

    /// Members in dictionary slot order.
    pub fn members(&self) -> impl Iterator<Item = (&Name, &Member)> {
        self.members.iter()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.delegate.param_index(name).map(|i| &self.params[i])
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

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.name)
            .field("delegate", &self.delegate.name)
            .field("owner", &self.owner)
            .field("parent", &self.parent)
            .field("params", &self.params)
            .field("members", &self.members.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> Rc<ScopeDelegate> {
        ScopeDelegate::new("window")
            .with_param("width", ParamValue::Int(640))
            .with_param("title", ParamValue::Str("lumen".into()))
            .into_shared()
    }

    #[test]
    fn params_start_at_defaults() {
        let s = Scope::new("a".into(), window(), None, None);
        assert_eq!(s.param("width"), Some(&ParamValue::Int(640)));
        assert_eq!(s.param("height"), None);
    }

    #[test]
    fn member_names_are_unique() {
        let mut s = Scope::new("a".into(), window(), None, None);
        s.insert_member("n".into(), Member::Node(NodeId(0))).unwrap();
        let back = s
            .insert_member("n".into(), Member::Node(NodeId(1)))
            .unwrap_err();
        assert!(matches!(back, Member::Node(NodeId(1))));
        assert!(matches!(s.member("n"), Some(Member::Node(NodeId(0)))));
    }

    #[test]
    fn state_is_typed() {
        let mut s = Scope::new("a".into(), window(), None, None);
        s.set_state(7u32);
        assert_eq!(s.state::<u32>(), Some(&7));
        assert!(s.state::<i64>().is_none());
        *s.state_mut::<u32>().unwrap() += 1;
        assert_eq!(s.state::<u32>(), Some(&8));
    }

    #[test]
    fn delegate_members_are_not_owned() {
        assert!(Member::Scope(ScopeId(1)).is_owned());
        assert!(!Member::ScopeDelegate(window()).is_owned());
    }
}
