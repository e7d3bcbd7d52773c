// resolve.rs — Statement application
//
// Applies a parsed `Unit` to a scope of the world: instantiation statements
// first, then connection statements, each pass in source order. Every
// problem becomes a coded diagnostic and application continues with the next
// statement.
//
// Preconditions: `unit` is a parser output; `scope` has been populated with
//                the delegates the script refers to.
// Postconditions: every statement without diagnostics has taken effect.
// Failure modes: unresolved paths, duplicate names, parameter and wiring
//                errors produce `Diagnostic` entries.
// Side effects: creates nodes and scopes in the world (scope setup runs).

use std::collections::HashMap;

use tracing::debug;

use crate::ast::*;
use crate::delegate::ParamSpec;
use crate::diag::{codes, DiagCode, Diagnostic};
use crate::value::ParamValue;
use crate::world::{Member, NodeId, ScopeId, World, WorldError};

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ApplyResult {
    pub diagnostics: Vec<Diagnostic>,
    pub nodes_created: usize,
    pub scopes_created: usize,
    pub connections: usize,
}

impl ApplyResult {
    pub fn is_ok(&self) -> bool {
        crate::diag::error_count(&self.diagnostics) == 0
    }
}

/// Apply every statement of `unit` to `scope`.
pub fn apply(world: &mut World, scope: ScopeId, unit: &Unit) -> ApplyResult {
    let mut applier = Applier {
        world,
        scope,
        result: ApplyResult::default(),
        defined: HashMap::new(),
    };

    for stmt in &unit.statements {
        if let Some(inst) = as_instantiation(stmt) {
            applier.instantiate(stmt, inst);
        }
    }
    for stmt in &unit.statements {
        if let StatementKind::Connect(conn) = &stmt.kind {
            if conn.target.segments.len() > 1 {
                applier.connect(stmt, conn);
            }
        }
    }

    applier.result
}

/// Borrowed view of a statement that creates a member.
struct InstantiationRef<'a> {
    target: &'a Path,
    source: &'a Path,
    params: &'a [ParamAssign],
}

/// A statement with a parameter list, or one whose destination is a single
/// name, instantiates (`b = a.mouse-motion`).
fn as_instantiation(stmt: &Statement) -> Option<InstantiationRef<'_>> {
    match &stmt.kind {
        StatementKind::Instantiate(i) => Some(InstantiationRef {
            target: &i.target,
            source: &i.source,
            params: &i.params,
        }),
        StatementKind::Connect(c) if c.target.segments.len() == 1 => Some(InstantiationRef {
            target: &c.target,
            source: &c.source,
            params: &[],
        }),
        StatementKind::Connect(_) => None,
    }
}

// ── Applier ─────────────────────────────────────────────────────────────────

struct Applier<'w> {
    world: &'w mut World,
    scope: ScopeId,
    result: ApplyResult,
    /// First definition of each destination path, for related spans.
    defined: HashMap<String, Span>,
}

impl Applier<'_> {
    fn error(
        &mut self,
        stmt: &Statement,
        span: Span,
        code: DiagCode,
        message: String,
    ) -> &mut Diagnostic {
        self.push(stmt, Diagnostic::error(span, message).with_code(code))
    }

    fn push(&mut self, stmt: &Statement, diag: Diagnostic) -> &mut Diagnostic {
        self.result.diagnostics.push(diag.with_line(stmt.line));
        let last = self.result.diagnostics.len() - 1;
        &mut self.result.diagnostics[last]
    }

    // ── Pass 1: instantiations ──────────────────────────────────────────

    fn instantiate(&mut self, stmt: &Statement, inst: InstantiationRef<'_>) {
        let source_names = inst.source.names();
        let Some(resolved) = self.world.resolve(self.scope, &source_names) else {
            self.error(
                stmt,
                inst.source.span,
                codes::E0200,
                format!("unresolved name '{}'", inst.source),
            );
            return;
        };

        let prefix: Vec<&str> = inst.target.prefix().iter().map(|s| s.name.as_str()).collect();
        let Some(dest) = self.world.resolve_scope(self.scope, &prefix) else {
            self.error(
                stmt,
                inst.target.span,
                codes::E0210,
                format!("'{}' is not inside a scope", inst.target),
            );
            return;
        };

        let target_key = inst.target.to_string();
        let name = &inst.target.last().name;
        let taken = self.world.scope(dest).is_some_and(|s| s.contains(name));
        if taken {
            let first = self.defined.get(&target_key).copied();
            let message = format!("'{}' is already defined", inst.target);
            let diag = Diagnostic::error(inst.target.span, message).with_code(codes::E0201);
            let diag = match first {
                Some(span) => diag.with_related(span, "first defined here"),
                None => diag,
            };
            self.push(stmt, diag);
            return;
        }

        let created = match resolved.member {
            Member::NodeDelegate(delegate) => {
                let Some(params) = self.check_params(stmt, &delegate.name, &delegate.params, inst.params)
                else {
                    return;
                };
                let name = self.world.intern(name);
                self.world
                    .instantiate_node(dest, name, delegate, resolved.container, params)
                    .map(|_| self.result.nodes_created += 1)
            }
            Member::ScopeDelegate(delegate) => {
                let Some(params) = self.check_params(stmt, &delegate.name, &delegate.params, inst.params)
                else {
                    return;
                };
                let name = self.world.intern(name);
                self.world
                    .instantiate_scope(dest, name, delegate, resolved.container, params)
                    .map(|_| self.result.scopes_created += 1)
            }
            other => {
                self.error(
                    stmt,
                    inst.source.span,
                    codes::E0202,
                    format!("'{}' is a {}, not a type", inst.source, other.kind_name()),
                );
                return;
            }
        };

        match created {
            Ok(()) => {
                self.defined.insert(target_key, inst.target.span);
            }
            Err(WorldError::ScopeSetup { reason, .. }) => {
                self.error(
                    stmt,
                    stmt.span,
                    codes::E0209,
                    format!("cannot create '{}': {}", inst.target, reason),
                );
            }
            Err(e @ WorldError::AlreadyDefined { .. }) => {
                self.error(stmt, inst.target.span, codes::E0201, e.to_string());
            }
        }
    }

    /// Check assignments against the schema. Every problem is reported; the
    /// values are returned only if there were none.
    fn check_params(
        &mut self,
        stmt: &Statement,
        type_name: &str,
        schema: &[ParamSpec],
        assigns: &[ParamAssign],
    ) -> Option<Box<[ParamValue]>> {
        let mut values: Vec<ParamValue> = schema.iter().map(|p| p.default.clone()).collect();
        let mut seen: HashMap<&str, Span> = HashMap::new();
        let mut ok = true;

        for assign in assigns {
            let pname = assign.name.name.as_str();
            let Some(index) = schema.iter().position(|p| p.name == pname) else {
                self.error(
                    stmt,
                    assign.name.span,
                    codes::E0203,
                    format!("'{type_name}' has no parameter '{pname}'"),
                );
                ok = false;
                continue;
            };
            if let Some(first) = seen.insert(pname, assign.span) {
                let message = format!("parameter '{pname}' is assigned more than once");
                self.push(
                    stmt,
                    Diagnostic::error(assign.span, message)
                        .with_code(codes::E0204)
                        .with_related(first, "first assigned here"),
                );
                ok = false;
                continue;
            }
            let expected = schema[index].ty();
            match ParamValue::from_literal(&assign.value, expected) {
                Ok(v) => values[index] = v,
                Err(found) => {
                    self.error(
                        stmt,
                        assign.value.span(),
                        codes::E0205,
                        format!("parameter '{pname}' expects {expected}, found {found}"),
                    );
                    ok = false;
                }
            }
        }

        ok.then(|| values.into_boxed_slice())
    }

    // ── Pass 2: connections ─────────────────────────────────────────────

    fn connect(&mut self, stmt: &Statement, conn: &Connection) {
        if conn.source.segments.len() != 1 {
            self.error(
                stmt,
                conn.source.span,
                codes::E0210,
                format!("connection source '{}' must be a single name", conn.source),
            );
            return;
        }

        let node_names: Vec<&str> = conn.target.prefix().iter().map(|s| s.name.as_str()).collect();
        let Some(target) = self.lookup_node(stmt, &node_names, conn.target.span) else {
            return;
        };
        let Some(source) = self.lookup_node(stmt, &[conn.source.last().name.as_str()], conn.source.span)
        else {
            return;
        };

        let slot_name = &conn.target.last().name;
        let Some(target_node) = self.world.node(target) else {
            return;
        };
        let delegate = target_node.delegate.clone();
        let Some(slot) = delegate.input_index(slot_name) else {
            self.error(
                stmt,
                conn.target.last().span,
                codes::E0206,
                format!("'{}' has no input '{}'", delegate.name, slot_name),
            )
            .hint = Some(input_hint(&delegate.inputs));
            return;
        };

        let Some(source_node) = self.world.node(source) else {
            return;
        };
        let Some(kind) = source_node.delegate.produces else {
            self.error(
                stmt,
                conn.source.span,
                codes::E0208,
                format!("'{}' produces no output", conn.source),
            );
            return;
        };
        if !delegate.inputs[slot].accepts_kind(kind) {
            self.error(
                stmt,
                stmt.span,
                codes::E0208,
                format!(
                    "input '{}' of '{}' does not accept {} output from '{}'",
                    slot_name, delegate.name, kind, conn.source
                ),
            );
            return;
        }

        if let Some(node) = self.world.node_mut(target) {
            node.connect(slot, source);
        }
        self.result.connections += 1;
        debug!(
            target = %self.world.node_path(target),
            slot = %slot_name,
            source = %self.world.node_path(source),
            "connected"
        );
    }

    fn lookup_node(&mut self, stmt: &Statement, names: &[&str], span: Span) -> Option<NodeId> {
        let path = names.join(".");
        match self.world.resolve(self.scope, names).map(|r| r.member) {
            Some(Member::Node(id)) => Some(id),
            Some(other) => {
                self.error(
                    stmt,
                    span,
                    codes::E0207,
                    format!("'{path}' is a {}, not a node", other.kind_name()),
                );
                None
            }
            None => {
                self.error(stmt, span, codes::E0200, format!("unresolved name '{path}'"));
                None
            }
        }
    }
}

fn input_hint(inputs: &[crate::delegate::InputSpec]) -> String {
    if inputs.is_empty() {
        return "this node has no inputs".to_string();
    }
    let names: Vec<&str> = inputs.iter().map(|i| i.name.as_str()).collect();
    format!("inputs are: {}", names.join(", "))
}

// ── Tests ───────────────────────────────────────────────────────────────────
