// lumen — dataflow scripts compiled into live, per-frame node graphs
//
// Library root. Front-end (lexer, parser, ast, diag), namespace and arena
// (strtab, dict, value, delegate, node, scope, world, registry, resolve),
// runtime (graph, profile, builtins, session) and output (dot).

pub mod ast;
pub mod builtins;
pub mod delegate;
pub mod diag;
pub mod dict;
pub mod dot;
pub mod error;
pub mod graph;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod profile;
pub mod registry;
pub mod resolve;
pub mod scope;
pub mod session;
pub mod strtab;
pub mod value;
pub mod world;
