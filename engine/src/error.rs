// error.rs — Top-level engine error
//
// Fatal outcomes of loading, building and running a script. Diagnostics from
// the parser and statement application travel inside as values so the caller
// decides how to print them.

use std::path::PathBuf;

use crate::diag::Diagnostic;
use crate::graph::GraphError;
use crate::registry::RegistryError;
use crate::world::WorldError;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("script has {} parse error(s)", .errors.len())]
    Parse { errors: Vec<Diagnostic> },

    #[error("script has {} error(s)", .errors.len())]
    Apply { errors: Vec<Diagnostic> },

    #[error("{} delegate(s) could not be registered", .errors.len())]
    Populate { errors: Vec<WorldError> },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("cannot serialize profile report: {0}")]
    Report(#[from] serde_json::Error),
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code: 2 for I/O failures, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Io { .. } => 2,
            _ => 1,
        }
    }

    /// Diagnostics carried by the error, if any.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            EngineError::Parse { errors } | EngineError::Apply { errors } => errors,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_exit_with_two() {
        let e = EngineError::io(
            "missing.lum",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert_eq!(e.exit_code(), 2);
        assert_eq!(e.to_string(), "missing.lum: not found");
    }

    #[test]
    fn script_errors_exit_with_one() {
        let e = EngineError::Graph(GraphError::Cycle {
            nodes: vec!["a".into(), "b".into()],
        });
        assert_eq!(e.exit_code(), 1);
        assert_eq!(e.to_string(), "dependency cycle between a, b");
        assert!(e.diagnostics().is_empty());
    }
}
