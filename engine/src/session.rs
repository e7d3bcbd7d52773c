// session.rs — Script loading and the frame loop
//
// The process-boundary driver: parse a script, populate a fresh world from a
// registry, apply the statements, build the graph and run frames at a fixed
// rate, optionally profiled.
//
// Preconditions: the registry holds every delegate the script refers to.
// Postconditions: a loaded session has a fully applied world; after `run`
//                 the graph is built and set up.
// Failure modes: any `EngineError`. Diagnostics are logged before returning.
// Side effects: logging, sleeping between frames, node callbacks.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::ast::Unit;
use crate::diag;
use crate::error::{EngineError, EngineResult};
use crate::graph::Graph;
use crate::profile::{ProfileReport, Profiler};
use crate::registry::Registry;
use crate::resolve;
use crate::world::World;

// ── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Build and set up the graph, run no frames.
    pub dry_run: bool,
    pub profile: bool,
    /// Target frame rate; zero or less runs unpaced.
    pub fps: f64,
    /// Stop after this many frames; `None` runs until the process is stopped.
    pub frames: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            dry_run: false,
            profile: false,
            fps: 60.0,
            frames: None,
        }
    }
}

impl RunOptions {
    fn frame_period(&self) -> Option<Duration> {
        (self.fps > 0.0 && self.fps.is_finite()).then(|| Duration::from_secs_f64(1.0 / self.fps))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub profile: Option<ProfileReport>,
}

// ── Session ─────────────────────────────────────────────────────────────────

pub struct Session {
    world: World,
    unit: Unit,
    graph: Option<Graph>,
}

impl Session {
    /// Parse and apply `source` to a fresh world populated from `registry`.
    pub fn load(source: &str, registry: &Registry) -> EngineResult<Session> {
        let parsed = crate::parser::parse(source);
        if !parsed.errors.is_empty() {
            diag::emit_all(&parsed.errors);
            return Err(EngineError::Parse {
                errors: parsed.errors,
            });
        }
        let Some(unit) = parsed.unit else {
            return Err(EngineError::Parse { errors: Vec::new() });
        };
        debug!(statements = unit.statements.len(), "script parsed");

        let mut world = World::new();
        let root = world.root();
        registry
            .populate(&mut world, root)
            .map_err(|errors| EngineError::Populate { errors })?;

        let applied = resolve::apply(&mut world, root, &unit);
        diag::emit_all(&applied.diagnostics);
        if !applied.is_ok() {
            return Err(EngineError::Apply {
                errors: applied.diagnostics,
            });
        }
        debug!(
            nodes = applied.nodes_created,
            scopes = applied.scopes_created,
            connections = applied.connections,
            "script applied"
        );

        Ok(Session {
            world,
            unit,
            graph: None,
        })
    }

    pub fn load_file(path: &Path, registry: &Registry) -> EngineResult<Session> {
        let source = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        info!(script = %path.display(), "loading");
        Self::load(&source, registry)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    /// Build and set up the graph once.
    pub fn build(&mut self) -> EngineResult<&Graph> {
        let graph = match self.graph.take() {
            Some(graph) => graph,
            None => Graph::build(&mut self.world)?,
        };
        Ok(self.graph.insert(graph))
    }

    /// Run a single frame. Builds the graph first if needed.
    pub fn step(&mut self, profiler: Option<&mut Profiler>) -> EngineResult<()> {
        self.build()?;
        if let Some(graph) = &self.graph {
            match profiler {
                Some(p) => graph.update_profiled(&mut self.world, p),
                None => graph.update(&mut self.world),
            }
        }
        Ok(())
    }

    /// Run frames according to `options`.
    pub fn run(&mut self, options: &RunOptions) -> EngineResult<RunSummary> {
        let nodes = self.build()?.len();
        info!(nodes, "graph ready");
        if options.dry_run {
            return Ok(RunSummary {
                frames: 0,
                profile: None,
            });
        }

        let period = options.frame_period();
        let mut profiler = options.profile.then(Profiler::new);
        let mut frames = 0u64;

        while options.frames.map_or(true, |limit| frames < limit) {
            let start = Instant::now();
            self.step(profiler.as_mut())?;
            frames += 1;
            if let Some(period) = period {
                if let Some(rest) = period.checked_sub(start.elapsed()) {
                    thread::sleep(rest);
                }
            }
        }

        let profile = profiler.map(|p| p.report(&self.world));
        if let Some(report) = &profile {
            report.log_summary();
        }
        info!(frames, "run finished");
        Ok(RunSummary { frames, profile })
    }

    /// Destroy every node of the graph. Idempotent.
    pub fn teardown(&mut self) {
        if let Some(graph) = self.graph.take() {
            graph.teardown(&mut self.world);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Write a profile report as pretty JSON.
pub fn write_report(report: &ProfileReport, path: &Path) -> EngineResult<()> {
    let json = report.to_json()?;
    std::fs::write(path, json).map_err(|e| EngineError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRAIL: &str = "a = window(width=16, height=16)\nb = a.mouse-motion\na.display.source = b\n";

    fn registry() -> Registry {
        Registry::with_builtins().unwrap()
    }

    fn unpaced(frames: u64) -> RunOptions {
        RunOptions {
            fps: 0.0,
            frames: Some(frames),
            ..RunOptions::default()
        }
    }

    #[test]
    fn runs_a_fixed_number_of_frames() {
        let mut s = Session::load(TRAIL, &registry()).unwrap();
        let summary = s.run(&unpaced(5)).unwrap();
        assert_eq!(summary.frames, 5);
        assert!(summary.profile.is_none());
        let a = s.world().resolve_scope(s.world().root(), &["a"]).unwrap();
        assert_eq!(crate::builtins::presented_frames(s.world(), a), 5);
    }

    #[test]
    fn dry_run_sets_up_without_frames() {
        let mut s = Session::load(TRAIL, &registry()).unwrap();
        let options = RunOptions {
            dry_run: true,
            ..unpaced(5)
        };
        assert_eq!(s.run(&options).unwrap().frames, 0);
        assert_eq!(s.graph().map(Graph::len), Some(2));
    }

    #[test]
    fn profiled_run_reports_every_node() {
        let mut s = Session::load(TRAIL, &registry()).unwrap();
        let options = RunOptions {
            profile: true,
            ..unpaced(3)
        };
        let report = s.run(&options).unwrap().profile.unwrap();
        assert_eq!(report.frames, 3);
        let names: Vec<&str> = report.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a.display"]);
    }

    #[test]
    fn pacing_holds_the_frame_rate() {
        let mut s = Session::load(TRAIL, &registry()).unwrap();
        let options = RunOptions {
            fps: 200.0,
            frames: Some(4),
            ..RunOptions::default()
        };
        let start = Instant::now();
        s.run(&options).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn parse_errors_surface() {
        let err = Session::load("a = = b", &registry()).err().unwrap();
        assert!(matches!(err, EngineError::Parse { .. }));
        assert_eq!(err.exit_code(), 1);
        assert!(!err.diagnostics().is_empty());
    }

    #[test]
    fn apply_errors_surface() {
        let err = Session::load("a = nowhere()", &registry()).err().unwrap();
        assert!(matches!(err, EngineError::Apply { .. }));
    }

    #[test]
    fn incomplete_graph_fails_run() {
        let mut s = Session::load("a = window(width=4, height=4)", &registry()).unwrap();
        let err = s.run(&unpaced(1)).unwrap_err();
        assert!(matches!(err, EngineError::Graph(crate::graph::GraphError::Incomplete { .. })));
    }

    #[test]
    fn missing_file_is_io() {
        let err = Session::load_file(Path::new("/nonexistent/x.lum"), &registry())
            .err()
            .unwrap();
        assert_eq!(err.exit_code(), 2);
    }
}
