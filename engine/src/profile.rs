// profile.rs — Per-node and per-frame timing statistics
//
// Welford running mean/variance over `Duration` samples, one accumulator per
// node plus one for whole frames. The report is a plain serializable value,
// logged at the end of a profiled run and optionally written as JSON.
//
// Preconditions: node ids passed to `record` come from one graph.
// Postconditions: `report` lists nodes in first-recorded order.
// Failure modes: none.
// Side effects: `log_summary` logs through `tracing`.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::world::{NodeId, World};

/// Welford accumulator over microsecond samples.
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, sample: Duration) {
        let x = sample.as_nanos() as f64 / 1e3;
        self.count += 1;
        if self.count == 1 {
            self.min = x;
            self.max = x;
        } else {
            self.min = self.min.min(x);
            self.max = self.max.max(x);
        }
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation; zero below two samples.
    pub fn stddev(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64).sqrt()
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    fn summary(&self, name: String) -> TimingSummary {
        TimingSummary {
            name,
            samples: self.count,
            mean_us: self.mean,
            stddev_us: self.stddev(),
            min_us: self.min,
            max_us: self.max,
        }
    }
}

#[derive(Debug, Default)]
pub struct Profiler {
    nodes: Vec<(NodeId, RunningStats)>,
    index: HashMap<NodeId, usize>,
    frame: RunningStats,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, node: NodeId, elapsed: Duration) {
        let slot = *self.index.entry(node).or_insert_with(|| {
            self.nodes.push((node, RunningStats::default()));
            self.nodes.len() - 1
        });
        self.nodes[slot].1.push(elapsed);
    }

    pub fn record_frame(&mut self, elapsed: Duration) {
        self.frame.push(elapsed);
    }

    pub fn frames(&self) -> u64 {
        self.frame.count()
    }

    pub fn node_stats(&self, node: NodeId) -> Option<&RunningStats> {
        self.index.get(&node).map(|&i| &self.nodes[i].1)
    }

    pub fn report(&self, world: &World) -> ProfileReport {
        ProfileReport {
            frames: self.frame.count(),
            frame: self.frame.summary("frame".to_string()),
            nodes: self
                .nodes
                .iter()
                .map(|(id, stats)| stats.summary(world.node_path(*id)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingSummary {
    pub name: String,
    pub samples: u64,
    pub mean_us: f64,
    pub stddev_us: f64,
    pub min_us: f64,
    pub max_us: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileReport {
    pub frames: u64,
    pub frame: TimingSummary,
    pub nodes: Vec<TimingSummary>,
}

impl ProfileReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn log_summary(&self) {
        info!(
            frames = self.frames,
            mean_us = format_args!("{:.1}", self.frame.mean_us),
            stddev_us = format_args!("{:.1}", self.frame.stddev_us),
            "frame timing"
        );
        for n in &self.nodes {
            info!(
                node = %n.name,
                mean_us = format_args!("{:.1}", n.mean_us),
                stddev_us = format_args!("{:.1}", n.stddev_us),
                min_us = format_args!("{:.1}", n.min_us),
                max_us = format_args!("{:.1}", n.max_us),
                "node timing"
            );
        }
    }
}
