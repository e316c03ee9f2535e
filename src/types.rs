//! Core trace types shared by the access layer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Status of a single trace returned from a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceStatus {
    /// Trace exists and carries at least one non-zero sample.
    Live,
    /// Trace exists but every sample is zero.
    Dead,
    /// Requested location is outside the stored volume; samples are zeroed.
    Missing,
}

impl fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A single seismic trace: samples plus the logical location they came from.
#[derive(Debug, Clone)]
pub struct Trace {
    /// Inline coordinate of the trace.
    pub inline: f32,
    /// Crossline coordinate of the trace.
    pub xline: f32,
    /// Offset coordinate, for pre-stack traces.
    pub offset: Option<f32>,
    /// Starting z coordinate of the samples.
    pub z_start: f32,
    /// Sample increment along z.
    pub z_delta: f32,
    /// World x,y of the trace location.
    pub x: f64,
    pub y: f64,
    /// Sample values.
    pub samples: Vec<f32>,
    pub status: TraceStatus,
}

impl Trace {
    /// Classify samples as Live or Dead. Dead means every sample is zero.
    pub fn status_of(samples: &[f32]) -> TraceStatus {
        if samples.iter().all(|&s| s == 0.0) {
            TraceStatus::Dead
        } else {
            TraceStatus::Live
        }
    }

    pub fn is_missing(&self) -> bool {
        self.status == TraceStatus::Missing
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }
}

/// An ordered collection of traces returned from one read request.
#[derive(Debug, Clone, Default)]
pub struct TraceData {
    traces: Vec<Trace>,
}

impl TraceData {
    pub fn new(traces: Vec<Trace>) -> Self {
        Self { traces }
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn num_traces(&self) -> usize {
        self.traces.len()
    }

    pub fn num_samples(&self) -> usize {
        self.traces.first().map_or(0, Trace::num_samples)
    }

    pub fn into_traces(self) -> Vec<Trace> {
        self.traces
    }

    /// Iterator over traces that are present in the store (Live or Dead).
    pub fn present(&self) -> impl Iterator<Item = &Trace> {
        self.traces.iter().filter(|t| !t.is_missing())
    }
}

/// Cooperative cancellation flag shared between a bulk operation and its
/// caller. Checked between frames/traces; cancelled operations stop without
/// raising, leaving output committed up to the last written unit.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(Trace::status_of(&[0.0, 0.0, 0.0]), TraceStatus::Dead);
        assert_eq!(Trace::status_of(&[0.0, 1.5, 0.0]), TraceStatus::Live);
        assert_eq!(Trace::status_of(&[]), TraceStatus::Dead);
    }

    #[test]
    fn test_cancel_flag() {
        let flag = CancelFlag::new();
        let shared = flag.clone();
        assert!(!shared.is_cancelled());
        flag.cancel();
        assert!(shared.is_cancelled());
    }
}
