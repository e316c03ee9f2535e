//! Sampled coordinate ranges - the start/end/delta triple used for every
//! logical axis (inline, crossline, offset, CDP, z).

use crate::error::{Result, SeisError};
use serde::{Deserialize, Serialize};

/// Tolerance for on-increment validation of a single coordinate.
pub const EPSILON: f32 = 0.01;

/// Relative tolerance for the start/end/delta consistency check.
const TRIPLE_EPSILON: f32 = 1e-5;

/// A sampled range of coordinates: start, end and a constant increment.
///
/// The range is immutable once constructed and satisfies
/// `end == start + (num_steps - 1) * delta` to within a small relative
/// tolerance. `delta` may be negative for a descending axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeAxis {
    start: f32,
    end: f32,
    delta: f32,
}

impl RangeAxis {
    /// Create a new range, validating the start/end/delta triple.
    pub fn new(start: f32, end: f32, delta: f32) -> Result<Self> {
        if delta == 0.0 && start != end {
            return Err(SeisError::Validation(format!(
                "Inconsistent start, end, delta values: {} {} {}",
                start, end, delta
            )));
        }
        let range = Self { start, end, delta };
        let reconstructed = start + (range.num_steps() - 1) as f32 * delta;
        let scale = end.abs().max(start.abs()).max(1.0);
        if (reconstructed - end).abs() > TRIPLE_EPSILON * scale {
            return Err(SeisError::Validation(format!(
                "Inconsistent start, end, delta values: {} {} {}",
                start, end, delta
            )));
        }
        Ok(range)
    }

    /// A degenerate single-value range.
    pub fn single(value: f32) -> Self {
        Self {
            start: value,
            end: value,
            delta: 1.0,
        }
    }

    pub fn start(&self) -> f32 {
        self.start
    }

    pub fn end(&self) -> f32 {
        self.end
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Number of values on the range, including both endpoints.
    pub fn num_steps(&self) -> usize {
        if self.delta == 0.0 {
            return 1;
        }
        let n = 1 + ((self.end - self.start) / self.delta).round() as i64;
        n.max(1) as usize
    }

    /// The coordinate at the given step index.
    pub fn value(&self, index: usize) -> f32 {
        self.start + index as f32 * self.delta
    }

    /// Nearest step index for an on-grid coordinate.
    pub fn index_of(&self, value: f32) -> usize {
        ((value - self.start) / self.delta).round() as usize
    }

    /// Validates that a coordinate falls on the range increment and,
    /// optionally, between the range bounds.
    ///
    /// A value is on-increment when `|((value - start) mod delta)|` is within
    /// [`EPSILON`] of zero or of `|delta|` (the floating remainder can land
    /// just below the upper wrap). Bounds are checked for both ascending and
    /// descending axes. This is the single validation primitive shared by
    /// every coordinate kind.
    pub fn validate(&self, name: &str, value: f32, check_bounds: bool) -> Result<()> {
        let remainder = ((value - self.start) % self.delta).abs();
        if remainder > EPSILON && remainder < self.delta.abs() - EPSILON {
            return Err(SeisError::Validation(format!(
                "{} {} is not a multiple of {}. ({}-{}Start)%{}Delta={} not within {}",
                name, value, self.delta, name, name, name, remainder, EPSILON
            )));
        }
        if check_bounds {
            if self.start < self.end && (value < self.start || value > self.end) {
                return Err(SeisError::OutOfBounds(format!(
                    "{} {} is not between {} and {}",
                    name, value, self.start, self.end
                )));
            }
            if self.start > self.end && (value > self.start || value < self.end) {
                return Err(SeisError::OutOfBounds(format!(
                    "{} {} is not between {} and {}",
                    name, value, self.end, self.start
                )));
            }
        }
        Ok(())
    }

    /// True when the coordinate is on-increment and within bounds.
    pub fn contains(&self, value: f32) -> bool {
        self.validate("value", value, true).is_ok()
    }
}

impl std::fmt::Display for RangeAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.start, self.end, self.delta)
    }
}
