//! 3-D survey geometry - orientation-aware transforms between logical
//! (inline, crossline), grid (row, col) and world (x, y) coordinates.
//!
//! The survey is defined by the inline/crossline ranges and 4 corner points
//! bounding the logical grid. Corner points are ordered in grid terms:
//!
//! ```text
//!   3-----------------------2   nrows-1
//!   |...|...|...|...|...|...|
//!   |---+---+---+-----------|     ^
//!   |...|...|...|...|...|...|     | row
//!   0-----------------------1     0
//!       0    --- col --->    ncols-1
//! ```
//!
//! i.e. (origin, +col, +col+row, +row). Which logical axis maps to "row" is
//! fixed by the [`SurveyOrientation`]. World coordinates are produced by
//! bilinear interpolation over the corner points, which is exact for any
//! affine or uniformly sheared rectangular grid; survey corner points, not a
//! rotation angle, are the geometry's primary stored shape.

use crate::error::{Result, SeisError};
use crate::range::RangeAxis;
use serde::{Deserialize, Serialize};

/// Fixes which logical axis maps to the row axis of the corner-point grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurveyOrientation {
    RowIsInline,
    RowIsXline,
}

/// A world-coordinate point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// The 4 corner points of a survey, in grid order (origin, +col, +col+row, +row).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerPoints {
    points: [Point2; 4],
}

impl CornerPoints {
    pub fn new(points: [Point2; 4]) -> Self {
        Self { points }
    }

    /// Complete the far corner from the origin and the two adjacent corners:
    /// `p2 = p0 + (p1 - p0) + (p3 - p0)`.
    pub fn from_three(origin: Point2, col_end: Point2, row_end: Point2) -> Self {
        let far = Point2::new(
            origin.x + (col_end.x - origin.x) + (row_end.x - origin.x),
            origin.y + (col_end.y - origin.y) + (row_end.y - origin.y),
        );
        Self {
            points: [origin, col_end, far, row_end],
        }
    }

    pub fn point(&self, index: usize) -> Point2 {
        self.points[index]
    }

    pub fn points(&self) -> &[Point2; 4] {
        &self.points
    }
}

/// A 3-D seismic survey geometry. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyGeometry {
    name: String,
    inline_range: RangeAxis,
    xline_range: RangeAxis,
    corners: CornerPoints,
    orientation: SurveyOrientation,
}

impl SurveyGeometry {
    pub fn new(
        name: impl Into<String>,
        inline_range: RangeAxis,
        xline_range: RangeAxis,
        corners: CornerPoints,
        orientation: SurveyOrientation,
    ) -> Self {
        Self {
            name: name.into(),
            inline_range,
            xline_range,
            corners,
            orientation,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inline_range(&self) -> RangeAxis {
        self.inline_range
    }

    pub fn xline_range(&self) -> RangeAxis {
        self.xline_range
    }

    pub fn orientation(&self) -> SurveyOrientation {
        self.orientation
    }

    pub fn corner_points(&self) -> &CornerPoints {
        &self.corners
    }

    pub fn num_inlines(&self) -> usize {
        self.inline_range.num_steps()
    }

    pub fn num_xlines(&self) -> usize {
        self.xline_range.num_steps()
    }

    pub fn num_rows(&self) -> usize {
        match self.orientation {
            SurveyOrientation::RowIsInline => self.num_inlines(),
            SurveyOrientation::RowIsXline => self.num_xlines(),
        }
    }

    pub fn num_cols(&self) -> usize {
        match self.orientation {
            SurveyOrientation::RowIsInline => self.num_xlines(),
            SurveyOrientation::RowIsXline => self.num_inlines(),
        }
    }

    /// Transforms inline,xline coordinates to fractional row,col coordinates.
    pub fn inline_xline_to_row_col(&self, inline: f32, xline: f32) -> (f64, f64) {
        let il = (inline - self.inline_range.start()) as f64 / self.inline_range.delta() as f64;
        let xl = (xline - self.xline_range.start()) as f64 / self.xline_range.delta() as f64;
        match self.orientation {
            SurveyOrientation::RowIsInline => (il, xl),
            SurveyOrientation::RowIsXline => (xl, il),
        }
    }

    /// Transforms fractional row,col coordinates to inline,xline coordinates.
    pub fn row_col_to_inline_xline(&self, row: f64, col: f64) -> (f32, f32) {
        let (il_steps, xl_steps) = match self.orientation {
            SurveyOrientation::RowIsInline => (row, col),
            SurveyOrientation::RowIsXline => (col, row),
        };
        let inline = self.inline_range.start() + (il_steps * self.inline_range.delta() as f64) as f32;
        let xline = self.xline_range.start() + (xl_steps * self.xline_range.delta() as f64) as f32;
        (inline, xline)
    }

    /// Transforms row,col to world x,y for a single point.
    pub fn row_col_to_xy(&self, row: f64, col: f64, check_bounds: bool) -> Result<Point2> {
        let max_row = (self.num_rows() - 1) as f64;
        let max_col = (self.num_cols() - 1) as f64;
        if check_bounds && (row < 0.0 || row > max_row || col < 0.0 || col > max_col) {
            return Err(SeisError::OutOfBounds(format!(
                "row,col ({},{}) outside grid [0,{}]x[0,{}]",
                row, col, max_row, max_col
            )));
        }
        let u = if max_col > 0.0 { col / max_col } else { 0.0 };
        let v = if max_row > 0.0 { row / max_row } else { 0.0 };
        Ok(self.interpolate(u, v))
    }

    /// Bilinear interpolation over the corner points at fractional grid
    /// position (u along col, v along row).
    fn interpolate(&self, u: f64, v: f64) -> Point2 {
        let p = self.corners.points();
        let w0 = (1.0 - u) * (1.0 - v);
        let w1 = u * (1.0 - v);
        let w2 = u * v;
        let w3 = (1.0 - u) * v;
        Point2::new(
            p[0].x * w0 + p[1].x * w1 + p[2].x * w2 + p[3].x * w3,
            p[0].y * w0 + p[1].y * w1 + p[2].y * w2 + p[3].y * w3,
        )
    }

    /// Transforms world x,y to fractional row,col by a linear solve over the
    /// affine part of the bilinear basis. Exact for affine grids.
    pub fn xy_to_row_col(&self, x: f64, y: f64, round: bool, check_bounds: bool) -> Result<(f64, f64)> {
        let p = self.corners.points();
        // Column and row direction vectors spanning the full grid.
        let (ax, ay) = (p[1].x - p[0].x, p[1].y - p[0].y);
        let (bx, by) = (p[3].x - p[0].x, p[3].y - p[0].y);
        let det = ax * by - ay * bx;
        if det.abs() < f64::EPSILON {
            return Err(SeisError::InvalidGeometry(format!(
                "Degenerate corner points for survey '{}'",
                self.name
            )));
        }
        let (dx, dy) = (x - p[0].x, y - p[0].y);
        let u = (dx * by - dy * bx) / det;
        let v = (ax * dy - ay * dx) / det;
        let mut col = u * (self.num_cols() - 1) as f64;
        let mut row = v * (self.num_rows() - 1) as f64;
        if round {
            col = col.round();
            row = row.round();
        }
        let max_row = (self.num_rows() - 1) as f64;
        let max_col = (self.num_cols() - 1) as f64;
        if check_bounds && (row < 0.0 || row > max_row || col < 0.0 || col > max_col) {
            return Err(SeisError::OutOfBounds(format!(
                "x,y ({},{}) maps to row,col ({},{}) outside grid [0,{}]x[0,{}]",
                x, y, row, col, max_row, max_col
            )));
        }
        Ok((row, col))
    }

    /// Transforms a single inline,xline coordinate to world x,y with bounds
    /// checking.
    pub fn inline_xline_to_xy(&self, inline: f32, xline: f32) -> Result<Point2> {
        self.inline_xline_to_xy_checked(inline, xline, true)
    }

    /// As [`inline_xline_to_xy`](Self::inline_xline_to_xy) with bounds
    /// checking optionally suppressed (used when probing nearest matches).
    pub fn inline_xline_to_xy_checked(
        &self,
        inline: f32,
        xline: f32,
        check_bounds: bool,
    ) -> Result<Point2> {
        let (row, col) = self.inline_xline_to_row_col(inline, xline);
        self.row_col_to_xy(row, col, check_bounds)
    }

    /// Bulk transform of inline,xline coordinate arrays to world x,y using
    /// bilinear interpolation over the corner points. The weight assignment
    /// is computed per orientation; no bounds checking is applied so callers
    /// can transform out-of-range probe locations.
    pub fn inline_xline_arrays_to_xy(&self, inlines: &[f32], xlines: &[f32]) -> Result<Vec<Point2>> {
        if inlines.len() != xlines.len() {
            return Err(SeisError::Validation(
                "The inline and xline arrays must be of same length.".to_string(),
            ));
        }
        let inline_diff = (self.inline_range.end() - self.inline_range.start()) as f64;
        let xline_diff = (self.xline_range.end() - self.xline_range.start()) as f64;
        let mut points = Vec::with_capacity(inlines.len());
        for (&inline, &xline) in inlines.iter().zip(xlines.iter()) {
            let inline_pct = (inline - self.inline_range.start()) as f64 / inline_diff;
            let xline_pct = (xline - self.xline_range.start()) as f64 / xline_diff;
            let (u, v) = match self.orientation {
                SurveyOrientation::RowIsInline => (xline_pct, inline_pct),
                SurveyOrientation::RowIsXline => (inline_pct, xline_pct),
            };
            points.push(self.interpolate(u, v));
        }
        Ok(points)
    }

    /// Transforms world x,y to an inline,xline coordinate. `round` snaps to
    /// the nearest axis increment.
    pub fn xy_to_inline_xline(&self, x: f64, y: f64, round: bool) -> Result<(f32, f32)> {
        let (row, col) = self.xy_to_row_col(x, y, round, true)?;
        Ok(self.row_col_to_inline_xline(row, col))
    }

    /// Validates an inline coordinate against the survey's inline range.
    pub fn validate_inline(&self, inline: f32, check_bounds: bool) -> Result<()> {
        self.inline_range.validate("inline", inline, check_bounds)
    }

    /// Validates a crossline coordinate against the survey's crossline range.
    pub fn validate_xline(&self, xline: f32, check_bounds: bool) -> Result<()> {
        self.xline_range.validate("xline", xline, check_bounds)
    }
}
