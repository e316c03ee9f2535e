//! 2-D line geometry - CDP/shotpoint/bin transforms along a single acquisition
//! line, and the survey-level nearest-line search.
//!
//! A 2-D line stores the world x,y of every bin, so bin-to-world transforms
//! interpolate between stored points rather than over corner points. CDP and
//! shotpoint numbering are related through a [`LineCoordinateTransform`],
//! letting crooked lines carry a non-linear shotpoint scheme; the linear
//! implementation covers the common case.

use crate::error::{Result, SeisError};
use crate::geometry::Point2;
use crate::range::RangeAxis;
use std::sync::Arc;

/// Converts between CDP and shotpoint numbering along one line.
pub trait LineCoordinateTransform: Send + Sync {
    fn cdp_to_shotpoint(&self, cdp: f32) -> Result<f32>;
    fn shotpoint_to_cdp(&self, shotpoint: f32) -> Result<f32>;
}

/// Linear CDP/shotpoint relation: both numbered uniformly along the line.
#[derive(Debug, Clone)]
pub struct LinearCdpShotpointTransform {
    cdp_range: RangeAxis,
    shotpoint_range: RangeAxis,
}

impl LinearCdpShotpointTransform {
    pub fn new(cdp_range: RangeAxis, shotpoint_range: RangeAxis) -> Result<Self> {
        if cdp_range.num_steps() != shotpoint_range.num_steps() {
            return Err(SeisError::Validation(format!(
                "CDP range {} and shotpoint range {} differ in length",
                cdp_range, shotpoint_range
            )));
        }
        Ok(Self {
            cdp_range,
            shotpoint_range,
        })
    }
}

impl LineCoordinateTransform for LinearCdpShotpointTransform {
    fn cdp_to_shotpoint(&self, cdp: f32) -> Result<f32> {
        self.cdp_range.validate("cdp", cdp, true)?;
        let steps = (cdp - self.cdp_range.start()) / self.cdp_range.delta();
        Ok(self.shotpoint_range.start() + steps * self.shotpoint_range.delta())
    }

    fn shotpoint_to_cdp(&self, shotpoint: f32) -> Result<f32> {
        self.shotpoint_range.validate("shotpoint", shotpoint, true)?;
        let steps = (shotpoint - self.shotpoint_range.start()) / self.shotpoint_range.delta();
        Ok(self.cdp_range.start() + steps * self.cdp_range.delta())
    }
}

/// A single 2-D seismic line: CDP range, shotpoint endpoints and the world
/// x,y coordinates of every bin. Immutable once constructed.
#[derive(Clone)]
pub struct SeismicLine2d {
    name: String,
    line_number: i32,
    cdp_range: RangeAxis,
    shotpoint_start: f32,
    shotpoint_end: f32,
    points: Vec<Point2>,
    transform: Arc<dyn LineCoordinateTransform>,
}

impl std::fmt::Debug for SeismicLine2d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeismicLine2d")
            .field("name", &self.name)
            .field("line_number", &self.line_number)
            .field("cdp_range", &self.cdp_range)
            .field("num_bins", &self.points.len())
            .finish()
    }
}

impl SeismicLine2d {
    pub fn new(
        name: impl Into<String>,
        line_number: i32,
        cdp_range: RangeAxis,
        shotpoint_start: f32,
        shotpoint_end: f32,
        points: Vec<Point2>,
        transform: Arc<dyn LineCoordinateTransform>,
    ) -> Result<Self> {
        if points.len() != cdp_range.num_steps() {
            return Err(SeisError::Validation(format!(
                "Line has {} bin locations but the CDP range {} holds {} values",
                points.len(),
                cdp_range,
                cdp_range.num_steps()
            )));
        }
        Ok(Self {
            name: name.into(),
            line_number,
            cdp_range,
            shotpoint_start,
            shotpoint_end,
            points,
            transform,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line_number(&self) -> i32 {
        self.line_number
    }

    pub fn cdp_range(&self) -> RangeAxis {
        self.cdp_range
    }

    pub fn shotpoint_start(&self) -> f32 {
        self.shotpoint_start
    }

    pub fn shotpoint_end(&self) -> f32 {
        self.shotpoint_end
    }

    pub fn num_bins(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Rounds a fractional bin index to the nearest whole bin, checking the
    /// raw index against the line limits first.
    fn round_to_bin_index(&self, bin: f64) -> Result<usize> {
        let max = (self.num_bins() - 1) as f64;
        if bin < 0.0 || bin > max {
            return Err(SeisError::OutOfBounds(format!(
                "Bin {} out of bounds (0,{}) on line {}",
                bin, max, self.line_number
            )));
        }
        Ok(bin.round() as usize)
    }

    /// Transforms a CDP coordinate to a (rounded) bin index.
    pub fn cdp_to_bin(&self, cdp: f32) -> Result<f64> {
        let bin = ((cdp - self.cdp_range.start()) / self.cdp_range.delta()) as f64;
        if bin < 0.0 || bin > (self.num_bins() - 1) as f64 {
            return Err(SeisError::OutOfBounds(format!(
                "CDP {} out of bounds ({},{})",
                cdp,
                self.cdp_range.start(),
                self.cdp_range.end()
            )));
        }
        Ok(bin.round())
    }

    /// Transforms a fractional bin index to the nearest CDP on the stride.
    pub fn bin_to_cdp(&self, bin: f64) -> Result<f32> {
        let index = self.round_to_bin_index(bin)?;
        Ok(self.cdp_range.value(index))
    }

    pub fn shotpoint_to_bin(&self, shotpoint: f32) -> Result<f64> {
        let cdp = self.transform.shotpoint_to_cdp(shotpoint)?;
        self.cdp_to_bin(cdp)
    }

    pub fn bin_to_shotpoint(&self, bin: f64) -> Result<f32> {
        let cdp = self.bin_to_cdp(bin)?;
        self.transform.cdp_to_shotpoint(cdp)
    }

    pub fn cdp_to_shotpoint(&self, cdp: f32) -> Result<f32> {
        self.transform.cdp_to_shotpoint(cdp)
    }

    pub fn shotpoint_to_cdp(&self, shotpoint: f32) -> Result<f32> {
        self.transform.shotpoint_to_cdp(shotpoint)
    }

    /// Transforms a fractional bin index to world x,y, interpolating linearly
    /// between the two bounding bin locations.
    pub fn bin_to_xy(&self, bin: f64) -> Result<Point2> {
        let max = (self.num_bins() - 1) as f64;
        if bin < 0.0 || bin > max {
            return Err(SeisError::OutOfBounds(format!(
                "Bin {} out of bounds (0,{}) on line {}",
                bin, max, self.line_number
            )));
        }
        let lo = bin.floor() as usize;
        let hi = bin.ceil() as usize;
        if lo == hi {
            return Ok(self.points[lo]);
        }
        let frac = bin - lo as f64;
        let p0 = self.points[lo];
        let p1 = self.points[hi];
        Ok(Point2::new(
            p0.x * (1.0 - frac) + p1.x * frac,
            p0.y * (1.0 - frac) + p1.y * frac,
        ))
    }

    pub fn cdp_to_xy(&self, cdp: f32) -> Result<Point2> {
        let bin = self.cdp_to_bin(cdp)?;
        self.bin_to_xy(bin)
    }

    pub fn shotpoint_to_xy(&self, shotpoint: f32) -> Result<Point2> {
        let bin = self.shotpoint_to_bin(shotpoint)?;
        self.bin_to_xy(bin)
    }

    /// Bulk transform of CDP numbers to their bin locations.
    pub fn cdps_to_xys(&self, cdps: &[f32]) -> Result<Vec<Point2>> {
        let mut points = Vec::with_capacity(cdps.len());
        for &cdp in cdps {
            let index = ((cdp - self.cdp_range.start()) / self.cdp_range.delta()).round();
            if index < 0.0 || index as usize >= self.cdp_range.num_steps() {
                return Err(SeisError::OutOfBounds(format!(
                    "Invalid cdp: {}. Must be in the range {} to {}",
                    cdp,
                    self.cdp_range.start(),
                    self.cdp_range.end()
                )));
            }
            points.push(self.points[index as usize]);
        }
        Ok(points)
    }

    /// True when the other line has the same number, ranges and bin count.
    pub fn matches_geometry(&self, other: &SeismicLine2d) -> bool {
        self.line_number == other.line_number
            && self.cdp_range == other.cdp_range
            && self.shotpoint_start == other.shotpoint_start
            && self.shotpoint_end == other.shotpoint_end
            && self.points == other.points
    }
}

/// A 2-D seismic survey: a collection of 2-D lines searchable by number, name
/// or nearest world location.
#[derive(Debug, Clone)]
pub struct SeismicSurvey2d {
    name: String,
    lines: Vec<SeismicLine2d>,
}

impl SeismicSurvey2d {
    pub fn new(name: impl Into<String>, lines: Vec<SeismicLine2d>) -> Self {
        Self {
            name: name.into(),
            lines,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[SeismicLine2d] {
        &self.lines
    }

    pub fn contains_line_number(&self, line_number: i32) -> bool {
        self.lines.iter().any(|l| l.line_number() == line_number)
    }

    pub fn contains_line_name(&self, name: &str) -> bool {
        self.lines.iter().any(|l| l.name() == name)
    }

    pub fn line_by_number(&self, line_number: i32) -> Result<&SeismicLine2d> {
        self.lines
            .iter()
            .find(|l| l.line_number() == line_number)
            .ok_or_else(|| {
                SeisError::NotFound(format!(
                    "Survey does not contain line with the given number: {}",
                    line_number
                ))
            })
    }

    pub fn line_by_name(&self, name: &str) -> Result<&SeismicLine2d> {
        self.lines.iter().find(|l| l.name() == name).ok_or_else(|| {
            SeisError::NotFound(format!(
                "Survey does not contain line with the given name: {}",
                name
            ))
        })
    }

    pub fn line_names(&self) -> Vec<&str> {
        self.lines.iter().map(SeismicLine2d::name).collect()
    }

    /// Transforms world x,y to the nearest (line number, CDP) in the survey.
    ///
    /// Two stages: first the nearest line, measured as the smallest distance
    /// from the point to any segment between consecutive bin locations; then
    /// the nearest bin on that line. Lines with significant bend are
    /// approximated segment by segment, so the winner is the truly nearest
    /// line for piecewise-linear geometries.
    pub fn xy_to_line_cdp(&self, x: f64, y: f64) -> Result<(i32, f32)> {
        let mut min_distance = f64::INFINITY;
        let mut nearest_line = None;
        for line in &self.lines {
            let points = line.points();
            for pair in points.windows(2) {
                let distance = distance_point_to_segment(pair[0], pair[1], x, y);
                if distance < min_distance {
                    min_distance = distance;
                    nearest_line = Some(line.line_number());
                }
            }
        }
        let line_number = nearest_line.ok_or_else(|| {
            SeisError::NotFound(format!("Survey '{}' contains no line segments", self.name))
        })?;

        let line = self.line_by_number(line_number)?;
        let mut min_distance = f64::INFINITY;
        let mut cdp = line.cdp_range().start();
        for bin in 0..line.num_bins() {
            let p = line.points()[bin];
            let distance = Point2::new(x, y).distance_to(&p);
            if distance < min_distance {
                min_distance = distance;
                cdp = line.bin_to_cdp(bin as f64)?;
            }
        }
        Ok((line_number, cdp))
    }
}

/// Distance from (x,y) to the segment p0-p1, clamping the projection to the
/// segment endpoints.
fn distance_point_to_segment(p0: Point2, p1: Point2, x: f64, y: f64) -> f64 {
    let (dx, dy) = (p1.x - p0.x, p1.y - p0.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return Point2::new(x, y).distance_to(&p0);
    }
    let t = (((x - p0.x) * dx + (y - p0.y) * dy) / len_sq).clamp(0.0, 1.0);
    let proj = Point2::new(p0.x + t * dx, p0.y + t * dy);
    Point2::new(x, y).distance_to(&proj)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_line() -> SeismicLine2d {
        let cdp_range = RangeAxis::new(1.0, 5.0, 2.0).unwrap();
        let shotpoint_range = RangeAxis::new(10.0, 11.0, 0.5).unwrap();
        let points = vec![
            Point2::new(1.0, 2.0),
            Point2::new(7.5, 4.5),
            Point2::new(8.0, 9.0),
        ];
        let transform = LinearCdpShotpointTransform::new(cdp_range, shotpoint_range).unwrap();
        SeismicLine2d::new(
            "foo",
            5,
            cdp_range,
            shotpoint_range.start(),
            shotpoint_range.end(),
            points,
            Arc::new(transform),
        )
        .unwrap()
    }

    #[test]
    fn bin_cdp_transforms() {
        let line = test_line();
        assert_eq!(line.num_bins(), 3);

        assert_eq!(line.bin_to_cdp(0.0).unwrap(), 1.0);
        assert_eq!(line.bin_to_cdp(1.23).unwrap(), 3.0);
        assert_eq!(line.bin_to_cdp(1.5).unwrap(), 5.0);
        assert!(matches!(line.bin_to_cdp(-1.0), Err(SeisError::OutOfBounds(_))));
        assert!(matches!(line.bin_to_cdp(4.0), Err(SeisError::OutOfBounds(_))));

        assert_eq!(line.cdp_to_bin(1.0).unwrap(), 0.0);
        assert_eq!(line.cdp_to_bin(3.0).unwrap(), 1.0);
        assert_eq!(line.cdp_to_bin(5.0).unwrap(), 2.0);
        assert!(matches!(line.cdp_to_bin(-1.0), Err(SeisError::OutOfBounds(_))));
        assert!(matches!(line.cdp_to_bin(6.0), Err(SeisError::OutOfBounds(_))));
    }

    #[test]
    fn shotpoint_transforms() {
        let line = test_line();
        assert_eq!(line.bin_to_shotpoint(0.0).unwrap(), 10.0);
        assert_eq!(line.bin_to_shotpoint(1.23).unwrap(), 10.5);
        assert_eq!(line.bin_to_shotpoint(1.5).unwrap(), 11.0);

        // Round trip between CDP and shotpoint numbering.
        for cdp in [1.0f32, 3.0, 5.0] {
            let sp = line.cdp_to_shotpoint(cdp).unwrap();
            assert_eq!(line.shotpoint_to_cdp(sp).unwrap(), cdp);
        }
        assert!(line.cdp_to_shotpoint(7.0).is_err());
    }

    #[test]
    fn bin_to_xy_interpolates() {
        let line = test_line();
        let p = line.bin_to_xy(0.5).unwrap();
        assert!((p.x - 4.25).abs() < 1e-9);
        assert!((p.y - 3.25).abs() < 1e-9);
        assert_eq!(line.bin_to_xy(2.0).unwrap(), Point2::new(8.0, 9.0));
        assert!(line.bin_to_xy(2.1).is_err());
    }

    #[test]
    fn cdps_to_xys_bulk() {
        let line = test_line();
        let points = line.cdps_to_xys(&[1.0, 5.0]).unwrap();
        assert_eq!(points[0], Point2::new(1.0, 2.0));
        assert_eq!(points[1], Point2::new(8.0, 9.0));
        assert!(matches!(
            line.cdps_to_xys(&[1.0, 9.0]),
            Err(SeisError::OutOfBounds(_))
        ));
    }

    fn straight_line(number: i32, y: f64) -> SeismicLine2d {
        let cdp_range = RangeAxis::new(100.0, 104.0, 1.0).unwrap();
        let shotpoint_range = RangeAxis::new(1.0, 5.0, 1.0).unwrap();
        let points = (0..5).map(|i| Point2::new(i as f64 * 50.0, y)).collect();
        let transform = LinearCdpShotpointTransform::new(cdp_range, shotpoint_range).unwrap();
        SeismicLine2d::new(
            format!("line-{}", number),
            number,
            cdp_range,
            1.0,
            5.0,
            points,
            Arc::new(transform),
        )
        .unwrap()
    }

    #[test]
    fn nearest_line_cdp_search() {
        let survey = SeismicSurvey2d::new(
            "survey",
            vec![straight_line(1, 0.0), straight_line(2, 1000.0)],
        );
        // Closer to line 2, nearest bin index 3 (x=150).
        let (line, cdp) = survey.xy_to_line_cdp(160.0, 900.0).unwrap();
        assert_eq!(line, 2);
        assert_eq!(cdp, 103.0);
        // Closer to line 1, beyond the line end snaps to the last bin.
        let (line, cdp) = survey.xy_to_line_cdp(275.0, 10.0).unwrap();
        assert_eq!(line, 1);
        assert_eq!(cdp, 104.0);
    }

    #[test]
    fn lookup_by_name_and_number() {
        let survey = SeismicSurvey2d::new("survey", vec![straight_line(7, 0.0)]);
        assert!(survey.contains_line_number(7));
        assert!(!survey.contains_line_number(8));
        assert_eq!(survey.line_by_name("line-7").unwrap().line_number(), 7);
        assert!(matches!(
            survey.line_by_number(8),
            Err(SeisError::NotFound(_))
        ));
        assert_eq!(survey.line_names(), vec!["line-7"]);
    }
}
