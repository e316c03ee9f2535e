//! Storage-order-aware accessors - plan and execute trace reads and writes
//! against a frame store.
//!
//! Every request is classified against the volume's storage order before any
//! I/O:
//!
//! - **matching**: the requested line lies along the physical trace axis, so
//!   one bulk frame read or write covers it;
//! - **mismatched**: the layout disagrees with the request shape, so traces
//!   are fetched one at a time by linear index;
//! - **unsupported**: slice-oriented layouts have no trace access path and
//!   always raise, never degrade silently.
//!
//! Out-of-range coordinates inside a requested range or list never raise:
//! they yield zero-filled traces tagged `Missing`, and only the span between
//! the first and last in-bounds coordinates is forwarded to the store.
//! Single fixed coordinates (the inline of a `read_inline`, the pair of a
//! by-pair read) are validated strictly.

use crate::error::{Result, SeisError};
use crate::geometry::SurveyGeometry;
use crate::indexer::{PostStackIndexer, PreStackIndexer, VolumeBounds};
use crate::order::{AxisRole, PostStackOrder, PreStackOrder};
use crate::range::RangeAxis;
use crate::store::FrameStore;
use crate::types::{CancelFlag, Trace, TraceData, TraceStatus};
use tracing::debug;

/// The z window of a request: starting sample index, sample count and the
/// starting z coordinate.
#[derive(Debug, Clone, Copy)]
struct ZWindow {
    start_index: usize,
    count: usize,
    z_start: f32,
    z_delta: f32,
}

fn z_window(z_range: RangeAxis, z_start: f32, z_end: f32) -> Result<ZWindow> {
    z_range.validate("z", z_start, true)?;
    z_range.validate("z", z_end, true)?;
    let a = z_range.index_of(z_start);
    let b = z_range.index_of(z_end);
    let (lo, hi) = (a.min(b), a.max(b));
    Ok(ZWindow {
        start_index: lo,
        count: hi - lo + 1,
        z_start: z_range.value(lo),
        z_delta: z_range.delta(),
    })
}

/// Expands a coordinate span into the list of values between `start` and
/// `end`, stepping by the axis delta toward `end`.
fn coordinate_span(range: RangeAxis, start: f32, end: f32) -> Vec<f32> {
    let mut delta = range.delta().abs();
    if end < start {
        delta = -delta;
    }
    let count = 1 + ((end - start) / delta).round() as usize;
    (0..count).map(|i| start + i as f32 * delta).collect()
}

/// Classifies each coordinate of a span: Ok(true) for in-bounds, Ok(false)
/// for out-of-bounds (read as Missing). Off-increment coordinates raise.
fn classify_span(range: RangeAxis, name: &str, values: &[f32]) -> Result<Vec<bool>> {
    values
        .iter()
        .map(|&value| match range.validate(name, value, true) {
            Ok(()) => Ok(true),
            Err(SeisError::OutOfBounds(_)) => Ok(false),
            Err(e) => Err(e),
        })
        .collect()
}

fn window_of(row: ndarray::ArrayView1<'_, f32>, z: &ZWindow) -> Vec<f32> {
    row.iter().skip(z.start_index).take(z.count).copied().collect()
}

fn is_cancelled(cancel: Option<&CancelFlag>) -> bool {
    cancel.is_some_and(CancelFlag::is_cancelled)
}

/// Accessor for a post-stack volume.
pub struct PostStackAccessor<S> {
    store: S,
    geometry: SurveyGeometry,
    indexer: PostStackIndexer,
}

impl<S: FrameStore> PostStackAccessor<S> {
    /// Builds an accessor over the store, resolving `AutoCalculated` storage
    /// orders from the store's axis labels and checking the logical bounds
    /// against the physical shape. The store is opened lazily, read
    /// operations as read and write operations as read-write.
    pub fn new(
        store: S,
        geometry: SurveyGeometry,
        bounds: VolumeBounds,
        order: PostStackOrder,
    ) -> Result<Self> {
        let resolved = order.resolve(store.axis_labels())?;
        debug!(volume = %store.descriptor().name, order = %resolved, "resolved storage order");
        let indexer = PostStackIndexer::new(resolved, bounds, store.axis_lengths())?;
        Ok(Self {
            store,
            geometry,
            indexer,
        })
    }

    pub fn order(&self) -> PostStackOrder {
        self.indexer.order()
    }

    pub fn bounds(&self) -> &VolumeBounds {
        self.indexer.bounds()
    }

    pub fn geometry(&self) -> &SurveyGeometry {
        &self.geometry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn close(&mut self) -> Result<()> {
        self.store.close().await
    }

    fn make_trace(
        &self,
        inline: f32,
        xline: f32,
        z: &ZWindow,
        samples: Vec<f32>,
        status: TraceStatus,
    ) -> Result<Trace> {
        let p = self.geometry.inline_xline_to_xy_checked(inline, xline, false)?;
        Ok(Trace {
            inline,
            xline,
            offset: None,
            z_start: z.z_start,
            z_delta: z.z_delta,
            x: p.x,
            y: p.y,
            samples,
            status,
        })
    }

    fn missing_trace(&self, inline: f32, xline: f32, z: &ZWindow) -> Result<Trace> {
        self.make_trace(inline, xline, z, vec![0.0; z.count], TraceStatus::Missing)
    }

    fn live_or_dead_trace(
        &self,
        inline: f32,
        xline: f32,
        z: &ZWindow,
        samples: Vec<f32>,
    ) -> Result<Trace> {
        let status = Trace::status_of(&samples);
        self.make_trace(inline, xline, z, samples, status)
    }

    /// True when a read along the given role is one frame read: the fixed
    /// role occupies the frame (slowest) axis.
    fn frame_axis_is(&self, role: AxisRole) -> bool {
        self.order().axis_of(role) == Some(2)
    }

    fn require_trace_ordered(&self) -> Result<()> {
        if !self.order().is_trace_ordered() {
            return Err(SeisError::UnsupportedAccess(format!(
                "trace access is not supported for slice-oriented storage order {}",
                self.order()
            )));
        }
        Ok(())
    }

    /// Reads the traces of one inline between two crosslines. One frame read
    /// when the layout stores inlines as frames, a per-trace loop otherwise.
    pub async fn read_inline(
        &mut self,
        inline: f32,
        xline_start: f32,
        xline_end: f32,
        z_start: f32,
        z_end: f32,
    ) -> Result<TraceData> {
        self.require_trace_ordered()?;
        let bounds = self.indexer.bounds().clone();
        bounds.inline().validate("inline", inline, true)?;
        let z = z_window(bounds.z(), z_start, z_end)?;
        let xlines = coordinate_span(bounds.xline(), xline_start, xline_end);
        let in_bounds = classify_span(bounds.xline(), "xline", &xlines)?;

        let mut traces = Vec::with_capacity(xlines.len());
        if !in_bounds.contains(&true) {
            for &xline in &xlines {
                traces.push(self.missing_trace(inline, xline, &z)?);
            }
            return Ok(TraceData::new(traces));
        }

        if self.frame_axis_is(AxisRole::Inline) {
            debug!(inline, plan = "matching", "read_inline as one frame");
            self.store.open_for_read().await?;
            let first = xlines
                .iter()
                .zip(&in_bounds)
                .find(|(_, &ok)| ok)
                .map(|(&xl, _)| xl)
                .unwrap_or(xline_start);
            let position = self.indexer.frame_position(inline, first)?;
            let frame = self.store.read_frame(&position).await?;
            for (&xline, &ok) in xlines.iter().zip(&in_bounds) {
                if !ok || frame.rows_read == 0 {
                    traces.push(self.missing_trace(inline, xline, &z)?);
                } else {
                    let row = bounds.xline().index_of(xline);
                    let samples = window_of(frame.data.row(row), &z);
                    traces.push(self.live_or_dead_trace(inline, xline, &z, samples)?);
                }
            }
        } else {
            debug!(inline, plan = "mismatched", "read_inline trace by trace");
            self.store.open_for_read().await?;
            for (&xline, &ok) in xlines.iter().zip(&in_bounds) {
                if !ok {
                    traces.push(self.missing_trace(inline, xline, &z)?);
                    continue;
                }
                let index = self.indexer.trace_index(inline, xline)?;
                let full = self.store.read_trace(index).await?;
                let samples = full[z.start_index..z.start_index + z.count].to_vec();
                traces.push(self.live_or_dead_trace(inline, xline, &z, samples)?);
            }
        }
        Ok(TraceData::new(traces))
    }

    /// Reads the traces of one crossline between two inlines. Mirror of
    /// [`read_inline`](Self::read_inline).
    pub async fn read_xline(
        &mut self,
        xline: f32,
        inline_start: f32,
        inline_end: f32,
        z_start: f32,
        z_end: f32,
    ) -> Result<TraceData> {
        self.require_trace_ordered()?;
        let bounds = self.indexer.bounds().clone();
        bounds.xline().validate("xline", xline, true)?;
        let z = z_window(bounds.z(), z_start, z_end)?;
        let inlines = coordinate_span(bounds.inline(), inline_start, inline_end);
        let in_bounds = classify_span(bounds.inline(), "inline", &inlines)?;

        let mut traces = Vec::with_capacity(inlines.len());
        if !in_bounds.contains(&true) {
            for &inline in &inlines {
                traces.push(self.missing_trace(inline, xline, &z)?);
            }
            return Ok(TraceData::new(traces));
        }

        if self.frame_axis_is(AxisRole::Xline) {
            debug!(xline, plan = "matching", "read_xline as one frame");
            self.store.open_for_read().await?;
            let first = inlines
                .iter()
                .zip(&in_bounds)
                .find(|(_, &ok)| ok)
                .map(|(&il, _)| il)
                .unwrap_or(inline_start);
            let position = self.indexer.frame_position(first, xline)?;
            let frame = self.store.read_frame(&position).await?;
            for (&inline, &ok) in inlines.iter().zip(&in_bounds) {
                if !ok || frame.rows_read == 0 {
                    traces.push(self.missing_trace(inline, xline, &z)?);
                } else {
                    let row = bounds.inline().index_of(inline);
                    let samples = window_of(frame.data.row(row), &z);
                    traces.push(self.live_or_dead_trace(inline, xline, &z, samples)?);
                }
            }
        } else {
            debug!(xline, plan = "mismatched", "read_xline trace by trace");
            self.store.open_for_read().await?;
            for (&inline, &ok) in inlines.iter().zip(&in_bounds) {
                if !ok {
                    traces.push(self.missing_trace(inline, xline, &z)?);
                    continue;
                }
                let index = self.indexer.trace_index(inline, xline)?;
                let full = self.store.read_trace(index).await?;
                let samples = full[z.start_index..z.start_index + z.count].to_vec();
                traces.push(self.live_or_dead_trace(inline, xline, &z, samples)?);
            }
        }
        Ok(TraceData::new(traces))
    }

    /// Reads an arbitrary list of (inline, xline) locations trace by trace.
    /// Out-of-range locations come back `Missing`; cancellation marks the
    /// remaining locations `Missing` without raising.
    pub async fn read_traces(
        &mut self,
        inlines: &[f32],
        xlines: &[f32],
        z_start: f32,
        z_end: f32,
        cancel: Option<&CancelFlag>,
    ) -> Result<TraceData> {
        self.require_trace_ordered()?;
        if inlines.len() != xlines.len() {
            return Err(SeisError::Validation(
                "The inline and xline arrays must be of same length.".to_string(),
            ));
        }
        let bounds = self.indexer.bounds().clone();
        let z = z_window(bounds.z(), z_start, z_end)?;
        self.store.open_for_read().await?;

        let mut traces = Vec::with_capacity(inlines.len());
        for (&inline, &xline) in inlines.iter().zip(xlines.iter()) {
            let il_ok = matches!(bounds.inline().validate("inline", inline, true), Ok(()));
            let xl_ok = matches!(bounds.xline().validate("xline", xline, true), Ok(()));
            if !il_ok || !xl_ok || is_cancelled(cancel) {
                traces.push(self.missing_trace(inline, xline, &z)?);
                continue;
            }
            let index = self.indexer.trace_index(inline, xline)?;
            let full = self.store.read_trace(index).await?;
            let samples = full[z.start_index..z.start_index + z.count].to_vec();
            traces.push(self.live_or_dead_trace(inline, xline, &z, samples)?);
        }
        Ok(TraceData::new(traces))
    }

    /// Reads a rectangular brick of traces, xline varying fastest, by
    /// delegating to the point-list read.
    pub async fn read_brick(
        &mut self,
        inline_start: f32,
        inline_end: f32,
        xline_start: f32,
        xline_end: f32,
        z_start: f32,
        z_end: f32,
        cancel: Option<&CancelFlag>,
    ) -> Result<TraceData> {
        let bounds = self.indexer.bounds();
        let il_values = coordinate_span(bounds.inline(), inline_start, inline_end);
        let xl_values = coordinate_span(bounds.xline(), xline_start, xline_end);
        let mut inlines = Vec::with_capacity(il_values.len() * xl_values.len());
        let mut xlines = Vec::with_capacity(il_values.len() * xl_values.len());
        for &il in &il_values {
            for &xl in &xl_values {
                inlines.push(il);
                xlines.push(xl);
            }
        }
        self.read_traces(&inlines, &xlines, z_start, z_end, cancel).await
    }

    /// Writes the traces of one inline between two crosslines. One
    /// read-modify-write of the frame when the layout matches, a per-trace
    /// loop otherwise.
    pub async fn write_inline(
        &mut self,
        inline: f32,
        xline_start: f32,
        xline_end: f32,
        z_start: f32,
        z_end: f32,
        data: &TraceData,
    ) -> Result<()> {
        self.require_trace_ordered()?;
        let bounds = self.indexer.bounds().clone();
        bounds.inline().validate("inline", inline, true)?;
        let z = z_window(bounds.z(), z_start, z_end)?;
        let xlines = coordinate_span(bounds.xline(), xline_start, xline_end);
        self.check_write_shape(data, xlines.len(), z.count)?;
        self.store.open_for_read_write().await?;

        if self.frame_axis_is(AxisRole::Inline) {
            debug!(inline, plan = "matching", "write_inline as one frame");
            let position = self.indexer.frame_position(inline, xlines[0])?;
            let mut frame = self.store.read_frame(&position).await?;
            for (&xline, trace) in xlines.iter().zip(data.traces()) {
                bounds.xline().validate("xline", xline, true)?;
                let row = bounds.xline().index_of(xline);
                overlay(&mut frame.data.row_mut(row), z.start_index, &trace.samples);
            }
            let rows = frame.data.nrows();
            self.store.write_frame(&position, rows, &frame.data).await?;
        } else {
            debug!(inline, plan = "mismatched", "write_inline trace by trace");
            for (&xline, trace) in xlines.iter().zip(data.traces()) {
                let index = self.indexer.trace_index(inline, xline)?;
                let mut full = self.store.read_trace(index).await?;
                full[z.start_index..z.start_index + z.count].copy_from_slice(&trace.samples);
                self.store.write_trace(index, &full).await?;
            }
        }
        Ok(())
    }

    /// Writes the traces of one crossline between two inlines. Mirror of
    /// [`write_inline`](Self::write_inline).
    pub async fn write_xline(
        &mut self,
        xline: f32,
        inline_start: f32,
        inline_end: f32,
        z_start: f32,
        z_end: f32,
        data: &TraceData,
    ) -> Result<()> {
        self.require_trace_ordered()?;
        let bounds = self.indexer.bounds().clone();
        bounds.xline().validate("xline", xline, true)?;
        let z = z_window(bounds.z(), z_start, z_end)?;
        let inlines = coordinate_span(bounds.inline(), inline_start, inline_end);
        self.check_write_shape(data, inlines.len(), z.count)?;
        self.store.open_for_read_write().await?;

        if self.frame_axis_is(AxisRole::Xline) {
            debug!(xline, plan = "matching", "write_xline as one frame");
            let position = self.indexer.frame_position(inlines[0], xline)?;
            let mut frame = self.store.read_frame(&position).await?;
            for (&inline, trace) in inlines.iter().zip(data.traces()) {
                bounds.inline().validate("inline", inline, true)?;
                let row = bounds.inline().index_of(inline);
                overlay(&mut frame.data.row_mut(row), z.start_index, &trace.samples);
            }
            let rows = frame.data.nrows();
            self.store.write_frame(&position, rows, &frame.data).await?;
        } else {
            debug!(xline, plan = "mismatched", "write_xline trace by trace");
            for (&inline, trace) in inlines.iter().zip(data.traces()) {
                let index = self.indexer.trace_index(inline, xline)?;
                let mut full = self.store.read_trace(index).await?;
                full[z.start_index..z.start_index + z.count].copy_from_slice(&trace.samples);
                self.store.write_trace(index, &full).await?;
            }
        }
        Ok(())
    }

    /// Writes a collection of traces at arbitrary locations, grouping them
    /// by their frame coordinate so each touched frame is read, overlaid and
    /// written exactly once. `Missing` traces are skipped. Cancellation
    /// stops between frames, leaving frames already written in place.
    pub async fn write_traces(
        &mut self,
        data: &TraceData,
        cancel: Option<&CancelFlag>,
    ) -> Result<()> {
        self.require_trace_ordered()?;
        let bounds = self.indexer.bounds().clone();
        let frame_role = if self.frame_axis_is(AxisRole::Inline) {
            AxisRole::Inline
        } else {
            AxisRole::Xline
        };

        // Group the frame coordinates of all non-missing traces, keeping
        // first-seen order.
        let mut frame_coords: Vec<f32> = Vec::new();
        for trace in data.present() {
            let coord = match frame_role {
                AxisRole::Inline => trace.inline,
                _ => trace.xline,
            };
            if !frame_coords.contains(&coord) {
                frame_coords.push(coord);
            }
        }
        if frame_coords.is_empty() {
            return Ok(());
        }

        self.store.open_for_read_write().await?;
        for coord in frame_coords {
            if is_cancelled(cancel) {
                debug!("write_traces cancelled, stopping between frames");
                return Ok(());
            }
            let (inline, xline, row_range) = match frame_role {
                AxisRole::Inline => (coord, bounds.xline().start(), bounds.xline()),
                _ => (bounds.inline().start(), coord, bounds.inline()),
            };
            let position = self.indexer.frame_position(inline, xline)?;
            let mut frame = self.store.read_frame(&position).await?;
            for trace in data.present() {
                let trace_coord = match frame_role {
                    AxisRole::Inline => trace.inline,
                    _ => trace.xline,
                };
                if trace_coord != coord {
                    continue;
                }
                let (row_coord, name) = match frame_role {
                    AxisRole::Inline => (trace.xline, "xline"),
                    _ => (trace.inline, "inline"),
                };
                row_range.validate(name, row_coord, true)?;
                let row = row_range.index_of(row_coord);
                let z_index = self.indexer.sample_index(trace.z_start)?;
                overlay(&mut frame.data.row_mut(row), z_index, &trace.samples);
            }
            let rows = frame.data.nrows();
            self.store.write_frame(&position, rows, &frame.data).await?;
        }
        Ok(())
    }

    fn check_write_shape(&self, data: &TraceData, traces: usize, samples: usize) -> Result<()> {
        if data.num_traces() != traces {
            return Err(SeisError::Validation(format!(
                "{} traces supplied for a {}-trace span",
                data.num_traces(),
                traces
            )));
        }
        if data.num_traces() > 0 && data.num_samples() != samples {
            return Err(SeisError::Validation(format!(
                "{} samples per trace supplied for a {}-sample z window",
                data.num_samples(),
                samples
            )));
        }
        Ok(())
    }
}

fn overlay(row: &mut ndarray::ArrayViewMut1<'_, f32>, start: usize, samples: &[f32]) {
    for (i, &value) in samples.iter().enumerate() {
        row[start + i] = value;
    }
}

/// Accessor for a pre-stack volume.
pub struct PreStackAccessor<S> {
    store: S,
    geometry: SurveyGeometry,
    indexer: PreStackIndexer,
}

impl<S: FrameStore> PreStackAccessor<S> {
    pub fn new(
        store: S,
        geometry: SurveyGeometry,
        bounds: VolumeBounds,
        order: PreStackOrder,
    ) -> Result<Self> {
        let resolved = order.resolve(store.axis_labels())?;
        debug!(volume = %store.descriptor().name, order = %resolved, "resolved storage order");
        let indexer = PreStackIndexer::new(resolved, bounds, store.axis_lengths())?;
        Ok(Self {
            store,
            geometry,
            indexer,
        })
    }

    pub fn order(&self) -> PreStackOrder {
        self.indexer.order()
    }

    pub fn bounds(&self) -> &VolumeBounds {
        self.indexer.bounds()
    }

    pub fn geometry(&self) -> &SurveyGeometry {
        &self.geometry
    }

    pub async fn close(&mut self) -> Result<()> {
        self.store.close().await
    }

    fn make_trace(
        &self,
        inline: f32,
        xline: f32,
        offset: f32,
        z: &ZWindow,
        samples: Vec<f32>,
        status: TraceStatus,
    ) -> Result<Trace> {
        let p = self.geometry.inline_xline_to_xy_checked(inline, xline, false)?;
        Ok(Trace {
            inline,
            xline,
            offset: Some(offset),
            z_start: z.z_start,
            z_delta: z.z_delta,
            x: p.x,
            y: p.y,
            samples,
            status,
        })
    }

    fn missing_trace(&self, inline: f32, xline: f32, offset: f32, z: &ZWindow) -> Result<Trace> {
        self.make_trace(inline, xline, offset, z, vec![0.0; z.count], TraceStatus::Missing)
    }

    fn live_or_dead_trace(
        &self,
        inline: f32,
        xline: f32,
        offset: f32,
        z: &ZWindow,
        samples: Vec<f32>,
    ) -> Result<Trace> {
        let status = Trace::status_of(&samples);
        self.make_trace(inline, xline, offset, z, samples, status)
    }

    /// Reads an arbitrary list of (inline, xline, offset) locations trace by
    /// trace, with the same `Missing` and cancellation behavior as the
    /// post-stack point-list read.
    pub async fn read_traces(
        &mut self,
        inlines: &[f32],
        xlines: &[f32],
        offsets: &[f32],
        z_start: f32,
        z_end: f32,
        cancel: Option<&CancelFlag>,
    ) -> Result<TraceData> {
        if inlines.len() != xlines.len() || inlines.len() != offsets.len() {
            return Err(SeisError::Validation(
                "The inline, xline and offset arrays must be of same length.".to_string(),
            ));
        }
        let bounds = self.indexer.bounds().clone();
        let offset_range = bounds.range_of(AxisRole::Offset)?;
        let z = z_window(bounds.z(), z_start, z_end)?;
        self.store.open_for_read().await?;

        let mut traces = Vec::with_capacity(inlines.len());
        for i in 0..inlines.len() {
            let (inline, xline, offset) = (inlines[i], xlines[i], offsets[i]);
            let ok = bounds.inline().validate("inline", inline, true).is_ok()
                && bounds.xline().validate("xline", xline, true).is_ok()
                && offset_range.validate("offset", offset, true).is_ok();
            if !ok || is_cancelled(cancel) {
                traces.push(self.missing_trace(inline, xline, offset, &z)?);
                continue;
            }
            let index = self.indexer.trace_index(inline, xline, offset)?;
            let full = self.store.read_trace(index).await?;
            let samples = full[z.start_index..z.start_index + z.count].to_vec();
            traces.push(self.live_or_dead_trace(inline, xline, offset, &z, samples)?);
        }
        Ok(TraceData::new(traces))
    }

    /// Reads all offsets of one (inline, xline) pair. One frame read when
    /// offset is the physical trace axis, otherwise a per-trace fallback.
    pub async fn read_traces_by_inline_xline(
        &mut self,
        inline: f32,
        xline: f32,
        offset_start: f32,
        offset_end: f32,
        z_start: f32,
        z_end: f32,
    ) -> Result<TraceData> {
        let bounds = self.indexer.bounds().clone();
        let offset_range = bounds.range_of(AxisRole::Offset)?;
        let offsets = coordinate_span(offset_range, offset_start, offset_end);
        if self.indexer.role_at(1)? != AxisRole::Offset {
            debug!(inline, xline, plan = "mismatched", "by-pair read trace by trace");
            let inlines = vec![inline; offsets.len()];
            let xlines = vec![xline; offsets.len()];
            return self
                .read_traces(&inlines, &xlines, &offsets, z_start, z_end, None)
                .await;
        }

        debug!(inline, xline, plan = "matching", "by-pair read as one frame");
        bounds.inline().validate("inline", inline, true)?;
        bounds.xline().validate("xline", xline, true)?;
        let z = z_window(bounds.z(), z_start, z_end)?;
        let in_bounds = classify_span(offset_range, "offset", &offsets)?;
        self.store.open_for_read().await?;

        let mut traces = Vec::with_capacity(offsets.len());
        if !in_bounds.contains(&true) {
            for &offset in &offsets {
                traces.push(self.missing_trace(inline, xline, offset, &z)?);
            }
            return Ok(TraceData::new(traces));
        }
        let first = offsets
            .iter()
            .zip(&in_bounds)
            .find(|(_, &ok)| ok)
            .map(|(&off, _)| off)
            .unwrap_or(offset_start);
        let position = self.indexer.frame_position(inline, xline, first)?;
        let frame = self.store.read_frame(&position).await?;
        for (&offset, &ok) in offsets.iter().zip(&in_bounds) {
            if !ok || frame.rows_read == 0 {
                traces.push(self.missing_trace(inline, xline, offset, &z)?);
            } else {
                let row = offset_range.index_of(offset);
                let samples = window_of(frame.data.row(row), &z);
                traces.push(self.live_or_dead_trace(inline, xline, offset, &z, samples)?);
            }
        }
        Ok(TraceData::new(traces))
    }

    /// Reads all crosslines of one (inline, offset) pair. One frame read
    /// when xline is the physical trace axis.
    pub async fn read_traces_by_inline_offset(
        &mut self,
        inline: f32,
        offset: f32,
        xline_start: f32,
        xline_end: f32,
        z_start: f32,
        z_end: f32,
    ) -> Result<TraceData> {
        let bounds = self.indexer.bounds().clone();
        let offset_range = bounds.range_of(AxisRole::Offset)?;
        let xlines = coordinate_span(bounds.xline(), xline_start, xline_end);
        if self.indexer.role_at(1)? != AxisRole::Xline {
            debug!(inline, offset, plan = "mismatched", "by-pair read trace by trace");
            let inlines = vec![inline; xlines.len()];
            let offsets = vec![offset; xlines.len()];
            return self
                .read_traces(&inlines, &xlines, &offsets, z_start, z_end, None)
                .await;
        }

        debug!(inline, offset, plan = "matching", "by-pair read as one frame");
        bounds.inline().validate("inline", inline, true)?;
        offset_range.validate("offset", offset, true)?;
        let z = z_window(bounds.z(), z_start, z_end)?;
        let in_bounds = classify_span(bounds.xline(), "xline", &xlines)?;
        self.store.open_for_read().await?;

        let mut traces = Vec::with_capacity(xlines.len());
        if !in_bounds.contains(&true) {
            for &xline in &xlines {
                traces.push(self.missing_trace(inline, xline, offset, &z)?);
            }
            return Ok(TraceData::new(traces));
        }
        let first = xlines
            .iter()
            .zip(&in_bounds)
            .find(|(_, &ok)| ok)
            .map(|(&xl, _)| xl)
            .unwrap_or(xline_start);
        let position = self.indexer.frame_position(inline, first, offset)?;
        let frame = self.store.read_frame(&position).await?;
        for (&xline, &ok) in xlines.iter().zip(&in_bounds) {
            if !ok || frame.rows_read == 0 {
                traces.push(self.missing_trace(inline, xline, offset, &z)?);
            } else {
                let row = bounds.xline().index_of(xline);
                let samples = window_of(frame.data.row(row), &z);
                traces.push(self.live_or_dead_trace(inline, xline, offset, &z, samples)?);
            }
        }
        Ok(TraceData::new(traces))
    }

    /// Reads all inlines of one (xline, offset) pair. One frame read when
    /// inline is the physical trace axis.
    pub async fn read_traces_by_xline_offset(
        &mut self,
        xline: f32,
        offset: f32,
        inline_start: f32,
        inline_end: f32,
        z_start: f32,
        z_end: f32,
    ) -> Result<TraceData> {
        let bounds = self.indexer.bounds().clone();
        let offset_range = bounds.range_of(AxisRole::Offset)?;
        let inlines = coordinate_span(bounds.inline(), inline_start, inline_end);
        if self.indexer.role_at(1)? != AxisRole::Inline {
            debug!(xline, offset, plan = "mismatched", "by-pair read trace by trace");
            let xlines = vec![xline; inlines.len()];
            let offsets = vec![offset; inlines.len()];
            return self
                .read_traces(&inlines, &xlines, &offsets, z_start, z_end, None)
                .await;
        }

        debug!(xline, offset, plan = "matching", "by-pair read as one frame");
        bounds.xline().validate("xline", xline, true)?;
        offset_range.validate("offset", offset, true)?;
        let z = z_window(bounds.z(), z_start, z_end)?;
        let in_bounds = classify_span(bounds.inline(), "inline", &inlines)?;
        self.store.open_for_read().await?;

        let mut traces = Vec::with_capacity(inlines.len());
        if !in_bounds.contains(&true) {
            for &inline in &inlines {
                traces.push(self.missing_trace(inline, xline, offset, &z)?);
            }
            return Ok(TraceData::new(traces));
        }
        let first = inlines
            .iter()
            .zip(&in_bounds)
            .find(|(_, &ok)| ok)
            .map(|(&il, _)| il)
            .unwrap_or(inline_start);
        let position = self.indexer.frame_position(first, xline, offset)?;
        let frame = self.store.read_frame(&position).await?;
        for (&inline, &ok) in inlines.iter().zip(&in_bounds) {
            if !ok || frame.rows_read == 0 {
                traces.push(self.missing_trace(inline, xline, offset, &z)?);
            } else {
                let row = bounds.inline().index_of(inline);
                let samples = window_of(frame.data.row(row), &z);
                traces.push(self.live_or_dead_trace(inline, xline, offset, &z, samples)?);
            }
        }
        Ok(TraceData::new(traces))
    }

    /// Writes a collection of traces at arbitrary locations, trace by trace.
    /// `Missing` traces are skipped; cancellation stops between traces.
    pub async fn write_traces(
        &mut self,
        data: &TraceData,
        cancel: Option<&CancelFlag>,
    ) -> Result<()> {
        self.store.open_for_read_write().await?;
        for trace in data.present() {
            if is_cancelled(cancel) {
                debug!("write_traces cancelled, stopping between traces");
                return Ok(());
            }
            let offset = trace.offset.ok_or_else(|| {
                SeisError::Validation("pre-stack trace carries no offset coordinate".to_string())
            })?;
            let index = self.indexer.trace_index(trace.inline, trace.xline, offset)?;
            let z_index = self.indexer.sample_index(trace.z_start)?;
            let mut full = self.store.read_trace(index).await?;
            full[z_index..z_index + trace.samples.len()].copy_from_slice(&trace.samples);
            self.store.write_trace(index, &full).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{CornerPoints, Point2, SurveyOrientation};
    use crate::metadata::DatasetDescriptor;
    use crate::store::MemoryFrameStore;

    fn test_geometry() -> SurveyGeometry {
        SurveyGeometry::new(
            "survey-a",
            RangeAxis::new(100.0, 104.0, 1.0).unwrap(),
            RangeAxis::new(200.0, 205.0, 1.0).unwrap(),
            CornerPoints::new([
                Point2::new(0.0, 0.0),
                Point2::new(500.0, 0.0),
                Point2::new(500.0, 400.0),
                Point2::new(0.0, 400.0),
            ]),
            SurveyOrientation::RowIsInline,
        )
    }

    fn post_bounds() -> VolumeBounds {
        VolumeBounds::post_stack(
            RangeAxis::new(100.0, 104.0, 1.0).unwrap(),
            RangeAxis::new(200.0, 205.0, 1.0).unwrap(),
            RangeAxis::new(0.0, 12.0, 4.0).unwrap(),
        )
    }

    fn post_store(order: PostStackOrder) -> MemoryFrameStore {
        // 4 samples, 6 xlines, 5 inlines, permuted per order.
        let mut lengths = vec![0; 3];
        lengths[order.axis_of(AxisRole::Z).unwrap()] = 4;
        lengths[order.axis_of(AxisRole::Xline).unwrap()] = 6;
        lengths[order.axis_of(AxisRole::Inline).unwrap()] = 5;
        let labels = {
            let mut labels = vec![String::new(); 3];
            labels[order.axis_of(AxisRole::Z).unwrap()] = "TIME".to_string();
            labels[order.axis_of(AxisRole::Xline).unwrap()] = "XLINE_NO".to_string();
            labels[order.axis_of(AxisRole::Inline).unwrap()] = "INLINE_NO".to_string();
            labels
        };
        MemoryFrameStore::new(DatasetDescriptor::new("survey-a", labels, lengths).unwrap())
    }

    fn post_accessor(order: PostStackOrder) -> PostStackAccessor<MemoryFrameStore> {
        PostStackAccessor::new(post_store(order), test_geometry(), post_bounds(), order).unwrap()
    }

    fn make_trace(inline: f32, xline: f32, samples: Vec<f32>) -> Trace {
        Trace {
            inline,
            xline,
            offset: None,
            z_start: 0.0,
            z_delta: 4.0,
            x: 0.0,
            y: 0.0,
            status: Trace::status_of(&samples),
            samples,
        }
    }

    fn ramp(base: f32) -> Vec<f32> {
        vec![base, base + 1.0, base + 2.0, base + 3.0]
    }

    #[tokio::test]
    async fn read_inline_clips_out_of_range_xlines_to_missing() {
        let mut accessor = post_accessor(PostStackOrder::InlineXlineZ);
        let written = TraceData::new(
            (0..6).map(|i| make_trace(100.0, 200.0 + i as f32, ramp(i as f32 * 10.0))).collect(),
        );
        accessor
            .write_inline(100.0, 200.0, 205.0, 0.0, 12.0, &written)
            .await
            .unwrap();

        // Request two crosslines below and one above the stored range.
        let data = accessor
            .read_inline(100.0, 198.0, 206.0, 0.0, 12.0)
            .await
            .unwrap();
        assert_eq!(data.num_traces(), 9);
        for (i, trace) in data.traces().iter().enumerate() {
            let xline = 198.0 + i as f32;
            assert_eq!(trace.xline, xline);
            if (200.0..=205.0).contains(&xline) {
                assert_eq!(trace.status, TraceStatus::Live);
                assert_eq!(trace.samples, ramp((xline - 200.0) * 10.0));
            } else {
                assert_eq!(trace.status, TraceStatus::Missing);
                assert_eq!(trace.samples, vec![0.0; 4]);
            }
        }
    }

    #[tokio::test]
    async fn unwritten_frame_reads_as_missing_span() {
        let mut accessor = post_accessor(PostStackOrder::InlineXlineZ);
        let data = accessor
            .read_inline(102.0, 200.0, 205.0, 0.0, 12.0)
            .await
            .unwrap();
        assert!(data.traces().iter().all(|t| t.status == TraceStatus::Missing));
    }

    #[tokio::test]
    async fn matching_and_mismatched_plans_agree() {
        // The same logical content stored inline-major and xline-major must
        // read back identically through every access path.
        let mut a = post_accessor(PostStackOrder::InlineXlineZ);
        let mut b = post_accessor(PostStackOrder::XlineInlineZ);
        for il in 0..5 {
            let inline = 100.0 + il as f32;
            let written = TraceData::new(
                (0..6)
                    .map(|xl| make_trace(inline, 200.0 + xl as f32, ramp((il * 6 + xl) as f32)))
                    .collect(),
            );
            a.write_inline(inline, 200.0, 205.0, 0.0, 12.0, &written).await.unwrap();
            b.write_inline(inline, 200.0, 205.0, 0.0, 12.0, &written).await.unwrap();
        }

        let from_a = a.read_xline(203.0, 100.0, 104.0, 0.0, 12.0).await.unwrap();
        let from_b = b.read_xline(203.0, 100.0, 104.0, 0.0, 12.0).await.unwrap();
        assert_eq!(from_a.num_traces(), 5);
        for (ta, tb) in from_a.traces().iter().zip(from_b.traces()) {
            assert_eq!(ta.samples, tb.samples);
            assert_eq!(ta.samples, ramp((ta.inline - 100.0) * 6.0 + 3.0));
            assert_eq!(ta.status, TraceStatus::Live);
        }
    }

    #[tokio::test]
    async fn read_z_window_subsets_samples() {
        let mut accessor = post_accessor(PostStackOrder::InlineXlineZ);
        let written = TraceData::new(vec![make_trace(101.0, 202.0, ramp(40.0))]);
        accessor
            .write_inline(101.0, 202.0, 202.0, 0.0, 12.0, &written)
            .await
            .unwrap();

        let data = accessor
            .read_inline(101.0, 202.0, 202.0, 4.0, 8.0)
            .await
            .unwrap();
        let trace = &data.traces()[0];
        assert_eq!(trace.z_start, 4.0);
        assert_eq!(trace.samples, vec![41.0, 42.0]);
    }

    #[tokio::test]
    async fn write_traces_groups_by_frame() {
        let mut accessor = post_accessor(PostStackOrder::InlineXlineZ);
        // Scattered traces over two inlines, plus a missing one to skip.
        let mut missing = make_trace(104.0, 205.0, vec![0.0; 4]);
        missing.status = TraceStatus::Missing;
        let data = TraceData::new(vec![
            make_trace(100.0, 201.0, ramp(1.0)),
            make_trace(102.0, 200.0, ramp(2.0)),
            make_trace(100.0, 204.0, ramp(3.0)),
            missing,
        ]);
        accessor.write_traces(&data, None).await.unwrap();

        let back = accessor
            .read_traces(&[100.0, 102.0, 100.0], &[201.0, 200.0, 204.0], 0.0, 12.0, None)
            .await
            .unwrap();
        assert_eq!(back.traces()[0].samples, ramp(1.0));
        assert_eq!(back.traces()[1].samples, ramp(2.0));
        assert_eq!(back.traces()[2].samples, ramp(3.0));
        // The skipped location was never written.
        let skipped = accessor
            .read_traces(&[104.0], &[205.0], 0.0, 12.0, None)
            .await
            .unwrap();
        assert_eq!(skipped.traces()[0].status, TraceStatus::Missing);
    }

    #[tokio::test]
    async fn read_brick_orders_xline_fastest() {
        let mut accessor = post_accessor(PostStackOrder::InlineXlineZ);
        let data = accessor
            .read_brick(100.0, 101.0, 200.0, 202.0, 0.0, 12.0, None)
            .await
            .unwrap();
        let coords: Vec<(f32, f32)> = data.traces().iter().map(|t| (t.inline, t.xline)).collect();
        assert_eq!(
            coords,
            vec![
                (100.0, 200.0),
                (100.0, 201.0),
                (100.0, 202.0),
                (101.0, 200.0),
                (101.0, 201.0),
                (101.0, 202.0),
            ]
        );
    }

    #[tokio::test]
    async fn slice_oriented_order_refuses_trace_access() {
        let mut accessor = post_accessor(PostStackOrder::ZInlineXline);
        assert!(matches!(
            accessor.read_inline(100.0, 200.0, 205.0, 0.0, 12.0).await,
            Err(SeisError::UnsupportedAccess(_))
        ));
        assert!(matches!(
            accessor.write_traces(&TraceData::default(), None).await,
            Err(SeisError::UnsupportedAccess(_))
        ));
    }

    #[tokio::test]
    async fn cancelled_read_marks_remaining_missing() {
        let mut accessor = post_accessor(PostStackOrder::InlineXlineZ);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let data = accessor
            .read_traces(&[100.0, 101.0], &[200.0, 201.0], 0.0, 12.0, Some(&cancel))
            .await
            .unwrap();
        assert!(data.traces().iter().all(|t| t.status == TraceStatus::Missing));
    }

    #[tokio::test]
    async fn off_increment_coordinate_rejected() {
        let mut accessor = post_accessor(PostStackOrder::InlineXlineZ);
        assert!(matches!(
            accessor.read_inline(100.5, 200.0, 205.0, 0.0, 12.0).await,
            Err(SeisError::Validation(_))
        ));
        assert!(matches!(
            accessor.read_inline(100.0, 200.0, 205.0, 1.0, 12.0).await,
            Err(SeisError::Validation(_))
        ));
    }

    fn pre_bounds() -> VolumeBounds {
        VolumeBounds::pre_stack(
            RangeAxis::new(100.0, 102.0, 1.0).unwrap(),
            RangeAxis::new(200.0, 203.0, 1.0).unwrap(),
            RangeAxis::new(0.0, 400.0, 100.0).unwrap(),
            RangeAxis::new(0.0, 12.0, 4.0).unwrap(),
        )
    }

    fn pre_accessor(order: PreStackOrder) -> PreStackAccessor<MemoryFrameStore> {
        // 4 samples, 5 offsets, 4 xlines, 3 inlines, permuted per order.
        let mut lengths = vec![0; 4];
        lengths[order.axis_of(AxisRole::Z).unwrap()] = 4;
        lengths[order.axis_of(AxisRole::Offset).unwrap()] = 5;
        lengths[order.axis_of(AxisRole::Xline).unwrap()] = 4;
        lengths[order.axis_of(AxisRole::Inline).unwrap()] = 3;
        let mut labels = vec![String::new(); 4];
        labels[order.axis_of(AxisRole::Z).unwrap()] = "TIME".to_string();
        labels[order.axis_of(AxisRole::Offset).unwrap()] = "OFFSET".to_string();
        labels[order.axis_of(AxisRole::Xline).unwrap()] = "XLINE_NO".to_string();
        labels[order.axis_of(AxisRole::Inline).unwrap()] = "INLINE_NO".to_string();
        let store =
            MemoryFrameStore::new(DatasetDescriptor::new("gathers", labels, lengths).unwrap());
        PreStackAccessor::new(store, test_geometry(), pre_bounds(), order).unwrap()
    }

    fn pre_trace(inline: f32, xline: f32, offset: f32, samples: Vec<f32>) -> Trace {
        Trace {
            inline,
            xline,
            offset: Some(offset),
            z_start: 0.0,
            z_delta: 4.0,
            x: 0.0,
            y: 0.0,
            status: Trace::status_of(&samples),
            samples,
        }
    }

    async fn fill_gather(accessor: &mut PreStackAccessor<MemoryFrameStore>) {
        let mut traces = Vec::new();
        for il in 0..3 {
            for xl in 0..4 {
                for off in 0..5 {
                    traces.push(pre_trace(
                        100.0 + il as f32,
                        200.0 + xl as f32,
                        off as f32 * 100.0,
                        ramp((il * 20 + xl * 5 + off) as f32),
                    ));
                }
            }
        }
        accessor.write_traces(&TraceData::new(traces), None).await.unwrap();
    }

    #[tokio::test]
    async fn by_pair_read_agrees_across_orders() {
        // Offset-fastest order serves the gather as one frame; an
        // inline-fastest order falls back to per-trace reads. Same result.
        let mut frame_wise = pre_accessor(PreStackOrder::InlineXlineOffsetZ);
        let mut trace_wise = pre_accessor(PreStackOrder::XlineOffsetInlineZ);
        fill_gather(&mut frame_wise).await;
        fill_gather(&mut trace_wise).await;

        let a = frame_wise
            .read_traces_by_inline_xline(101.0, 202.0, 0.0, 400.0, 0.0, 12.0)
            .await
            .unwrap();
        let b = trace_wise
            .read_traces_by_inline_xline(101.0, 202.0, 0.0, 400.0, 0.0, 12.0)
            .await
            .unwrap();
        assert_eq!(a.num_traces(), 5);
        for (off, (ta, tb)) in a.traces().iter().zip(b.traces()).enumerate() {
            assert_eq!(ta.offset, Some(off as f32 * 100.0));
            assert_eq!(ta.samples, ramp((20 + 10 + off) as f32));
            assert_eq!(ta.samples, tb.samples);
        }
    }

    #[tokio::test]
    async fn by_inline_offset_reads_crossline_fan() {
        let mut accessor = pre_accessor(PreStackOrder::InlineOffsetXlineZ);
        fill_gather(&mut accessor).await;
        let data = accessor
            .read_traces_by_inline_offset(102.0, 300.0, 200.0, 203.0, 0.0, 12.0)
            .await
            .unwrap();
        assert_eq!(data.num_traces(), 4);
        for (xl, trace) in data.traces().iter().enumerate() {
            assert_eq!(trace.xline, 200.0 + xl as f32);
            assert_eq!(trace.samples, ramp((40 + xl * 5 + 3) as f32));
        }
    }

    #[tokio::test]
    async fn by_pair_read_clips_offsets_to_missing() {
        let mut accessor = pre_accessor(PreStackOrder::InlineXlineOffsetZ);
        fill_gather(&mut accessor).await;
        let data = accessor
            .read_traces_by_inline_xline(100.0, 200.0, 0.0, 500.0, 0.0, 12.0)
            .await
            .unwrap();
        assert_eq!(data.num_traces(), 6);
        assert_eq!(data.traces()[5].status, TraceStatus::Missing);
        assert_eq!(data.traces()[0].samples, ramp(0.0));
    }
}
