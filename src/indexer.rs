//! Trace indexing - converts logical coordinates to physical frame positions
//! and linear trace indices, following the volume's storage order.
//!
//! Index composition is row-major over the physical permutation: walk the
//! physical axes slowest first, skipping the sample axis, and fold each
//! logical index in. One composition covers every trace-oriented order; the
//! order's role table supplies the permutation.

use crate::error::{Result, SeisError};
use crate::order::{AxisRole, PostStackOrder, PreStackOrder};
use crate::range::RangeAxis;

/// Logical bounds of a volume: one [`RangeAxis`] per logical axis. Pre-stack
/// volumes carry an offset axis, post-stack volumes do not.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeBounds {
    inline: RangeAxis,
    xline: RangeAxis,
    offset: Option<RangeAxis>,
    z: RangeAxis,
}

impl VolumeBounds {
    pub fn post_stack(inline: RangeAxis, xline: RangeAxis, z: RangeAxis) -> Self {
        Self {
            inline,
            xline,
            offset: None,
            z,
        }
    }

    pub fn pre_stack(inline: RangeAxis, xline: RangeAxis, offset: RangeAxis, z: RangeAxis) -> Self {
        Self {
            inline,
            xline,
            offset: Some(offset),
            z,
        }
    }

    pub fn inline(&self) -> RangeAxis {
        self.inline
    }

    pub fn xline(&self) -> RangeAxis {
        self.xline
    }

    pub fn offset(&self) -> Option<RangeAxis> {
        self.offset
    }

    pub fn z(&self) -> RangeAxis {
        self.z
    }

    pub fn range_of(&self, role: AxisRole) -> Result<RangeAxis> {
        match role {
            AxisRole::Inline => Ok(self.inline),
            AxisRole::Xline => Ok(self.xline),
            AxisRole::Z => Ok(self.z),
            AxisRole::Offset => self.offset.ok_or_else(|| {
                SeisError::Validation("volume bounds carry no offset axis".to_string())
            }),
        }
    }
}

/// Indexer for a post-stack volume with a concrete storage order.
#[derive(Debug, Clone)]
pub struct PostStackIndexer {
    order: PostStackOrder,
    bounds: VolumeBounds,
}

impl PostStackIndexer {
    /// Builds an indexer, checking that the order is concrete and that the
    /// logical bounds agree with the store's physical axis lengths (fastest
    /// axis first).
    pub fn new(
        order: PostStackOrder,
        bounds: VolumeBounds,
        axis_lengths: &[usize],
    ) -> Result<Self> {
        if order == PostStackOrder::AutoCalculated {
            return Err(SeisError::Validation(
                "storage order must be resolved before indexing".to_string(),
            ));
        }
        let indexer = Self { order, bounds };
        for role in [AxisRole::Inline, AxisRole::Xline, AxisRole::Z] {
            indexer.check_axis_length(role, indexer.axis_of(role)?, axis_lengths)?;
        }
        Ok(indexer)
    }

    pub fn order(&self) -> PostStackOrder {
        self.order
    }

    pub fn bounds(&self) -> &VolumeBounds {
        &self.bounds
    }

    fn axis_of(&self, role: AxisRole) -> Result<usize> {
        self.order.axis_of(role).ok_or_else(|| {
            SeisError::Validation(format!("storage order {} carries no {:?} axis", self.order, role))
        })
    }

    fn check_axis_length(&self, role: AxisRole, phys: usize, lengths: &[usize]) -> Result<()> {
        let expected = self.bounds.range_of(role)?.num_steps();
        let actual = lengths.get(phys).copied().unwrap_or(0);
        if expected != actual {
            return Err(SeisError::Validation(format!(
                "{:?} axis holds {} values but physical axis {} holds {}",
                role, expected, phys, actual
            )));
        }
        Ok(())
    }

    fn role_at(&self, phys: usize) -> Result<AxisRole> {
        [AxisRole::Inline, AxisRole::Xline, AxisRole::Z]
            .into_iter()
            .find(|&role| self.order.axis_of(role) == Some(phys))
            .ok_or_else(|| {
                SeisError::Validation(format!(
                    "storage order {} carries no physical axis {}",
                    self.order, phys
                ))
            })
    }

    fn require_trace_ordered(&self) -> Result<()> {
        if !self.order.is_trace_ordered() {
            return Err(SeisError::UnsupportedAccess(format!(
                "trace access is not supported for slice-oriented storage order {}",
                self.order
            )));
        }
        Ok(())
    }

    /// Step index of an in-bounds, on-increment coordinate along one role.
    fn index_of(&self, role: AxisRole, name: &str, value: f32) -> Result<usize> {
        let range = self.bounds.range_of(role)?;
        range.validate(name, value, true)?;
        Ok(range.index_of(value))
    }

    /// Sample index of a z coordinate within a trace.
    pub fn sample_index(&self, z: f32) -> Result<usize> {
        self.index_of(AxisRole::Z, "z", z)
    }

    /// Full physical position vector (fastest axis first) with each logical
    /// index at its physical slot and the sample slot zero.
    pub fn order_position(&self, inline: f32, xline: f32) -> Result<Vec<usize>> {
        self.require_trace_ordered()?;
        let mut position = vec![0; 3];
        position[self.axis_of(AxisRole::Inline)?] = self.index_of(AxisRole::Inline, "inline", inline)?;
        position[self.axis_of(AxisRole::Xline)?] = self.index_of(AxisRole::Xline, "xline", xline)?;
        Ok(position)
    }

    /// Physical position of the frame holding the given location: the trace
    /// and sample slots are zero, the frame (slowest) slot is set.
    pub fn frame_position(&self, inline: f32, xline: f32) -> Result<Vec<usize>> {
        let mut position = self.order_position(inline, xline)?;
        position[1] = 0;
        Ok(position)
    }

    /// Index of the trace within its frame (the position along the physical
    /// trace axis).
    pub fn trace_in_frame(&self, inline: f32, xline: f32) -> Result<usize> {
        self.require_trace_ordered()?;
        let role = self.role_at(1)?;
        let (name, value) = match role {
            AxisRole::Inline => ("inline", inline),
            _ => ("xline", xline),
        };
        self.index_of(role, name, value)
    }

    /// Linear trace index over the whole volume, row-major over the physical
    /// permutation.
    pub fn trace_index(&self, inline: f32, xline: f32) -> Result<usize> {
        self.require_trace_ordered()?;
        let mut index = 0;
        for phys in (1..3).rev() {
            let role = self.role_at(phys)?;
            let (name, value) = match role {
                AxisRole::Inline => ("inline", inline),
                _ => ("xline", xline),
            };
            index = index * self.bounds.range_of(role)?.num_steps()
                + self.index_of(role, name, value)?;
        }
        Ok(index)
    }
}

/// Indexer for a pre-stack volume with a concrete storage order.
#[derive(Debug, Clone)]
pub struct PreStackIndexer {
    order: PreStackOrder,
    bounds: VolumeBounds,
}

impl PreStackIndexer {
    pub fn new(order: PreStackOrder, bounds: VolumeBounds, axis_lengths: &[usize]) -> Result<Self> {
        if order == PreStackOrder::AutoCalculated {
            return Err(SeisError::Validation(
                "storage order must be resolved before indexing".to_string(),
            ));
        }
        if bounds.offset().is_none() {
            return Err(SeisError::Validation(
                "pre-stack volume bounds require an offset axis".to_string(),
            ));
        }
        let indexer = Self { order, bounds };
        for role in [AxisRole::Inline, AxisRole::Xline, AxisRole::Offset, AxisRole::Z] {
            let phys = indexer.axis_of(role)?;
            let expected = indexer.bounds.range_of(role)?.num_steps();
            let actual = axis_lengths.get(phys).copied().unwrap_or(0);
            if expected != actual {
                return Err(SeisError::Validation(format!(
                    "{:?} axis holds {} values but physical axis {} holds {}",
                    role, expected, phys, actual
                )));
            }
        }
        Ok(indexer)
    }

    pub fn order(&self) -> PreStackOrder {
        self.order
    }

    pub fn bounds(&self) -> &VolumeBounds {
        &self.bounds
    }

    fn axis_of(&self, role: AxisRole) -> Result<usize> {
        self.order.axis_of(role).ok_or_else(|| {
            SeisError::Validation(format!("storage order {} carries no {:?} axis", self.order, role))
        })
    }

    /// Logical role occupying the given physical axis.
    pub fn role_at(&self, phys: usize) -> Result<AxisRole> {
        [AxisRole::Inline, AxisRole::Xline, AxisRole::Offset, AxisRole::Z]
            .into_iter()
            .find(|&role| self.order.axis_of(role) == Some(phys))
            .ok_or_else(|| {
                SeisError::Validation(format!(
                    "storage order {} carries no physical axis {}",
                    self.order, phys
                ))
            })
    }

    fn index_of(&self, role: AxisRole, name: &str, value: f32) -> Result<usize> {
        let range = self.bounds.range_of(role)?;
        range.validate(name, value, true)?;
        Ok(range.index_of(value))
    }

    fn coord(role: AxisRole, inline: f32, xline: f32, offset: f32) -> (&'static str, f32) {
        match role {
            AxisRole::Inline => ("inline", inline),
            AxisRole::Xline => ("xline", xline),
            _ => ("offset", offset),
        }
    }

    pub fn sample_index(&self, z: f32) -> Result<usize> {
        self.index_of(AxisRole::Z, "z", z)
    }

    /// Full physical position vector with the sample slot zero.
    pub fn order_position(&self, inline: f32, xline: f32, offset: f32) -> Result<Vec<usize>> {
        let mut position = vec![0; 4];
        position[self.axis_of(AxisRole::Inline)?] = self.index_of(AxisRole::Inline, "inline", inline)?;
        position[self.axis_of(AxisRole::Xline)?] = self.index_of(AxisRole::Xline, "xline", xline)?;
        position[self.axis_of(AxisRole::Offset)?] = self.index_of(AxisRole::Offset, "offset", offset)?;
        Ok(position)
    }

    /// Physical position of the frame holding the given location.
    pub fn frame_position(&self, inline: f32, xline: f32, offset: f32) -> Result<Vec<usize>> {
        let mut position = self.order_position(inline, xline, offset)?;
        position[1] = 0;
        Ok(position)
    }

    /// Index of the trace within its frame.
    pub fn trace_in_frame(&self, inline: f32, xline: f32, offset: f32) -> Result<usize> {
        let role = self.role_at(1)?;
        let (name, value) = Self::coord(role, inline, xline, offset);
        self.index_of(role, name, value)
    }

    /// Linear trace index over the whole volume.
    pub fn trace_index(&self, inline: f32, xline: f32, offset: f32) -> Result<usize> {
        let mut index = 0;
        for phys in (1..4).rev() {
            let role = self.role_at(phys)?;
            let (name, value) = Self::coord(role, inline, xline, offset);
            index = index * self.bounds.range_of(role)?.num_steps()
                + self.index_of(role, name, value)?;
        }
        Ok(index)
    }
}
