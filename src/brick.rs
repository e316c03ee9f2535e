//! Bricked traversal of a post-stack volume - partitions the inline/xline/z
//! index space into rectangular cursors of bounded size and walks them in a
//! configurable axis order.
//!
//! Axis indices are fixed: 0 = inline, 1 = xline, 2 = z. The iteration order
//! decides which of the three advances fastest; the cursor shape decides how
//! much of the volume one step covers. Shapes are clipped at the volume edge,
//! so the union of all cursors is exactly the volume with no overlap.

use crate::error::Result;
use crate::range::RangeAxis;

/// Which axis advances slowest/fastest while iterating. `Axis1Axis2Axis3`
/// means axis 0 slowest and axis 2 fastest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisIterationOrder {
    #[default]
    Axis1Axis2Axis3,
    Axis1Axis3Axis2,
    Axis2Axis1Axis3,
    Axis2Axis3Axis1,
    Axis3Axis1Axis2,
    Axis3Axis2Axis1,
}

impl AxisIterationOrder {
    /// (slow, medium, fast) axis indices.
    fn axes(self) -> (usize, usize, usize) {
        match self {
            AxisIterationOrder::Axis1Axis2Axis3 => (0, 1, 2),
            AxisIterationOrder::Axis1Axis3Axis2 => (0, 2, 1),
            AxisIterationOrder::Axis2Axis1Axis3 => (1, 0, 2),
            AxisIterationOrder::Axis2Axis3Axis1 => (1, 2, 0),
            AxisIterationOrder::Axis3Axis1Axis2 => (2, 0, 1),
            AxisIterationOrder::Axis3Axis2Axis1 => (2, 1, 0),
        }
    }
}

/// Cursor-based iterator over the bricks of a volume geometry.
#[derive(Debug, Clone)]
pub struct BrickIterator {
    inline_range: RangeAxis,
    xline_range: RangeAxis,
    z_range: RangeAxis,
    order: AxisIterationOrder,
    cursor_start: [usize; 3],
    cursor_max_shape: [usize; 3],
    max_brick_index: [usize; 3],
    done: bool,
}

impl BrickIterator {
    /// Builds an iterator over the full volume geometry. The initial cursor
    /// shape covers the whole volume; size it down with
    /// [`set_cursor_max_shape`](Self::set_cursor_max_shape) or
    /// [`auto_size_cursor_shape`](Self::auto_size_cursor_shape).
    pub fn new(inline_range: RangeAxis, xline_range: RangeAxis, z_range: RangeAxis) -> Self {
        let max_brick_index = [
            inline_range.num_steps() - 1,
            xline_range.num_steps() - 1,
            z_range.num_steps() - 1,
        ];
        Self {
            inline_range,
            xline_range,
            z_range,
            order: AxisIterationOrder::default(),
            cursor_start: [0; 3],
            cursor_max_shape: [
                max_brick_index[0] + 1,
                max_brick_index[1] + 1,
                max_brick_index[2] + 1,
            ],
            max_brick_index,
            done: false,
        }
    }

    pub fn axis_iteration_order(&self) -> AxisIterationOrder {
        self.order
    }

    pub fn set_axis_iteration_order(&mut self, order: AxisIterationOrder) {
        self.order = order;
    }

    /// Sets the maximum cursor shape as (inline, xline, z) value counts.
    pub fn set_cursor_max_shape(&mut self, il_num: usize, xl_num: usize, z_num: usize) {
        self.cursor_max_shape = [il_num, xl_num, z_num];
    }

    /// Sizes the cursor to hold at most `max_num_values` samples, favoring
    /// full runs along the fast axis, then full planes, then whole-volume
    /// slabs along the slow axis.
    pub fn auto_size_cursor_shape(&mut self, max_num_values: usize) {
        let (axis1, axis2, axis3) = self.order.axes();
        let c1 = self.max_brick_index[axis1] + 1;
        let c2 = self.max_brick_index[axis2] + 1;
        let c3 = self.max_brick_index[axis3] + 1;
        let c23 = c2 as u64 * c3 as u64;
        let c123 = c1 as u64 * c23;

        if max_num_values < c3 {
            // Less than one run along the fast axis.
            self.cursor_max_shape[axis1] = 1;
            self.cursor_max_shape[axis2] = 1;
            self.cursor_max_shape[axis3] = max_num_values;
        } else if (max_num_values as u64) < c23 {
            // Less than one plane.
            self.cursor_max_shape[axis1] = 1;
            self.cursor_max_shape[axis2] = max_num_values / c3;
            self.cursor_max_shape[axis3] = c3;
        } else if (max_num_values as u64) < c123 {
            // At least one plane, less than the whole volume.
            self.cursor_max_shape[axis1] = (max_num_values as u64 / c23) as usize;
            self.cursor_max_shape[axis2] = c2;
            self.cursor_max_shape[axis3] = c3;
        } else {
            self.cursor_max_shape[axis1] = c1;
            self.cursor_max_shape[axis2] = c2;
            self.cursor_max_shape[axis3] = c3;
        }
    }

    /// Shrinks the cursor shape as far as possible without changing the
    /// number of iterations along any axis.
    pub fn optimize_cursor_max_shape(&mut self) {
        for i in 0..3 {
            let num_iterations = self.max_brick_index[i] / self.cursor_max_shape[i] + 1;
            let r = num_iterations * self.cursor_max_shape[i] - (self.max_brick_index[i] + 1);
            self.cursor_max_shape[i] -= r / num_iterations;
        }
    }

    pub fn cursor_max_shape(&self) -> [usize; 3] {
        self.cursor_max_shape
    }

    pub fn reset(&mut self) {
        self.cursor_start = [0; 3];
        self.done = false;
    }

    pub fn has_next(&self) -> bool {
        !self.done
    }

    /// Advances the cursor one brick, carrying from the fast axis to the
    /// medium and slow axes at the volume edges. Returns false once every
    /// brick has been visited.
    pub fn next(&mut self) -> bool {
        let (axis1, axis2, axis3) = self.order.axes();
        if self.cursor_start[axis3] + self.cursor_max_shape[axis3] > self.max_brick_index[axis3] {
            if self.cursor_start[axis2] + self.cursor_max_shape[axis2] > self.max_brick_index[axis2]
            {
                if self.cursor_start[axis1] + self.cursor_max_shape[axis1]
                    > self.max_brick_index[axis1]
                {
                    self.done = true;
                    return false;
                }
                self.cursor_start[axis1] += self.cursor_max_shape[axis1];
                self.cursor_start[axis2] = 0;
                self.cursor_start[axis3] = 0;
            } else {
                self.cursor_start[axis2] += self.cursor_max_shape[axis2];
                self.cursor_start[axis3] = 0;
            }
        } else {
            self.cursor_start[axis3] += self.cursor_max_shape[axis3];
        }
        true
    }

    pub fn cursor_start(&self) -> [usize; 3] {
        self.cursor_start
    }

    fn clipped_end(&self, axis: usize) -> usize {
        (self.cursor_start[axis] + self.cursor_max_shape[axis] - 1).min(self.max_brick_index[axis])
    }

    /// Shape of the current cursor, clipped at the volume edge. Use this,
    /// not the max shape, when processing bricks.
    pub fn cursor_shape(&self) -> [usize; 3] {
        [
            self.clipped_end(0) - self.cursor_start[0] + 1,
            self.clipped_end(1) - self.cursor_start[1] + 1,
            self.clipped_end(2) - self.cursor_start[2] + 1,
        ]
    }

    fn cursor_range(&self, full: RangeAxis, axis: usize) -> Result<RangeAxis> {
        let delta = full.delta();
        let start = full.start() + self.cursor_start[axis] as f32 * delta;
        let end = full.start() + self.clipped_end(axis) as f32 * delta;
        RangeAxis::new(start, end, delta)
    }

    /// Inline coordinate window of the current cursor, clipped at the edge.
    pub fn cursor_inline_range(&self) -> Result<RangeAxis> {
        self.cursor_range(self.inline_range, 0)
    }

    pub fn cursor_xline_range(&self) -> Result<RangeAxis> {
        self.cursor_range(self.xline_range, 1)
    }

    pub fn cursor_z_range(&self) -> Result<RangeAxis> {
        self.cursor_range(self.z_range, 2)
    }

    /// Total number of bricks the iteration visits.
    pub fn num_iterations(&self) -> usize {
        (0..3)
            .map(|i| self.max_brick_index[i] / self.cursor_max_shape[i] + 1)
            .product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn test_iterator() -> BrickIterator {
        BrickIterator::new(
            RangeAxis::new(100.0, 109.0, 1.0).unwrap(), // 10 inlines
            RangeAxis::new(200.0, 212.0, 2.0).unwrap(), // 7 xlines
            RangeAxis::new(0.0, 40.0, 4.0).unwrap(),    // 11 z values
        )
    }

    #[test]
    fn covers_volume_exactly_once() {
        let mut it = test_iterator();
        it.set_cursor_max_shape(3, 2, 4);
        let mut visited: HashSet<(usize, usize, usize)> = HashSet::new();
        let mut bricks = 0;
        while it.has_next() {
            let start = it.cursor_start();
            let shape = it.cursor_shape();
            for i in 0..shape[0] {
                for j in 0..shape[1] {
                    for k in 0..shape[2] {
                        let cell = (start[0] + i, start[1] + j, start[2] + k);
                        assert!(visited.insert(cell), "cell {:?} visited twice", cell);
                    }
                }
            }
            bricks += 1;
            it.next();
        }
        assert_eq!(visited.len(), 10 * 7 * 11);
        assert_eq!(bricks, it.num_iterations());
    }

    #[test]
    fn every_iteration_order_covers_the_volume() {
        for order in [
            AxisIterationOrder::Axis1Axis2Axis3,
            AxisIterationOrder::Axis1Axis3Axis2,
            AxisIterationOrder::Axis2Axis1Axis3,
            AxisIterationOrder::Axis2Axis3Axis1,
            AxisIterationOrder::Axis3Axis1Axis2,
            AxisIterationOrder::Axis3Axis2Axis1,
        ] {
            let mut it = test_iterator();
            it.set_axis_iteration_order(order);
            it.set_cursor_max_shape(4, 3, 5);
            let mut cells = 0;
            while it.has_next() {
                let shape = it.cursor_shape();
                cells += shape[0] * shape[1] * shape[2];
                it.next();
            }
            assert_eq!(cells, 10 * 7 * 11, "order {:?}", order);
        }
    }

    #[test]
    fn cursor_shape_clips_at_edges() {
        let mut it = test_iterator();
        it.set_cursor_max_shape(4, 4, 4);
        // Walk to the last brick.
        while it.has_next() {
            let shape = it.cursor_shape();
            assert!(shape[0] <= 4 && shape[1] <= 4 && shape[2] <= 4);
            it.next();
        }
        // 10/4 -> shapes 4,4,2 along inline; 7/4 -> 4,3; 11/4 -> 4,4,3.
        it.reset();
        assert_eq!(it.cursor_shape(), [4, 4, 4]);
        it.next();
        assert_eq!(it.cursor_start(), [0, 0, 4]);
        it.next();
        assert_eq!(it.cursor_start(), [0, 0, 8]);
        assert_eq!(it.cursor_shape(), [4, 4, 3]);
    }

    #[test]
    fn auto_size_tiers() {
        // Fast axis is z (11 values), medium xline (7), slow inline (10).
        let mut it = test_iterator();
        it.auto_size_cursor_shape(5);
        assert_eq!(it.cursor_max_shape(), [1, 1, 5]);

        let mut it = test_iterator();
        it.auto_size_cursor_shape(40);
        assert_eq!(it.cursor_max_shape(), [1, 40 / 11, 11]);

        let mut it = test_iterator();
        it.auto_size_cursor_shape(200);
        assert_eq!(it.cursor_max_shape(), [200 / 77, 7, 11]);

        let mut it = test_iterator();
        it.auto_size_cursor_shape(10_000);
        assert_eq!(it.cursor_max_shape(), [10, 7, 11]);
    }

    #[test]
    fn optimize_keeps_iteration_count() {
        let mut it = test_iterator();
        it.set_cursor_max_shape(4, 4, 4);
        let before = it.num_iterations();
        let shape_before = it.cursor_max_shape();
        it.optimize_cursor_max_shape();
        let after = it.num_iterations();
        let shape_after = it.cursor_max_shape();
        assert_eq!(before, after);
        for i in 0..3 {
            assert!(shape_after[i] <= shape_before[i]);
        }
        // 10 values in 3 iterations of 4 shrink to 4 (ceil(10/3)=4 stays), 7
        // values in 2 iterations shrink from 4 to 4 (r=1, 1/2=0), 11 values in
        // 3 iterations of 4 keep 4 (r=1, 1/3=0).
        assert_eq!(shape_after, [4, 4, 4]);
    }

    #[test]
    fn optimize_shrinks_oversized_shape() {
        let mut it = test_iterator();
        it.set_cursor_max_shape(7, 7, 7);
        // inline: 10/7+1 = 2 iterations, r = 14-10 = 4, shrink by 4/2 = 2.
        it.optimize_cursor_max_shape();
        assert_eq!(it.cursor_max_shape()[0], 5);
        assert_eq!(it.num_iterations(), 2 * 1 * 2);
    }

    #[test]
    fn cursor_coordinate_ranges() {
        let mut it = test_iterator();
        it.set_cursor_max_shape(4, 4, 4);
        let il = it.cursor_inline_range().unwrap();
        assert_eq!((il.start(), il.end()), (100.0, 103.0));
        // Advance z twice and xline once.
        it.next();
        it.next();
        it.next();
        assert_eq!(it.cursor_start(), [0, 4, 0]);
        let xl = it.cursor_xline_range().unwrap();
        assert_eq!((xl.start(), xl.end()), (208.0, 212.0));
        let z = it.cursor_z_range().unwrap();
        assert_eq!((z.start(), z.end()), (0.0, 12.0));
    }
}
