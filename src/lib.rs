//! SeisVol - Seismic Volume Addressing and Access
//!
//! A pure Rust engine for addressing seismic volumes by their survey
//! coordinates and reading or writing traces with full awareness of the
//! volume's physical storage order.
//!
//! # Features
//!
//! - Sampled coordinate axes (inline, crossline, offset, CDP, z) with
//!   on-increment validation
//! - 3-D survey geometry with bilinear world transforms, plus 2-D line
//!   geometry with CDP/shotpoint mapping
//! - Post-stack and pre-stack storage orders, resolvable from axis labels
//! - Storage-order-aware access planning: bulk frame I/O when the layout
//!   matches the request, per-trace fallback when it does not
//! - Brick iteration over volume subsets with tunable brick shapes
//! - Async frame stores (in-memory and local filesystem; implement the
//!   `FrameStore` trait for other backends)
//!
//! # Example
//!
//! ```rust,ignore
//! use seisvol::{PostStackAccessor, PostStackOrder};
//!
//! # async fn example(store: seisvol::FileFrameStore) -> seisvol::Result<()> {
//! # let (geometry, bounds) = unimplemented!();
//! let mut accessor =
//!     PostStackAccessor::new(store, geometry, bounds, PostStackOrder::AutoCalculated)?;
//!
//! // Read one inline; one frame read when the store is inline-major.
//! let data = accessor.read_inline(1250.0, 2000.0, 2400.0, 0.0, 4000.0).await?;
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod brick;
pub mod error;
pub mod geometry;
pub mod indexer;
pub mod line2d;
pub mod metadata;
pub mod order;
pub mod range;
pub mod store;
pub mod types;

// Re-exports
pub use access::{PostStackAccessor, PreStackAccessor};
pub use brick::{AxisIterationOrder, BrickIterator};
pub use error::{Result, SeisError};
pub use geometry::{CornerPoints, Point2, SurveyGeometry, SurveyOrientation};
pub use indexer::{PostStackIndexer, PreStackIndexer, VolumeBounds};
pub use line2d::{LineCoordinateTransform, LinearCdpShotpointTransform, SeismicLine2d, SeismicSurvey2d};
pub use metadata::DatasetDescriptor;
pub use order::{AxisRole, PostStackOrder, PreStackOrder};
pub use range::RangeAxis;
pub use store::{FileFrameStore, Frame, FrameStore, MemoryFrameStore, OpenMode};
pub use types::{CancelFlag, Trace, TraceData, TraceStatus};

/// Version of the seisvol implementation
pub const SEISVOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!SEISVOL_VERSION.is_empty());
    }
}
