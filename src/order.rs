//! Storage orders - which logical axis occupies which physical axis of the
//! backing store, for post-stack and pre-stack volumes.
//!
//! Physical axes are numbered fastest-varying first, so in every
//! trace-oriented order the sample (z) axis is physical axis 0. The two
//! slice-oriented post-stack orders put z slowest; they are representable
//! here but carry no trace access path. `AutoCalculated` is a sentinel
//! resolved at open time by classifying the store's axis labels.
//!
//! Axis-role lookups go through per-order const tables rather than matching
//! on the order at every call site.

use crate::error::{Result, SeisError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical role an axis plays in a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisRole {
    Inline,
    Xline,
    Offset,
    Z,
}

/// Physical axis index per role: [inline, xline, offset, z].
type RoleTable = [Option<usize>; 4];

const fn role_slot(role: AxisRole) -> usize {
    match role {
        AxisRole::Inline => 0,
        AxisRole::Xline => 1,
        AxisRole::Offset => 2,
        AxisRole::Z => 3,
    }
}

// Post-stack tables. Trace-oriented orders keep z at physical 0.
const INLINE_XLINE_Z: RoleTable = [Some(2), Some(1), None, Some(0)];
const XLINE_INLINE_Z: RoleTable = [Some(1), Some(2), None, Some(0)];
const Z_INLINE_XLINE: RoleTable = [Some(1), Some(0), None, Some(2)];
const Z_XLINE_INLINE: RoleTable = [Some(0), Some(1), None, Some(2)];

// Pre-stack tables. z is always physical 0.
const INLINE_XLINE_OFFSET_Z: RoleTable = [Some(3), Some(2), Some(1), Some(0)];
const XLINE_INLINE_OFFSET_Z: RoleTable = [Some(2), Some(3), Some(1), Some(0)];
const INLINE_OFFSET_XLINE_Z: RoleTable = [Some(3), Some(1), Some(2), Some(0)];
const XLINE_OFFSET_INLINE_Z: RoleTable = [Some(1), Some(3), Some(2), Some(0)];
const OFFSET_INLINE_XLINE_Z: RoleTable = [Some(2), Some(1), Some(3), Some(0)];
const OFFSET_XLINE_INLINE_Z: RoleTable = [Some(1), Some(2), Some(3), Some(0)];

/// Storage order of a post-stack (3 axis) volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostStackOrder {
    /// Inline varies slowest, then xline; z varies fastest.
    InlineXlineZ,
    /// Xline varies slowest, then inline; z varies fastest.
    XlineInlineZ,
    /// z varies slowest, then inline; xline varies fastest.
    ZInlineXline,
    /// z varies slowest, then xline; inline varies fastest.
    ZXlineInline,
    /// Resolved from the store's axis labels at open time.
    AutoCalculated,
}

impl PostStackOrder {
    const VALUES: [PostStackOrder; 5] = [
        PostStackOrder::InlineXlineZ,
        PostStackOrder::XlineInlineZ,
        PostStackOrder::ZInlineXline,
        PostStackOrder::ZXlineInline,
        PostStackOrder::AutoCalculated,
    ];

    fn role_table(self) -> Option<&'static RoleTable> {
        match self {
            PostStackOrder::InlineXlineZ => Some(&INLINE_XLINE_Z),
            PostStackOrder::XlineInlineZ => Some(&XLINE_INLINE_Z),
            PostStackOrder::ZInlineXline => Some(&Z_INLINE_XLINE),
            PostStackOrder::ZXlineInline => Some(&Z_XLINE_INLINE),
            PostStackOrder::AutoCalculated => None,
        }
    }

    /// Physical axis index of the given role, or None for `AutoCalculated`
    /// and for roles the order does not carry.
    pub fn axis_of(self, role: AxisRole) -> Option<usize> {
        self.role_table().and_then(|t| t[role_slot(role)])
    }

    /// True when z is the fastest-varying axis, i.e. the store holds whole
    /// traces contiguously.
    pub fn is_trace_ordered(self) -> bool {
        self.axis_of(AxisRole::Z) == Some(0)
    }

    /// Configuration title of the order.
    pub fn title(self) -> &'static str {
        match self {
            PostStackOrder::InlineXlineZ => "Inline,Xline",
            PostStackOrder::XlineInlineZ => "Xline,Inline",
            PostStackOrder::ZInlineXline => "Z-Inline",
            PostStackOrder::ZXlineInline => "Z-Xline",
            PostStackOrder::AutoCalculated => "Auto-Calculated",
        }
    }

    pub fn values_as_strings() -> Vec<&'static str> {
        Self::VALUES.iter().map(|v| v.title()).collect()
    }

    /// Finds an order by its configuration title, case-insensitively.
    /// Unknown or absent titles fall back to `AutoCalculated`.
    pub fn lookup_by_name(title: Option<&str>) -> Self {
        match title {
            None => PostStackOrder::AutoCalculated,
            Some(title) => Self::VALUES
                .into_iter()
                .find(|v| v.title().eq_ignore_ascii_case(title))
                .unwrap_or(PostStackOrder::AutoCalculated),
        }
    }

    /// Resolves the order from the store's physical axis labels (fastest
    /// axis first). Used to resolve `AutoCalculated` at open time.
    pub fn from_axis_labels(labels: &[String]) -> Result<Self> {
        let roles = classify_labels(labels, 3)?;
        match (roles[0], roles[1], roles[2]) {
            (AxisRole::Z, AxisRole::Xline, AxisRole::Inline) => Ok(PostStackOrder::InlineXlineZ),
            (AxisRole::Z, AxisRole::Inline, AxisRole::Xline) => Ok(PostStackOrder::XlineInlineZ),
            (AxisRole::Xline, AxisRole::Inline, AxisRole::Z) => Ok(PostStackOrder::ZInlineXline),
            (AxisRole::Inline, AxisRole::Xline, AxisRole::Z) => Ok(PostStackOrder::ZXlineInline),
            _ => Err(SeisError::Validation(format!(
                "unsupported post-stack storage order for axis labels {:?}",
                labels
            ))),
        }
    }

    /// Returns a concrete order: self when already concrete, otherwise the
    /// order classified from the axis labels.
    pub fn resolve(self, labels: &[String]) -> Result<Self> {
        match self {
            PostStackOrder::AutoCalculated => Self::from_axis_labels(labels),
            concrete => Ok(concrete),
        }
    }
}

impl fmt::Display for PostStackOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Storage order of a pre-stack (4 axis) volume. z is always fastest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreStackOrder {
    InlineXlineOffsetZ,
    XlineInlineOffsetZ,
    InlineOffsetXlineZ,
    XlineOffsetInlineZ,
    OffsetInlineXlineZ,
    OffsetXlineInlineZ,
    /// Resolved from the store's axis labels at open time.
    AutoCalculated,
}

impl PreStackOrder {
    const VALUES: [PreStackOrder; 7] = [
        PreStackOrder::InlineXlineOffsetZ,
        PreStackOrder::XlineInlineOffsetZ,
        PreStackOrder::InlineOffsetXlineZ,
        PreStackOrder::XlineOffsetInlineZ,
        PreStackOrder::OffsetInlineXlineZ,
        PreStackOrder::OffsetXlineInlineZ,
        PreStackOrder::AutoCalculated,
    ];

    fn role_table(self) -> Option<&'static RoleTable> {
        match self {
            PreStackOrder::InlineXlineOffsetZ => Some(&INLINE_XLINE_OFFSET_Z),
            PreStackOrder::XlineInlineOffsetZ => Some(&XLINE_INLINE_OFFSET_Z),
            PreStackOrder::InlineOffsetXlineZ => Some(&INLINE_OFFSET_XLINE_Z),
            PreStackOrder::XlineOffsetInlineZ => Some(&XLINE_OFFSET_INLINE_Z),
            PreStackOrder::OffsetInlineXlineZ => Some(&OFFSET_INLINE_XLINE_Z),
            PreStackOrder::OffsetXlineInlineZ => Some(&OFFSET_XLINE_INLINE_Z),
            PreStackOrder::AutoCalculated => None,
        }
    }

    /// Physical axis index of the given role, or None for `AutoCalculated`.
    pub fn axis_of(self, role: AxisRole) -> Option<usize> {
        self.role_table().and_then(|t| t[role_slot(role)])
    }

    /// Configuration name of the order.
    pub fn name(self) -> &'static str {
        match self {
            PreStackOrder::InlineXlineOffsetZ => "Inline,Xline,Offset",
            PreStackOrder::XlineInlineOffsetZ => "Xline,Inline,Offset",
            PreStackOrder::InlineOffsetXlineZ => "Inline,Offset,Xline",
            PreStackOrder::XlineOffsetInlineZ => "Xline,Offset,Inline",
            PreStackOrder::OffsetInlineXlineZ => "Offset,Inline,Xline",
            PreStackOrder::OffsetXlineInlineZ => "Offset,Xline,Inline",
            PreStackOrder::AutoCalculated => "Auto-Calculated",
        }
    }

    pub fn values_as_strings() -> Vec<&'static str> {
        Self::VALUES.iter().map(|v| v.name()).collect()
    }

    /// Finds an order by its configuration name, case-insensitively.
    /// Unknown or absent names fall back to `AutoCalculated`.
    pub fn lookup_by_name(name: Option<&str>) -> Self {
        match name {
            None => PreStackOrder::AutoCalculated,
            Some(name) => Self::VALUES
                .into_iter()
                .find(|v| v.name().eq_ignore_ascii_case(name))
                .unwrap_or(PreStackOrder::AutoCalculated),
        }
    }

    /// Resolves the order from the store's physical axis labels (fastest
    /// axis first).
    pub fn from_axis_labels(labels: &[String]) -> Result<Self> {
        let roles = classify_labels(labels, 4)?;
        if roles[0] != AxisRole::Z {
            return Err(SeisError::Validation(format!(
                "unsupported pre-stack storage order for axis labels {:?}",
                labels
            )));
        }
        match (roles[1], roles[2], roles[3]) {
            (AxisRole::Offset, AxisRole::Xline, AxisRole::Inline) => {
                Ok(PreStackOrder::InlineXlineOffsetZ)
            }
            (AxisRole::Offset, AxisRole::Inline, AxisRole::Xline) => {
                Ok(PreStackOrder::XlineInlineOffsetZ)
            }
            (AxisRole::Xline, AxisRole::Offset, AxisRole::Inline) => {
                Ok(PreStackOrder::InlineOffsetXlineZ)
            }
            (AxisRole::Inline, AxisRole::Offset, AxisRole::Xline) => {
                Ok(PreStackOrder::XlineOffsetInlineZ)
            }
            (AxisRole::Xline, AxisRole::Inline, AxisRole::Offset) => {
                Ok(PreStackOrder::OffsetInlineXlineZ)
            }
            (AxisRole::Inline, AxisRole::Xline, AxisRole::Offset) => {
                Ok(PreStackOrder::OffsetXlineInlineZ)
            }
            _ => Err(SeisError::Validation(format!(
                "unsupported pre-stack storage order for axis labels {:?}",
                labels
            ))),
        }
    }

    pub fn resolve(self, labels: &[String]) -> Result<Self> {
        match self {
            PreStackOrder::AutoCalculated => Self::from_axis_labels(labels),
            concrete => Ok(concrete),
        }
    }
}

impl fmt::Display for PreStackOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classifies a physical axis label into its logical role. Labels come from
/// a number of acquisition and processing conventions; matching is
/// case-insensitive against the known aliases.
pub fn classify_axis_label(label: &str) -> Option<AxisRole> {
    const INLINE_ALIASES: [&str; 6] = ["INLINE", "R_ILINE", "INLINE_NO", "ILINE", "I-LINE", "FRAME"];
    const XLINE_ALIASES: [&str; 6] = ["CROSSLINE", "R_XLINE", "XLINE_NO", "XLINE", "X-LINE", "AZI_IDX"];
    const OFFSET_ALIASES: [&str; 4] = ["OFFSET", "SOURCE", "OFFSET_BIN", "SEQNO"];
    const Z_ALIASES: [&str; 3] = ["TIME", "DEPTH", "OFF_IDX"];

    let matches = |aliases: &[&str]| aliases.iter().any(|a| a.eq_ignore_ascii_case(label));
    if matches(&INLINE_ALIASES) {
        Some(AxisRole::Inline)
    } else if matches(&XLINE_ALIASES) {
        Some(AxisRole::Xline)
    } else if matches(&OFFSET_ALIASES) {
        Some(AxisRole::Offset)
    } else if matches(&Z_ALIASES) {
        Some(AxisRole::Z)
    } else {
        None
    }
}

fn classify_labels(labels: &[String], expected: usize) -> Result<Vec<AxisRole>> {
    if labels.len() < expected {
        return Err(SeisError::Validation(format!(
            "expected {} axis labels, found {}",
            expected,
            labels.len()
        )));
    }
    labels[..expected]
        .iter()
        .map(|label| {
            classify_axis_label(label).ok_or_else(|| {
                SeisError::Validation(format!("unrecognized axis label '{}'", label))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poststack_axis_tables() {
        use AxisRole::*;
        let order = PostStackOrder::InlineXlineZ;
        assert_eq!(order.axis_of(Z), Some(0));
        assert_eq!(order.axis_of(Xline), Some(1));
        assert_eq!(order.axis_of(Inline), Some(2));
        assert_eq!(order.axis_of(Offset), None);
        assert!(order.is_trace_ordered());

        let order = PostStackOrder::XlineInlineZ;
        assert_eq!(order.axis_of(Inline), Some(1));
        assert_eq!(order.axis_of(Xline), Some(2));

        let order = PostStackOrder::ZInlineXline;
        assert_eq!(order.axis_of(Z), Some(2));
        assert_eq!(order.axis_of(Xline), Some(0));
        assert!(!order.is_trace_ordered());

        assert_eq!(PostStackOrder::AutoCalculated.axis_of(Z), None);
    }

    #[test]
    fn prestack_axis_tables() {
        use AxisRole::*;
        for order in [
            PreStackOrder::InlineXlineOffsetZ,
            PreStackOrder::XlineOffsetInlineZ,
            PreStackOrder::OffsetXlineInlineZ,
        ] {
            assert_eq!(order.axis_of(Z), Some(0));
        }
        let order = PreStackOrder::InlineXlineOffsetZ;
        assert_eq!(order.axis_of(Offset), Some(1));
        assert_eq!(order.axis_of(Xline), Some(2));
        assert_eq!(order.axis_of(Inline), Some(3));

        let order = PreStackOrder::OffsetInlineXlineZ;
        assert_eq!(order.axis_of(Xline), Some(1));
        assert_eq!(order.axis_of(Inline), Some(2));
        assert_eq!(order.axis_of(Offset), Some(3));
    }

    #[test]
    fn label_classification() {
        assert_eq!(classify_axis_label("INLINE_NO"), Some(AxisRole::Inline));
        assert_eq!(classify_axis_label("frame"), Some(AxisRole::Inline));
        assert_eq!(classify_axis_label("X-Line"), Some(AxisRole::Xline));
        assert_eq!(classify_axis_label("azi_idx"), Some(AxisRole::Xline));
        assert_eq!(classify_axis_label("SeqNo"), Some(AxisRole::Offset));
        assert_eq!(classify_axis_label("depth"), Some(AxisRole::Z));
        assert_eq!(classify_axis_label("banana"), None);
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn poststack_auto_resolution() {
        assert_eq!(
            PostStackOrder::from_axis_labels(&labels(&["TIME", "XLINE_NO", "INLINE_NO"])).unwrap(),
            PostStackOrder::InlineXlineZ
        );
        assert_eq!(
            PostStackOrder::from_axis_labels(&labels(&["DEPTH", "ILINE", "XLINE"])).unwrap(),
            PostStackOrder::XlineInlineZ
        );
        assert_eq!(
            PostStackOrder::from_axis_labels(&labels(&["XLINE", "INLINE", "TIME"])).unwrap(),
            PostStackOrder::ZInlineXline
        );
        assert!(matches!(
            PostStackOrder::from_axis_labels(&labels(&["TIME", "TIME", "INLINE"])),
            Err(SeisError::Validation(_))
        ));
        // Concrete orders resolve to themselves regardless of labels.
        assert_eq!(
            PostStackOrder::XlineInlineZ
                .resolve(&labels(&["TIME", "XLINE", "INLINE"]))
                .unwrap(),
            PostStackOrder::XlineInlineZ
        );
    }

    #[test]
    fn prestack_auto_resolution() {
        assert_eq!(
            PreStackOrder::from_axis_labels(&labels(&["TIME", "OFFSET", "XLINE", "INLINE"]))
                .unwrap(),
            PreStackOrder::InlineXlineOffsetZ
        );
        assert_eq!(
            PreStackOrder::from_axis_labels(&labels(&["TIME", "INLINE", "XLINE", "OFFSET_BIN"]))
                .unwrap(),
            PreStackOrder::OffsetXlineInlineZ
        );
        assert!(matches!(
            PreStackOrder::from_axis_labels(&labels(&["OFFSET", "TIME", "XLINE", "INLINE"])),
            Err(SeisError::Validation(_))
        ));
    }

    #[test]
    fn name_lookup() {
        assert_eq!(
            PostStackOrder::lookup_by_name(Some("inline,xline")),
            PostStackOrder::InlineXlineZ
        );
        assert_eq!(
            PostStackOrder::lookup_by_name(Some("nonsense")),
            PostStackOrder::AutoCalculated
        );
        assert_eq!(
            PostStackOrder::lookup_by_name(None),
            PostStackOrder::AutoCalculated
        );
        assert_eq!(
            PreStackOrder::lookup_by_name(Some("Offset,Inline,Xline")),
            PreStackOrder::OffsetInlineXlineZ
        );
        assert_eq!(PostStackOrder::InlineXlineZ.to_string(), "Inline,Xline");
    }
}
