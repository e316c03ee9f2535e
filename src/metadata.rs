//! Dataset descriptor - the identity and physical shape of a stored volume,
//! persisted alongside the frame data and used to tag store errors and logs.

use crate::error::{Result, SeisError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Descriptor format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorVersion {
    pub major: u16,
    pub minor: u16,
}

impl DescriptorVersion {
    pub const CURRENT: Self = Self { major: 1, minor: 0 };

    pub fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    pub fn is_compatible(&self, other: &Self) -> bool {
        self.major == other.major
    }
}

impl Default for DescriptorVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Complete descriptor for a stored volume.
///
/// Axis labels and lengths are listed physical-fastest first, so
/// `axis_lengths[0]` is the samples-per-trace count and `axis_lengths[1]`
/// the traces-per-frame count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    /// Format version
    pub version: DescriptorVersion,

    /// Unique dataset identity
    pub id: Uuid,

    /// Dataset name, used to tag store errors and log records
    pub name: String,

    /// Physical axis labels, fastest axis first
    pub axis_labels: Vec<String>,

    /// Physical axis lengths, fastest axis first
    pub axis_lengths: Vec<usize>,

    /// Configured storage-order title, when one was chosen explicitly
    pub storage_order: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,

    /// Custom metadata key-value pairs
    pub custom_metadata: HashMap<String, String>,
}

impl DatasetDescriptor {
    pub fn new(
        name: impl Into<String>,
        axis_labels: Vec<String>,
        axis_lengths: Vec<usize>,
    ) -> Result<Self> {
        if axis_labels.len() != axis_lengths.len() {
            return Err(SeisError::Validation(format!(
                "{} axis labels for {} axis lengths",
                axis_labels.len(),
                axis_lengths.len()
            )));
        }
        if axis_lengths.len() < 3 || axis_lengths.contains(&0) {
            return Err(SeisError::Validation(format!(
                "axis lengths {:?} do not describe a volume",
                axis_lengths
            )));
        }
        let now = Utc::now();
        Ok(Self {
            version: DescriptorVersion::default(),
            id: Uuid::new_v4(),
            name: name.into(),
            axis_labels,
            axis_lengths,
            storage_order: None,
            created_at: now,
            modified_at: now,
            custom_metadata: HashMap::new(),
        })
    }

    /// Set the configured storage-order title
    pub fn with_storage_order(mut self, title: impl Into<String>) -> Self {
        self.storage_order = Some(title.into());
        self
    }

    pub fn num_axes(&self) -> usize {
        self.axis_lengths.len()
    }

    pub fn samples_per_trace(&self) -> usize {
        self.axis_lengths[0]
    }

    pub fn traces_per_frame(&self) -> usize {
        self.axis_lengths[1]
    }

    /// Number of frames in the volume (product of the axes above the trace
    /// axis).
    pub fn num_frames(&self) -> usize {
        self.axis_lengths[2..].iter().product()
    }

    pub fn num_traces(&self) -> usize {
        self.traces_per_frame() * self.num_frames()
    }

    /// Add custom metadata
    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom_metadata.insert(key.into(), value.into());
    }

    /// Get custom metadata
    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.custom_metadata.get(key).map(|s| s.as_str())
    }

    /// Update modification timestamp
    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let descriptor: Self = serde_json::from_str(json)?;
        if !descriptor.version.is_compatible(&DescriptorVersion::CURRENT) {
            return Err(SeisError::Validation(format!(
                "descriptor version {}.{} is not compatible with {}.{}",
                descriptor.version.major,
                descriptor.version.minor,
                DescriptorVersion::CURRENT.major,
                DescriptorVersion::CURRENT.minor
            )));
        }
        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_descriptor() -> DatasetDescriptor {
        DatasetDescriptor::new(
            "survey-a",
            vec!["TIME".to_string(), "XLINE_NO".to_string(), "INLINE_NO".to_string()],
            vec![251, 6, 5],
        )
        .unwrap()
    }

    #[test]
    fn test_version_compatibility() {
        let v1_0 = DescriptorVersion::new(1, 0);
        let v1_1 = DescriptorVersion::new(1, 1);
        let v2_0 = DescriptorVersion::new(2, 0);

        assert!(v1_0.is_compatible(&v1_1));
        assert!(!v1_0.is_compatible(&v2_0));
    }

    #[test]
    fn test_shape_accessors() {
        let descriptor = test_descriptor();
        assert_eq!(descriptor.samples_per_trace(), 251);
        assert_eq!(descriptor.traces_per_frame(), 6);
        assert_eq!(descriptor.num_frames(), 5);
        assert_eq!(descriptor.num_traces(), 30);
    }

    #[test]
    fn test_label_length_mismatch_rejected() {
        assert!(matches!(
            DatasetDescriptor::new("bad", vec!["TIME".to_string()], vec![251, 6, 5]),
            Err(SeisError::Validation(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let mut descriptor = test_descriptor().with_storage_order("Inline,Xline");
        descriptor.add_metadata("project", "North Sea Survey");

        let json = descriptor.to_json().unwrap();
        let restored = DatasetDescriptor::from_json(&json).unwrap();
        assert_eq!(restored.id, descriptor.id);
        assert_eq!(restored.axis_lengths, vec![251, 6, 5]);
        assert_eq!(restored.storage_order.as_deref(), Some("Inline,Xline"));
        assert_eq!(restored.get_metadata("project"), Some("North Sea Survey"));
    }
}
