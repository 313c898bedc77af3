//! Fixed-length face descriptor and its text serialization.
//!
//! Descriptors are stored as comma-separated ASCII decimals in a TEXT
//! column. That is the on-disk contract; parsing enforces the expected
//! dimension and fails closed on mismatch instead of producing a
//! garbage distance later.

use thiserror::Error;

/// Output dimension of the descriptor network.
pub const DESCRIPTOR_DIM: usize = 128;

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("descriptor has {0} values, expected {DESCRIPTOR_DIM}")]
    DimensionMismatch(usize),
    #[error("descriptor contains a non-numeric value: {0:?}")]
    BadValue(String),
}

/// A 128-dimension real-valued face descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceDescriptor(Vec<f64>);

impl FaceDescriptor {
    pub fn new(values: Vec<f64>) -> Result<Self, DescriptorError> {
        if values.len() != DESCRIPTOR_DIM {
            return Err(DescriptorError::DimensionMismatch(values.len()));
        }
        Ok(Self(values))
    }

    /// Parse the stored comma-separated form.
    pub fn parse(s: &str) -> Result<Self, DescriptorError> {
        let mut values = Vec::with_capacity(DESCRIPTOR_DIM);
        for part in s.split(',') {
            let v: f64 = part
                .trim()
                .parse()
                .map_err(|_| DescriptorError::BadValue(part.to_string()))?;
            values.push(v);
        }
        Self::new(values)
    }

    /// Serialize for storage in a text column.
    pub fn to_csv(&self) -> String {
        self.0
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Euclidean distance to another descriptor.
    pub fn distance(&self, other: &FaceDescriptor) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}
