//! Nearest-neighbor identity matching over enrolled descriptors.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::face::descriptor::FaceDescriptor;

/// Probe-to-enrollee distance below which a match is accepted.
pub const MATCH_THRESHOLD: f64 = 0.6;

#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    /// System-state problem: nobody is enrolled yet.
    #[error("No registered faces found")]
    NoEnrollments,
    /// Identity mismatch: everyone enrolled is too far from the probe.
    #[error("Face not recognized")]
    FaceNotRecognized,
}

/// One enrolled employee row as loaded for matching.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnrolledFace {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub divisi: Option<String>,
    pub image_url: Option<String>,
    pub face_encoding: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FaceMatch {
    #[schema(example = 5)]
    pub id: u64,
    #[schema(example = "Budi Santoso")]
    pub name: String,
    #[schema(example = "budi@bengkel.com")]
    pub email: String,
    pub divisi: Option<String>,
    pub image_url: Option<String>,
    /// `1 - distance`; 1.0 means an exact descriptor match.
    #[schema(example = 0.82)]
    pub confidence: f64,
}

/// Seam for the matching strategy. The linear scan is O(n) per probe,
/// fine for tens to low hundreds of enrollees; a vector index can slot
/// in behind this trait without touching the attendance gate.
pub trait FaceIndex: Send + Sync {
    fn find_match(
        &self,
        probe: &FaceDescriptor,
        enrolled: &[EnrolledFace],
    ) -> Result<FaceMatch, MatchError>;
}

pub struct LinearScanIndex;

impl FaceIndex for LinearScanIndex {
    /// Scan every enrolled descriptor and keep the minimum distance.
    ///
    /// Callers supply rows in ascending id order; exact ties keep the
    /// first-seen minimum, so results are reproducible. Malformed
    /// stored descriptors are skipped with a warning, never fatal.
    fn find_match(
        &self,
        probe: &FaceDescriptor,
        enrolled: &[EnrolledFace],
    ) -> Result<FaceMatch, MatchError> {
        if enrolled.is_empty() {
            return Err(MatchError::NoEnrollments);
        }

        let mut best: Option<(&EnrolledFace, f64)> = None;
        for face in enrolled {
            let stored = match FaceDescriptor::parse(&face.face_encoding) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(
                        employee_id = face.id,
                        error = %e,
                        "skipping malformed stored descriptor"
                    );
                    continue;
                }
            };

            let distance = probe.distance(&stored);
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((face, distance));
            }
        }

        match best {
            Some((face, distance)) if distance < MATCH_THRESHOLD => Ok(FaceMatch {
                id: face.id,
                name: face.name.clone(),
                email: face.email.clone(),
                divisi: face.divisi.clone(),
                image_url: face.image_url.clone(),
                confidence: 1.0 - distance,
            }),
            _ => Err(MatchError::FaceNotRecognized),
        }
    }
}
