pub mod descriptor;
pub mod engine;
pub mod matcher;

pub use descriptor::{DESCRIPTOR_DIM, DescriptorError, FaceDescriptor};
pub use engine::{FaceEncoder, FaceError, OnnxFaceEncoder};
pub use matcher::{EnrolledFace, FaceIndex, FaceMatch, LinearScanIndex, MatchError};
