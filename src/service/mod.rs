pub mod attendance;
pub mod enrollment;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use actix_web::web;

use crate::error::AppError;
use crate::face::{FaceDescriptor, FaceEncoder};

/// Run the CPU-bound descriptor extraction on the blocking pool so a
/// single face computation cannot stall every request on the worker.
pub(crate) async fn encode_off_thread(
    encoder: &Arc<dyn FaceEncoder>,
    image: Vec<u8>,
) -> Result<FaceDescriptor, AppError> {
    let encoder = Arc::clone(encoder);
    let result = web::block(move || encoder.encode(&image))
        .await
        .map_err(|e| AppError::Internal(format!("face encoding task failed: {e}")))?;
    Ok(result?)
}
