//! Face encoder: image bytes in, 128-dim descriptor out.
//!
//! The ONNX pipeline runs a face detector over the decoded RGB grid,
//! crops the winning region and feeds it to a descriptor network.
//! Both sessions are loaded once at startup and injected; handlers
//! never touch ambient globals.

use std::path::Path;
use std::sync::Mutex;

use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use thiserror::Error;

use crate::face::descriptor::{DESCRIPTOR_DIM, FaceDescriptor};

const DETECTOR_INPUT_SIZE: usize = 320;
const DETECTOR_SCORE_THRESHOLD: f32 = 0.6;
// Detector output rows: [x1, y1, x2, y2, score] in input-size pixels.
const DETECTION_STRIDE: usize = 5;
// Expand the detected box before cropping so the chip keeps some
// forehead/chin context, matching how the descriptor net was trained.
const CROP_MARGIN: f32 = 0.25;
const RECOGNIZER_INPUT_SIZE: usize = 150;
const PIXEL_MEAN: f32 = 127.5;
const PIXEL_STD: f32 = 127.5;

const DETECTOR_MODEL_FILE: &str = "face_detector.onnx";
const DESCRIPTOR_MODEL_FILE: &str = "face_descriptor.onnx";

#[derive(Debug, Error)]
pub enum FaceError {
    #[error("No face detected in the image")]
    NoFaceDetected,
    #[error("Image could not be decoded: {0}")]
    DecodeError(String),
    #[error("face model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("face inference failed: {0}")]
    Inference(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Seam for the descriptor pipeline so tests can substitute a stub.
pub trait FaceEncoder: Send + Sync {
    /// Pure function of the image bytes; no side effects.
    fn encode(&self, image_bytes: &[u8]) -> Result<FaceDescriptor, FaceError>;
}

#[derive(Debug, Clone, Copy)]
struct Detection {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
}

impl Detection {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

/// ONNX-backed encoder. `Session::run` needs `&mut`, so the sessions
/// sit behind mutexes; requests serialize on the model, not on the
/// whole service.
pub struct OnnxFaceEncoder {
    detector: Mutex<Session>,
    recognizer: Mutex<Session>,
}

impl OnnxFaceEncoder {
    /// Load both model files from `model_dir`, or fail. Callers treat
    /// a load failure as fatal at startup.
    pub fn load(model_dir: &Path) -> Result<Self, FaceError> {
        let detector_path = model_dir.join(DETECTOR_MODEL_FILE);
        let recognizer_path = model_dir.join(DESCRIPTOR_MODEL_FILE);
        for path in [&detector_path, &recognizer_path] {
            if !path.exists() {
                return Err(FaceError::ModelUnavailable(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
        }

        let detector = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(&detector_path)
            .map_err(|e| FaceError::ModelUnavailable(e.to_string()))?;
        let recognizer = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(&recognizer_path)
            .map_err(|e| FaceError::ModelUnavailable(e.to_string()))?;

        tracing::info!(
            detector = %detector_path.display(),
            recognizer = %recognizer_path.display(),
            "loaded face models"
        );

        Ok(Self {
            detector: Mutex::new(detector),
            recognizer: Mutex::new(recognizer),
        })
    }

    fn detect(&self, img: &RgbImage) -> Result<Detection, FaceError> {
        let input = preprocess_detector(img);

        let mut session = self
            .detector
            .lock()
            .map_err(|_| FaceError::Inference("detector session lock poisoned".to_string()))?;
        let outputs = session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| FaceError::Inference(format!("detector output: {e}")))?;

        let scale_x = img.width() as f32 / DETECTOR_INPUT_SIZE as f32;
        let scale_y = img.height() as f32 / DETECTOR_INPUT_SIZE as f32;
        let detections = decode_detections(data, scale_x, scale_y);

        // More than one face may be present. Take the largest box (the
        // person closest to the camera) as the explicit policy, not an
        // arbitrary first hit.
        pick_largest(&detections).ok_or(FaceError::NoFaceDetected)
    }

    fn describe(&self, chip: &RgbImage) -> Result<FaceDescriptor, FaceError> {
        let input = preprocess_recognizer(chip);

        let mut session = self
            .recognizer
            .lock()
            .map_err(|_| FaceError::Inference("recognizer session lock poisoned".to_string()))?;
        let outputs = session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (_, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| FaceError::Inference(format!("descriptor output: {e}")))?;

        if data.len() != DESCRIPTOR_DIM {
            return Err(FaceError::Inference(format!(
                "expected {DESCRIPTOR_DIM}-dim descriptor, got {}",
                data.len()
            )));
        }

        let values: Vec<f64> = data.iter().map(|&v| v as f64).collect();
        FaceDescriptor::new(values)
            .map_err(|e| FaceError::Inference(format!("descriptor output: {e}")))
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(&self, image_bytes: &[u8]) -> Result<FaceDescriptor, FaceError> {
        let img = decode_rgb(image_bytes)?;
        let face = self.detect(&img)?;
        let chip = crop_face(&img, &face);
        self.describe(&chip)
    }
}

fn decode_rgb(image_bytes: &[u8]) -> Result<RgbImage, FaceError> {
    image::load_from_memory(image_bytes)
        .map(|dynamic| dynamic.to_rgb8())
        .map_err(|e| FaceError::DecodeError(e.to_string()))
}

/// Resize to the detector input and normalize into a NCHW tensor.
fn preprocess_detector(img: &RgbImage) -> Array4<f32> {
    let size = DETECTOR_INPUT_SIZE;
    let resized = imageops::resize(img, size as u32, size as u32, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - PIXEL_MEAN) / PIXEL_STD;
        }
    }
    tensor
}

/// Parse flat `[N * 5]` detector output and map coordinates back to
/// the original image, dropping rows under the confidence threshold.
fn decode_detections(data: &[f32], scale_x: f32, scale_y: f32) -> Vec<Detection> {
    data.chunks_exact(DETECTION_STRIDE)
        .filter(|row| row[4] >= DETECTOR_SCORE_THRESHOLD)
        .map(|row| Detection {
            x1: row[0] * scale_x,
            y1: row[1] * scale_y,
            x2: row[2] * scale_x,
            y2: row[3] * scale_y,
            score: row[4],
        })
        .collect()
}

fn pick_largest(detections: &[Detection]) -> Option<Detection> {
    detections
        .iter()
        .copied()
        .max_by(|a, b| a.area().total_cmp(&b.area()))
}

/// Cut the detected region (with margin) out of the frame and resize
/// it to the descriptor network input.
fn crop_face(img: &RgbImage, face: &Detection) -> RgbImage {
    let margin_x = (face.x2 - face.x1) * CROP_MARGIN;
    let margin_y = (face.y2 - face.y1) * CROP_MARGIN;

    let x1 = (face.x1 - margin_x).max(0.0) as u32;
    let y1 = (face.y1 - margin_y).max(0.0) as u32;
    let x2 = ((face.x2 + margin_x) as u32).min(img.width());
    let y2 = ((face.y2 + margin_y) as u32).min(img.height());

    let width = (x2.saturating_sub(x1)).max(1);
    let height = (y2.saturating_sub(y1)).max(1);

    let cropped = imageops::crop_imm(img, x1, y1, width, height).to_image();
    imageops::resize(
        &cropped,
        RECOGNIZER_INPUT_SIZE as u32,
        RECOGNIZER_INPUT_SIZE as u32,
        FilterType::Triangle,
    )
}

fn preprocess_recognizer(chip: &RgbImage) -> Array4<f32> {
    let size = RECOGNIZER_INPUT_SIZE;
    let resized = if chip.width() as usize == size && chip.height() as usize == size {
        chip.clone()
    } else {
        imageops::resize(chip, size as u32, size as u32, FilterType::Triangle)
    };

    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - PIXEL_MEAN) / PIXEL_STD;
        }
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_garbage_bytes() {
        let err = decode_rgb(b"definitely not an image").unwrap_err();
        assert!(matches!(err, FaceError::DecodeError(_)));
    }

    #[test]
    fn decode_accepts_png_bytes() {
        let mut bytes = Vec::new();
        let img = RgbImage::from_pixel(8, 8, image::Rgb([120, 80, 40]));
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let decoded = decode_rgb(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (8, 8));
    }

    #[test]
    fn detector_preprocess_shape_and_normalization() {
        let img = RgbImage::from_pixel(64, 64, image::Rgb([128, 128, 128]));
        let tensor = preprocess_detector(&img);
        assert_eq!(
            tensor.shape(),
            &[1, 3, DETECTOR_INPUT_SIZE, DETECTOR_INPUT_SIZE]
        );
        let expected = (128.0 - PIXEL_MEAN) / PIXEL_STD;
        assert!((tensor[[0, 0, 0, 0]] - expected).abs() < 1e-6);
    }

    #[test]
    fn decode_detections_filters_low_scores_and_scales() {
        // two rows: one confident, one below threshold
        let data = [
            10.0, 20.0, 110.0, 140.0, 0.9, //
            0.0, 0.0, 5.0, 5.0, 0.1,
        ];
        let detections = decode_detections(&data, 2.0, 0.5);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].x1, 20.0);
        assert_eq!(detections[0].y2, 70.0);
    }

    #[test]
    fn largest_box_wins() {
        let small = Detection {
            x1: 0.0,
            y1: 0.0,
            x2: 10.0,
            y2: 10.0,
            score: 0.99,
        };
        let big = Detection {
            x1: 50.0,
            y1: 50.0,
            x2: 150.0,
            y2: 150.0,
            score: 0.7,
        };
        let picked = pick_largest(&[small, big]).unwrap();
        assert_eq!(picked.x1, 50.0);
        assert!(pick_largest(&[]).is_none());
    }

    #[test]
    fn crop_clamps_to_image_bounds() {
        let img = RgbImage::from_pixel(100, 100, image::Rgb([10, 10, 10]));
        let face = Detection {
            x1: 80.0,
            y1: 80.0,
            x2: 120.0, // extends past the frame
            y2: 120.0,
            score: 0.8,
        };
        let chip = crop_face(&img, &face);
        assert_eq!(
            chip.dimensions(),
            (RECOGNIZER_INPUT_SIZE as u32, RECOGNIZER_INPUT_SIZE as u32)
        );
    }
}
