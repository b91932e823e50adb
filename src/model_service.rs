use image::DynamicImage;
use thiserror::Error;

/// Inference sizes the model accepts.
pub const VALID_IMAGE_SIZES: [u32; 6] = [320, 416, 512, 640, 832, 1024];

/// One detected object, in original-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Per-request inference parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceParams {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub image_size: u32,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            image_size: 640,
        }
    }
}

impl InferenceParams {
    /// Rejects out-of-domain values instead of clamping them.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(format!(
                "Confidence threshold {} is outside [0.0, 1.0]",
                self.confidence_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(format!(
                "IoU threshold {} is outside [0.0, 1.0]",
                self.iou_threshold
            ));
        }
        if !VALID_IMAGE_SIZES.contains(&self.image_size) {
            return Err(format!(
                "Image size {} is not one of {:?}",
                self.image_size, VALID_IMAGE_SIZES
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Failed to decode detector output: {0}")]
    Decode(String),
}

pub trait ModelService: Send + Sync + 'static {
    fn predict(
        &self,
        image: &DynamicImage,
        params: &InferenceParams,
    ) -> Result<Vec<Detection>, DetectError>;
}
