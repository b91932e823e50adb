mod annotate;
mod model_service;
mod ort_service;
mod predictor;
mod summary;

pub mod classes;
pub mod config;
pub mod telemetry;

pub use annotate::AnnotateError;
pub use model_service::{DetectError, Detection, InferenceParams, ModelService, VALID_IMAGE_SIZES};
pub use ort_service::OrtModelService;
pub use predictor::{PredictError, PredictOutput, Predictor, SetupError};
pub use summary::{DetectionRecord, DetectionSummary, MODEL_ID};
