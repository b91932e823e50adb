use crate::{
    annotate::{self, AnnotateError},
    config::Settings,
    model_service::{DetectError, InferenceParams, ModelService},
    ort_service::OrtModelService,
    summary::DetectionSummary,
};
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Failed to load detection model: {0}")]
    Model(#[from] ort::Error),
    #[error("Failed to create output directory: {0}")]
    OutputDir(std::io::Error),
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Detection(#[from] DetectError),
    #[error(transparent)]
    Annotate(#[from] AnnotateError),
    #[error("Failed to serialize detection summary: {0}")]
    Summary(#[from] serde_json::Error),
}

/// Result of one inference call. `json_str` is populated only when the
/// caller asked for the JSON summary.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictOutput {
    pub image: PathBuf,
    pub json_str: Option<String>,
}

/// The prediction adapter. Holds the shared model handle; stateless across
/// requests apart from the output-name counter.
pub struct Predictor<M: ModelService> {
    model_service: Arc<M>,
    output_dir: PathBuf,
    request_counter: AtomicUsize,
}

impl Predictor<OrtModelService> {
    /// Initialization hook. The host calls this once per process and must
    /// treat an error as fatal: no requests are served without a model.
    pub fn setup(settings: &Settings) -> Result<Self, SetupError> {
        settings.model.validate().map_err(SetupError::Config)?;
        let model_service = OrtModelService::new(&settings.model)?;
        std::fs::create_dir_all(&settings.output.output_dir).map_err(SetupError::OutputDir)?;

        Ok(Self::new(
            model_service,
            settings.output.output_dir.clone(),
        ))
    }
}

impl<M: ModelService> Predictor<M> {
    pub fn new(model_service: M, output_dir: PathBuf) -> Self {
        Self {
            model_service: Arc::new(model_service),
            output_dir,
            request_counter: AtomicUsize::new(0),
        }
    }

    /// Inference hook. Validates inputs before any detection work, always
    /// writes the annotated image, and builds the JSON summary on request.
    pub fn predict(
        &self,
        image_path: &Path,
        params: InferenceParams,
        return_json: bool,
    ) -> Result<PredictOutput, PredictError> {
        params.validate().map_err(PredictError::InvalidInput)?;
        let image = image::open(image_path).map_err(|e| {
            PredictError::InvalidInput(format!(
                "Failed to read image {}: {}",
                image_path.display(),
                e
            ))
        })?;

        let detections = self.model_service.predict(&image, &params)?;

        tracing::debug!("Returning {} detections", detections.len());
        for (i, detection) in detections.iter().enumerate() {
            tracing::debug!(
                "Detection {}: class_id={}, confidence={:.3}, bbox=({:.1}, {:.1}, {:.1}, {:.1})",
                i,
                detection.class_id,
                detection.confidence,
                detection.x1,
                detection.y1,
                detection.x2,
                detection.y2
            );
        }

        let output_path = self.next_output_path();
        annotate::save_annotated(&image, &detections, &output_path)?;

        let json_str = if return_json {
            Some(DetectionSummary::new(&detections, params.image_size).to_json()?)
        } else {
            None
        };

        Ok(PredictOutput {
            image: output_path,
            json_str,
        })
    }

    // Unique per request so concurrently dispatched calls never overwrite
    // each other's output.
    fn next_output_path(&self) -> PathBuf {
        let request = self.request_counter.fetch_add(1, Ordering::SeqCst);
        self.output_dir.join(format!("output_{:06}.png", request))
    }
}
