use crate::{
    config::ModelSettings,
    model_service::{DetectError, Detection, InferenceParams, ModelService},
};
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::{s, Array, Axis, Ix3, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

fn intersection(box1: &Detection, box2: &Detection) -> f32 {
    let width = (box1.x2.min(box2.x2) - box1.x1.max(box2.x1)).max(0.);
    let height = (box1.y2.min(box2.y2) - box1.y1.max(box2.y1)).max(0.);
    width * height
}

fn union(box1: &Detection, box2: &Detection) -> f32 {
    ((box1.x2 - box1.x1) * (box1.y2 - box1.y1)) + ((box2.x2 - box2.x1) * (box2.y2 - box2.y1))
        - intersection(box1, box2)
}

/// Greedy non-max suppression, highest confidence first. The returned order
/// is the model service's native output order.
fn non_max_suppression(mut boxes: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    boxes.sort_by(|box1, box2| box2.confidence.total_cmp(&box1.confidence));
    let mut result = Vec::new();

    while !boxes.is_empty() {
        result.push(boxes[0]);
        boxes = boxes
            .iter()
            .filter(|box1| intersection(&boxes[0], box1) / union(&boxes[0], box1) < iou_threshold)
            .copied()
            .collect();
    }

    result
}

fn transform_image(image: &DynamicImage, size: u32) -> (Array<f32, Ix4>, u32, u32) {
    let (img_width, img_height) = image.dimensions();
    let img = image.resize_exact(size, size, FilterType::CatmullRom);

    let side = size as usize;
    let mut input = Array::zeros((1, 3, side, side));
    for pixel in img.pixels() {
        let x = pixel.0 as usize;
        let y = pixel.1 as usize;
        let [r, g, b, _] = pixel.2 .0;
        input[[0, 0, y, x]] = (r as f32) / 255.;
        input[[0, 1, y, x]] = (g as f32) / 255.;
        input[[0, 2, y, x]] = (b as f32) / 255.;
    }

    (input, img_height, img_width)
}

/// Pool of ONNX sessions over the cropscan-v3 weights. Built once per
/// process; read-only afterwards apart from the round-robin counter.
#[derive(Clone)]
pub struct OrtModelService {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
}

impl OrtModelService {
    pub fn new(model_settings: &ModelSettings) -> Result<Self, ort::Error> {
        ort::init().commit();
        let num_instances = model_settings.num_instances;
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_file(model_settings.get_model_path())?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        tracing::info!("Created {} ONNX sessions", num_instances);

        Ok(Self {
            counter: Arc::new(AtomicUsize::new(0)),
            sessions: Arc::new(sessions),
        })
    }

    fn run_inference(&self, input: &Array<f32, Ix4>) -> Result<ndarray::ArrayD<f32>, DetectError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let session_arc = &self.sessions[index];
        let mut session = session_arc
            .lock()
            .map_err(|e| DetectError::Inference(format!("session mutex poisoned: {}", e)))?;

        tracing::debug!("Handling request with session {}", index);
        let owned_buffer;
        let input_view = if input.view().is_standard_layout() {
            input.view()
        } else {
            owned_buffer = input.to_owned();
            owned_buffer.view()
        };

        let tensor_ref = TensorRef::from_array_view(input_view)
            .map_err(|e| DetectError::Inference(format!("failed to build tensor: {}", e)))?;

        let input_tensor = ort::inputs![tensor_ref];

        let outputs = session
            .run(input_tensor)
            .map_err(|e| DetectError::Inference(format!("inference failed: {}", e)))?;

        let (shape, data) = outputs["output0"]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectError::Decode(format!("failed to extract tensor: {}", e)))?;

        let ix = shape.to_ixdyn();
        let array = ndarray::ArrayD::from_shape_vec(ix, data.to_vec())
            .map_err(|e| DetectError::Decode(format!("invalid tensor shape: {}", e)))?;

        Ok(array)
    }
}

impl ModelService for OrtModelService {
    fn predict(
        &self,
        image: &DynamicImage,
        params: &InferenceParams,
    ) -> Result<Vec<Detection>, DetectError> {
        let size = params.image_size;
        let (input, img_height, img_width) = transform_image(image, size);

        let outputs = self.run_inference(&input)?;
        // Expected layout: [1, 4 + num_classes, num_anchors].
        let outputs = outputs
            .into_dimensionality::<Ix3>()
            .map_err(|e| DetectError::Decode(format!("unexpected output shape: {}", e)))?;
        let output = outputs.slice(s![0, .., ..]);

        let mut boxes = Vec::new();
        for anchor in output.axis_iter(Axis(1)) {
            let anchor: Vec<_> = anchor.iter().copied().collect();
            let (class_id, prob) = anchor
                .iter()
                .skip(4)
                .enumerate()
                .map(|(index, value)| (index, *value))
                .reduce(|accum, row| if row.1 > accum.1 { row } else { accum })
                .ok_or_else(|| {
                    DetectError::Decode("output anchor carries no class scores".to_string())
                })?;

            if prob < params.confidence_threshold {
                continue;
            }

            let xc = anchor[0] / (size as f32) * (img_width as f32);
            let yc = anchor[1] / (size as f32) * (img_height as f32);
            let w = anchor[2] / (size as f32) * (img_width as f32);
            let h = anchor[3] / (size as f32) * (img_height as f32);

            boxes.push(Detection {
                class_id: class_id as u32,
                confidence: prob,
                x1: xc - w / 2.,
                y1: yc - h / 2.,
                x2: xc + w / 2.,
                y2: yc + h / 2.,
            });
        }

        Ok(non_max_suppression(boxes, params.iou_threshold))
    }
}
