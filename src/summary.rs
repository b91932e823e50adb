use crate::classes::class_label;
use crate::model_service::Detection;
use serde::Serialize;
use std::collections::BTreeSet;

/// Model identifier reported in every summary.
pub const MODEL_ID: &str = "cropscan-v3";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
    pub class: String,
    pub confidence: f64,
    pub bbox: [f64; 4],
}

impl DetectionRecord {
    fn from_detection(detection: &Detection) -> Self {
        Self {
            class: class_label(detection.class_id).to_string(),
            confidence: round_to(detection.confidence as f64, 4),
            bbox: [
                round_to(detection.x1 as f64, 2),
                round_to(detection.y1 as f64, 2),
                round_to(detection.x2 as f64, 2),
                round_to(detection.y2 as f64, 2),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSummary {
    pub total_detections: usize,
    pub detections: Vec<DetectionRecord>,
    pub classes_found: Vec<String>,
    pub model: &'static str,
    pub image_size: u32,
}

impl DetectionSummary {
    /// Records keep the detections' order; `classes_found` is the unique
    /// class set, emitted sorted (the contract is order-insensitive).
    pub fn new(detections: &[Detection], image_size: u32) -> Self {
        let records: Vec<DetectionRecord> = detections
            .iter()
            .map(DetectionRecord::from_detection)
            .collect();
        let classes_found: Vec<String> = records
            .iter()
            .map(|record| record.class.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            total_detections: records.len(),
            detections: records,
            classes_found,
            model: MODEL_ID,
            image_size,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detection(class_id: u32, confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection {
            class_id,
            confidence,
            x1,
            y1,
            x2,
            y2,
        }
    }

    #[test]
    fn test_empty_summary_serialization() {
        let summary = DetectionSummary::new(&[], 640);
        let value: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "total_detections": 0,
                "detections": [],
                "classes_found": [],
                "model": "cropscan-v3",
                "image_size": 640
            })
        );
    }

    #[test]
    fn test_confidence_and_bbox_rounding() {
        let summary = DetectionSummary::new(
            &[detection(0, 0.951234, 10.111, 20.226, 60.004, 80.999)],
            640,
        );
        let record = &summary.detections[0];

        assert_eq!(record.confidence, 0.9512);
        assert_eq!(record.bbox, [10.11, 20.23, 60.0, 81.0]);
    }

    #[test]
    fn test_total_matches_record_count() {
        let detections = vec![
            detection(0, 0.9, 0., 0., 10., 10.),
            detection(1, 0.8, 20., 20., 30., 30.),
            detection(0, 0.7, 40., 40., 50., 50.),
        ];
        let summary = DetectionSummary::new(&detections, 832);

        assert_eq!(summary.total_detections, 3);
        assert_eq!(summary.total_detections, summary.detections.len());
        assert_eq!(summary.image_size, 832);
    }

    #[test]
    fn test_classes_found_is_unique_class_set() {
        let detections = vec![
            detection(2, 0.9, 0., 0., 10., 10.),
            detection(0, 0.8, 20., 20., 30., 30.),
            detection(2, 0.7, 40., 40., 50., 50.),
            detection(9, 0.6, 60., 60., 70., 70.),
        ];
        let summary = DetectionSummary::new(&detections, 640);

        let expected: BTreeSet<String> = ["fungal", "healthy", "class_9"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let found: BTreeSet<String> = summary.classes_found.iter().cloned().collect();
        assert_eq!(found, expected);
        assert_eq!(summary.classes_found.len(), 3);
    }

    #[test]
    fn test_record_order_follows_detection_order() {
        let detections = vec![
            detection(1, 0.5, 0., 0., 10., 10.),
            detection(0, 0.9, 20., 20., 30., 30.),
        ];
        let summary = DetectionSummary::new(&detections, 640);

        assert_eq!(summary.detections[0].class, "bacterial");
        assert_eq!(summary.detections[1].class, "healthy");
    }
}
