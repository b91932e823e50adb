use crate::model_service::Detection;
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use std::{fs, path::Path};
use thiserror::Error;

const BORDER_THICKNESS: i32 = 2;

// One color per class id; out-of-table ids wrap around.
const CLASS_COLORS: [[u8; 3]; 6] = [
    [46, 204, 64],  // healthy
    [255, 133, 27], // bacterial
    [177, 13, 201], // fungal
    [255, 65, 54],  // viral
    [255, 220, 0],  // nutrient_stress
    [0, 116, 217],  // other_disease
];

#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("Failed to create output directory: {0}")]
    CreateDir(std::io::Error),
    #[error("Failed to save annotated image: {0}")]
    Save(image::ImageError),
}

/// Draw the detection overlay on a copy of `image` and write it to
/// `output_path`, creating parent directories as needed.
pub fn save_annotated(
    image: &DynamicImage,
    detections: &[Detection],
    output_path: &Path,
) -> Result<(), AnnotateError> {
    let mut canvas = image.to_rgba8();
    let (img_w, img_h) = canvas.dimensions();

    for detection in detections {
        draw_detection(&mut canvas, detection, img_w, img_h);
    }

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).map_err(AnnotateError::CreateDir)?;
    }
    canvas.save(output_path).map_err(AnnotateError::Save)?;

    Ok(())
}

fn draw_detection(canvas: &mut RgbaImage, detection: &Detection, img_w: u32, img_h: u32) {
    let [r, g, b] = CLASS_COLORS[(detection.class_id as usize) % CLASS_COLORS.len()];
    let color = Rgba([r, g, b, 255]);

    for inset in 0..BORDER_THICKNESS {
        if let Some(rect) = rect_from_corners(detection, inset, img_w, img_h) {
            draw_hollow_rect_mut(canvas, rect, color);
        }
    }
}

/// Convert a corner-form detection to an `imageproc::rect::Rect` clamped to
/// the image bounds, shrunk by `inset` pixels on every side.
fn rect_from_corners(detection: &Detection, inset: i32, img_w: u32, img_h: u32) -> Option<Rect> {
    if img_w == 0 || img_h == 0 {
        return None;
    }
    let max_x = (img_w - 1) as f32;
    let max_y = (img_h - 1) as f32;

    let x1 = detection.x1.clamp(0.0, max_x).round() as i32 + inset;
    let y1 = detection.y1.clamp(0.0, max_y).round() as i32 + inset;
    let x2 = detection.x2.clamp(0.0, max_x).round() as i32 - inset;
    let y2 = detection.y2.clamp(0.0, max_y).round() as i32 - inset;

    if x1 >= x2 || y1 >= y2 {
        return None;
    }

    Some(Rect::at(x1, y1).of_size((x2 - x1) as u32, (y2 - y1) as u32))
}
