// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv8 预处理与后处理
// letterbox → NCHW 张量; [1, 4 + nc, anchors] 输出 → 检测框

use fast_image_resize as fr;
use image::RgbImage;
use ndarray::{Array, ArrayViewD, Axis, Ix3, Ix4};

use super::types::{BoundingBox, RawDetection};
use crate::error::EngineError;
use crate::mode::InferenceConfig;

/// YOLOv8推理输入尺寸
pub const INF_SIZE: u32 = 640;

/// 填充灰度值 (114/255)
const PAD_VALUE: f32 = 114.0 / 255.0;

/// 每帧最多保留的检测数
pub const MAX_DETECTIONS: usize = 300;

const CXYWH_OFFSET: usize = 4;

/// 缩放信息 (图像贴在左上角, 只需要比例即可还原坐标)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub ratio: f32,
    pub size: u32,
}

impl Letterbox {
    pub fn for_frame(width: u32, height: u32, size: u32) -> Self {
        let ratio = (size as f32 / width as f32).min(size as f32 / height as f32);
        Self { ratio, size }
    }

    /// Size of the resized frame inside the square input.
    pub fn scaled_dims(&self, width: u32, height: u32) -> (u32, u32) {
        let w = ((width as f32 * self.ratio).round() as u32).clamp(1, self.size);
        let h = ((height as f32 * self.ratio).round() as u32).clamp(1, self.size);
        (w, h)
    }
}

/// 预处理: RGB 帧 → [1, 3, size, size] 张量 (0..1)
pub fn preprocess(
    image: &RgbImage,
    size: u32,
) -> Result<(Array<f32, Ix4>, Letterbox), EngineError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(EngineError::Inference("empty frame".into()));
    }

    let letterbox = Letterbox::for_frame(width, height, size);
    let (new_w, new_h) = letterbox.scaled_dims(width, height);

    let src = fr::images::ImageRef::new(width, height, image.as_raw(), fr::PixelType::U8x3)
        .map_err(|e| EngineError::Inference(format!("resize source: {e}")))?;
    let mut dst = fr::images::Image::new(new_w, new_h, fr::PixelType::U8x3);
    let mut resizer = fr::Resizer::new();
    resizer
        .resize(
            &src,
            &mut dst,
            &fr::ResizeOptions::new()
                .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear)),
        )
        .map_err(|e| EngineError::Inference(format!("resize: {e}")))?;

    let size = size as usize;
    let mut tensor = Array::from_elem((1, 3, size, size), PAD_VALUE);
    let pixels = dst.buffer();
    let (new_w, new_h) = (new_w as usize, new_h as usize);
    for y in 0..new_h {
        for x in 0..new_w {
            let i = (y * new_w + x) * 3;
            tensor[[0, 0, y, x]] = pixels[i] as f32 / 255.0;
            tensor[[0, 1, y, x]] = pixels[i + 1] as f32 / 255.0;
            tensor[[0, 2, y, x]] = pixels[i + 2] as f32 / 255.0;
        }
    }

    Ok((tensor, letterbox))
}

/// 后处理: 模型原始输出 → 检测框 (已按置信度降序, 已做 NMS)
///
/// `output` is `[1, 4 + nc, anchors]`; boxes are mapped back onto the
/// `frame_w` x `frame_h` frame.
pub fn postprocess(
    output: ArrayViewD<'_, f32>,
    letterbox: &Letterbox,
    frame_w: u32,
    frame_h: u32,
    config: &InferenceConfig,
) -> Result<Vec<RawDetection>, EngineError> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[1] <= CXYWH_OFFSET {
        return Err(EngineError::Inference(format!(
            "unexpected YOLOv8 output shape {shape:?}"
        )));
    }
    let nc = shape[1] - CXYWH_OFFSET;
    let output = output
        .into_dimensionality::<Ix3>()
        .map_err(|e| EngineError::Inference(e.to_string()))?;
    let preds = output.index_axis(Axis(0), 0);

    let (fw, fh) = (frame_w as f32, frame_h as f32);
    let mut data: Vec<(u32, f32, BoundingBox)> = Vec::new();
    for pred in preds.axis_iter(Axis(1)) {
        let mut best = (0usize, f32::MIN);
        for c in 0..nc {
            let score = pred[CXYWH_OFFSET + c];
            if score > best.1 {
                best = (c, score);
            }
        }
        let (class_id, confidence) = (best.0 as u32, best.1);

        if confidence < config.confidence_threshold || !config.class_filter.allows(class_id) {
            continue;
        }

        let cx = pred[0] / letterbox.ratio;
        let cy = pred[1] / letterbox.ratio;
        let w = pred[2] / letterbox.ratio;
        let h = pred[3] / letterbox.ratio;
        let x1 = (cx - w / 2.0).clamp(0.0, fw);
        let y1 = (cy - h / 2.0).clamp(0.0, fh);
        let x2 = (cx + w / 2.0).clamp(0.0, fw);
        let y2 = (cy + h / 2.0).clamp(0.0, fh);

        data.push((class_id, confidence, BoundingBox::from_corners(x1, y1, x2, y2)));
    }

    non_max_suppression(&mut data, config.iou_threshold);
    data.truncate(MAX_DETECTIONS);

    Ok(data
        .into_iter()
        .map(|(class_id, confidence, bbox)| RawDetection::Detection {
            class_id,
            confidence,
            bbox,
        })
        .collect())
}

/// 按类别做 NMS (不同类别的框互不抑制)
pub fn non_max_suppression(xs: &mut Vec<(u32, f32, BoundingBox)>, iou_threshold: f32) {
    xs.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            if xs[prev_index].0 != xs[index].0 {
                continue;
            }
            if xs[prev_index].2.iou(&xs[index].2) > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{ModeState, Thresholds};
    use ndarray::Array3;

    /// Build a `[1, 4 + nc, n]` tensor from (cx, cy, w, h, class, score) rows.
    fn output(nc: usize, rows: &[(f32, f32, f32, f32, usize, f32)]) -> Array3<f32> {
        let mut out = Array3::<f32>::zeros((1, 4 + nc, rows.len()));
        for (i, &(cx, cy, w, h, class, score)) in rows.iter().enumerate() {
            out[[0, 0, i]] = cx;
            out[[0, 1, i]] = cy;
            out[[0, 2, i]] = w;
            out[[0, 3, i]] = h;
            out[[0, 4 + class, i]] = score;
        }
        out
    }

    fn config(person_only: bool) -> InferenceConfig {
        let mut mode = ModeState::new();
        if person_only {
            mode.toggle_person_only();
        }
        mode.current_config(&Thresholds::default())
    }

    #[test]
    fn letterbox_keeps_aspect_ratio() {
        let lb = Letterbox::for_frame(1280, 720, 640);
        assert!((lb.ratio - 0.5).abs() < 1e-6);
        assert_eq!(lb.scaled_dims(1280, 720), (640, 360));
    }

    #[test]
    fn preprocess_pads_below_the_image() {
        let image = RgbImage::from_pixel(64, 32, image::Rgb([255, 0, 0]));
        let (tensor, lb) = preprocess(&image, 32).expect("preprocess");
        assert_eq!(tensor.shape(), &[1, 3, 32, 32]);
        assert!((lb.ratio - 0.5).abs() < 1e-6);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-3);
        assert!((tensor[[0, 0, 31, 0]] - PAD_VALUE).abs() < 1e-6);
    }

    #[test]
    fn postprocess_maps_back_to_frame_coordinates() {
        let out = output(3, &[(100.0, 100.0, 40.0, 20.0, 2, 0.9)]);
        let lb = Letterbox::for_frame(1280, 1280, 640);
        let dets = postprocess(out.view().into_dyn(), &lb, 1280, 1280, &config(false))
            .expect("postprocess");
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id(), 2);
        let b = dets[0].bbox();
        assert!((b.x - 160.0).abs() < 1e-3);
        assert!((b.y - 180.0).abs() < 1e-3);
        assert!((b.w - 80.0).abs() < 1e-3);
        assert!((b.h - 40.0).abs() < 1e-3);
    }

    #[test]
    fn postprocess_applies_threshold_and_class_filter() {
        let rows = [
            (50.0, 50.0, 10.0, 10.0, 0, 0.9),
            (200.0, 50.0, 10.0, 10.0, 1, 0.8),
            (400.0, 50.0, 10.0, 10.0, 0, 0.2),
        ];
        let out = output(2, &rows);
        let lb = Letterbox::for_frame(640, 640, 640);

        let all = postprocess(out.view().into_dyn(), &lb, 640, 640, &config(false)).unwrap();
        assert_eq!(all.len(), 2);

        let people = postprocess(out.view().into_dyn(), &lb, 640, 640, &config(true)).unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].class_id(), 0);
    }

    #[test]
    fn nms_is_per_class() {
        let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let mut xs = vec![(0, 0.8, b), (0, 0.9, b), (1, 0.7, b)];
        non_max_suppression(&mut xs, 0.5);
        assert_eq!(xs.len(), 2);
        assert_eq!(xs[0].1, 0.9);
        assert_eq!(xs[1].0, 1);
    }

    #[test]
    fn rejects_malformed_output() {
        let out = Array3::<f32>::zeros((1, 3, 5));
        let lb = Letterbox::for_frame(640, 640, 640);
        assert!(postprocess(out.view().into_dyn(), &lb, 640, 640, &config(false)).is_err());
    }
}
