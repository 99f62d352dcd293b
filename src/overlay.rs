// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 叠加绘制 (Overlay)
//!
//! Boxes, labels and status text are drawn onto a copy of the frame. Status text is
//! built by `status_lines` so the wording can be checked without a font.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use log::info;

use crate::config::Edition;
use crate::detection::{BoundingBox, DetectionRecord};
use crate::frame::Frame;

/// 状态文字颜色 (模式 / 追踪 / 模型信息)
const STATUS_COLORS: [Rgb<u8>; 3] = [Rgb([255, 255, 0]), Rgb([0, 255, 0]), Rgb([0, 255, 255])];
const STATUS_ORIGIN: (i32, i32) = (10, 12);
const STATUS_LINE_HEIGHT: i32 = 30;
const LABEL_SCALE: f32 = 20.0;
const STATUS_SCALE: f32 = 22.0;
const BOX_THICKNESS: i32 = 2;

/// 按 ID 分配颜色 (黄金角步进色相, 相邻 ID 颜色差异大)
pub fn palette_color(id: u32) -> Rgb<u8> {
    let hue = (id as f32 * 137.508) % 360.0;
    let (s, v) = (0.8f32, 0.9f32);
    let chroma = v * s;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = v - chroma;
    Rgb([r, g, b].map(|c| ((c + m) * 255.0) as u8))
}

/// 每帧的状态信息
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStatus {
    pub edition: Edition,
    pub person_only: bool,
    pub tracking_enabled: bool,
    pub model_name: String,
    /// 标准检测阈值 (追踪模式下也显示此值)
    pub confidence: f32,
    pub fps: Option<f64>,
    pub class_count: usize,
}

/// 状态文字 (从上到下)
pub fn status_lines(status: &OverlayStatus) -> Vec<String> {
    let mode = if status.person_only {
        "MODE: PERSON ONLY".to_string()
    } else {
        match status.edition {
            Edition::V1 => "MODE: ALL OBJECTS".to_string(),
            Edition::V2 => format!("MODE: ALL OBJECTS ({} COCO)", status.class_count),
        }
    };

    match status.edition {
        Edition::V1 => vec![mode],
        Edition::V2 => {
            let tracking = format!(
                "TRACKING: {}",
                if status.tracking_enabled { "ON" } else { "OFF" }
            );
            let fps = status
                .fps
                .map(|f| format!("{}", f as u64))
                .unwrap_or_else(|| "--".to_string());
            let info = format!(
                "Model: {} | Conf: {:.2} | FPS: {}",
                status.model_name, status.confidence, fps
            );
            vec![mode, tracking, info]
        }
    }
}

/// 检测框标签
pub fn box_label(record: &DetectionRecord) -> String {
    match record.track_id {
        Some(id) => format!("ID:{} {} {:.2}", id, record.label, record.confidence),
        None => format!("{} {:.2}", record.label, record.confidence),
    }
}

/// 叠加绘制接口
pub trait OverlayRenderer {
    /// Returns the annotated copy; the input frame is left untouched.
    fn render(
        &self,
        frame: &Frame,
        records: &[DetectionRecord],
        status: &OverlayStatus,
    ) -> RgbImage;
}

/// imageproc 绘制实现
pub struct ImageOverlay {
    font: Option<FontArc>,
}

impl ImageOverlay {
    /// 不带字体: 只画框, 不画文字
    pub fn without_text() -> Self {
        Self { font: None }
    }

    /// 加载字体 (TTF/OTF)
    pub fn with_font_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("无法读取字体文件: {}", path.display()))?;
        let font = FontArc::try_from_vec(bytes)
            .with_context(|| format!("字体文件无效: {}", path.display()))?;
        info!("✅ 字体加载成功: {}", path.display());
        Ok(Self { font: Some(font) })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn draw_box(canvas: &mut RgbImage, (x, y, w, h): (i32, i32, i32, i32), color: Rgb<u8>) {
        for t in 0..BOX_THICKNESS {
            let (tw, th) = (w - 2 * t, h - 2 * t);
            if tw <= 0 || th <= 0 {
                break;
            }
            draw_hollow_rect_mut(
                canvas,
                Rect::at(x + t, y + t).of_size(tw as u32, th as u32),
                color,
            );
        }
    }
}

/// 检测框与画布的交集 `(x, y, w, h)`; 完全在画布外时为 `None`
pub fn visible_rect(bbox: &BoundingBox, width: u32, height: u32) -> Option<(i32, i32, i32, i32)> {
    let x1 = (bbox.x.round() as i32).max(0);
    let y1 = (bbox.y.round() as i32).max(0);
    let x2 = (bbox.x2().round() as i32).min(width as i32);
    let y2 = (bbox.y2().round() as i32).min(height as i32);
    (x2 > x1 && y2 > y1).then(|| (x1, y1, x2 - x1, y2 - y1))
}

impl OverlayRenderer for ImageOverlay {
    fn render(
        &self,
        frame: &Frame,
        records: &[DetectionRecord],
        status: &OverlayStatus,
    ) -> RgbImage {
        let mut canvas = frame.annotated_copy();
        if canvas.width() == 0 || canvas.height() == 0 {
            return canvas;
        }

        for record in records {
            let Some(rect) = visible_rect(&record.bbox, canvas.width(), canvas.height()) else {
                continue;
            };
            let color = palette_color(record.track_id.unwrap_or(record.class_id));
            Self::draw_box(&mut canvas, rect, color);

            if let Some(font) = &self.font {
                let x = rect.0;
                let y = (rect.1 as f32 - LABEL_SCALE - 2.0).max(0.0) as i32;
                draw_text_mut(
                    &mut canvas,
                    color,
                    x,
                    y,
                    PxScale::from(LABEL_SCALE),
                    font,
                    &box_label(record),
                );
            }
        }

        if let Some(font) = &self.font {
            let (x, y0) = STATUS_ORIGIN;
            for (i, line) in status_lines(status).iter().enumerate() {
                draw_text_mut(
                    &mut canvas,
                    STATUS_COLORS[i % STATUS_COLORS.len()],
                    x,
                    y0 + i as i32 * STATUS_LINE_HEIGHT,
                    PxScale::from(STATUS_SCALE),
                    font,
                    line,
                );
            }
        }

        canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(edition: Edition) -> OverlayStatus {
        OverlayStatus {
            edition,
            person_only: false,
            tracking_enabled: false,
            model_name: "yolov8n.onnx".into(),
            confidence: 0.45,
            fps: None,
            class_count: 80,
        }
    }

    fn record(track_id: Option<u32>) -> DetectionRecord {
        DetectionRecord {
            class_id: 0,
            label: "person".into(),
            confidence: 0.876,
            bbox: BoundingBox::new(10.0, 10.0, 20.0, 30.0),
            track_id,
        }
    }

    #[test]
    fn v1_shows_mode_only() {
        let mut s = status(Edition::V1);
        assert_eq!(status_lines(&s), vec!["MODE: ALL OBJECTS"]);
        s.person_only = true;
        assert_eq!(status_lines(&s), vec!["MODE: PERSON ONLY"]);
    }

    #[test]
    fn v2_shows_tracking_and_model_info() {
        let mut s = status(Edition::V2);
        assert_eq!(
            status_lines(&s),
            vec![
                "MODE: ALL OBJECTS (80 COCO)",
                "TRACKING: OFF",
                "Model: yolov8n.onnx | Conf: 0.45 | FPS: --",
            ]
        );

        s.tracking_enabled = true;
        s.fps = Some(29.7);
        let lines = status_lines(&s);
        assert_eq!(lines[1], "TRACKING: ON");
        assert_eq!(lines[2], "Model: yolov8n.onnx | Conf: 0.45 | FPS: 29");
    }

    #[test]
    fn labels_include_track_id_when_present() {
        assert_eq!(box_label(&record(None)), "person 0.88");
        assert_eq!(box_label(&record(Some(7))), "ID:7 person 0.88");
    }

    #[test]
    fn render_draws_on_a_copy() {
        let frame = Frame::filled(64, 64, [0, 0, 0]);
        let overlay = ImageOverlay::without_text();
        let out = overlay.render(&frame, &[record(None)], &status(Edition::V2));

        assert_eq!(out.dimensions(), (64, 64));
        assert_ne!(out.get_pixel(10, 10), &Rgb([0, 0, 0]));
        assert_eq!(frame.image().get_pixel(10, 10), &Rgb([0, 0, 0]));
        // interior untouched
        assert_eq!(out.get_pixel(20, 25), &Rgb([0, 0, 0]));
    }

    #[test]
    fn boxes_past_the_edge_are_clipped() {
        let frame = Frame::filled(32, 32, [0, 0, 0]);
        let mut r = record(None);
        r.bbox = BoundingBox::new(-5.0, 20.0, 100.0, 100.0);
        let out = ImageOverlay::without_text().render(&frame, &[r], &status(Edition::V1));
        assert_ne!(out.get_pixel(0, 20), &Rgb([0, 0, 0]));
    }

    #[test]
    fn boxes_outside_the_canvas_draw_nothing() {
        let frame = Frame::filled(32, 32, [0, 0, 0]);
        let mut right = record(None);
        right.bbox = BoundingBox::new(40.0, 5.0, 10.0, 10.0);
        let mut above = record(Some(3));
        above.bbox = BoundingBox::new(5.0, -30.0, 10.0, 10.0);

        let out = ImageOverlay::without_text().render(&frame, &[right, above], &status(Edition::V2));
        assert!(out.pixels().all(|p| *p == Rgb([0, 0, 0])));
        assert_eq!(visible_rect(&BoundingBox::new(40.0, 5.0, 10.0, 10.0), 32, 32), None);
        assert_eq!(
            visible_rect(&BoundingBox::new(-5.0, 20.0, 100.0, 100.0), 32, 32),
            Some((0, 20, 32, 12))
        );
    }

    #[test]
    fn palette_separates_neighbouring_ids() {
        assert_ne!(palette_color(1), palette_color(2));
        assert_ne!(palette_color(0), Rgb([0, 0, 0]));
    }

    #[test]
    fn missing_font_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageOverlay::with_font_file(&dir.path().join("none.ttf")).is_err());
    }
}
