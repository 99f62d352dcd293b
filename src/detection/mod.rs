//! 检测系统 (Detection System)
//!
//! - Engine:    推理引擎接口 (infer / infer_with_tracking)
//! - Normalize: 原始输出 → DetectionRecord
//! - Tracking:  ByteTrack 目标追踪
//! - Yolo:      YOLOv8 预处理与后处理
pub mod bytetrack;
pub mod engine;
pub mod normalize;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod tracking;
pub mod types;
pub mod yolo;

pub use engine::DetectionEngine;
pub use normalize::normalize;
#[cfg(feature = "onnx")]
pub use onnx::YoloV8Onnx;
pub use tracking::Tracking;
pub use types::{BoundingBox, DetectionRecord, LabelTable, RawDetection};
