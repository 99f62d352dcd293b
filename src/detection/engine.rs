// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use super::types::{LabelTable, RawDetection};
use crate::error::EngineError;
use crate::frame::Frame;
use crate::mode::InferenceConfig;

/// 推理引擎统一接口
///
/// ## 核心流程
/// ```text
/// 摄像头帧 + InferenceConfig
///          ↓
///     infer / infer_with_tracking
///          ↓
///     Vec<RawDetection> → normalize → Vec<DetectionRecord>
/// ```
///
/// The loop calls exactly one of the two methods per frame, chosen by
/// `InferenceConfig::tracking_enabled`. Keeping track identities continuous across
/// calls is the engine's job. Plain detectors such as `YoloV8Onnx` have no tracker of
/// their own: wrap them in [`Tracking`](super::Tracking) to get persistent ids.
pub trait DetectionEngine {
    /// Model identifier shown in the overlay, e.g. `yolov8n`.
    fn name(&self) -> &str;

    /// Class table fixed when the model was loaded.
    fn labels(&self) -> &LabelTable;

    /// Plain detection, no tracker state involved.
    fn infer(&mut self, frame: &Frame, config: &InferenceConfig)
        -> Result<Vec<RawDetection>, EngineError>;

    /// Detection plus persistent tracking. Results carry track ids where the
    /// tracker has confirmed an identity. An engine without a tracker may return
    /// plain detections here.
    fn infer_with_tracking(
        &mut self,
        frame: &Frame,
        config: &InferenceConfig,
    ) -> Result<Vec<RawDetection>, EngineError>;
}

impl<E: DetectionEngine + ?Sized> DetectionEngine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn labels(&self) -> &LabelTable {
        (**self).labels()
    }

    fn infer(
        &mut self,
        frame: &Frame,
        config: &InferenceConfig,
    ) -> Result<Vec<RawDetection>, EngineError> {
        (**self).infer(frame, config)
    }

    fn infer_with_tracking(
        &mut self,
        frame: &Frame,
        config: &InferenceConfig,
    ) -> Result<Vec<RawDetection>, EngineError> {
        (**self).infer_with_tracking(frame, config)
    }
}
