// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv8 ONNX 模型 (ort 推理后端)

use std::path::Path;

use log::{debug, info, warn};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use super::engine::DetectionEngine;
use super::tracking::Tracking;
use super::types::{LabelTable, RawDetection};
use super::yolo::{self, INF_SIZE};
use crate::error::EngineError;
use crate::frame::Frame;
use crate::mode::{InferenceConfig, PrecisionMode};

/// YOLOv8 ONNX 检测模型
pub struct YoloV8Onnx {
    session: Session,
    name: String,
    labels: LabelTable,
    inf_size: u32,
    warned_precision: bool,
}

impl YoloV8Onnx {
    /// 加载模型 (启动时调用一次)
    pub fn load(path: &Path, labels: LabelTable) -> Result<Self, EngineError> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model")
            .to_string();
        let unavailable = |reason: String| EngineError::Unavailable {
            model: path.display().to_string(),
            reason,
        };

        if !path.exists() {
            return Err(unavailable("file not found".into()));
        }

        let session = Session::builder()
            .map_err(|e| unavailable(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| unavailable(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| unavailable(e.to_string()))?;

        info!("✅ YOLOv8 检测模型加载成功: {} ({} classes)", name, labels.len());

        Ok(Self {
            session,
            name,
            labels,
            inf_size: INF_SIZE,
            warned_precision: false,
        })
    }

    /// 加载模型并接上 ByteTrack 追踪器
    pub fn load_tracked(path: &Path, labels: LabelTable) -> Result<Tracking<Self>, EngineError> {
        Self::load(path, labels).map(Tracking::new)
    }
}

impl DetectionEngine for YoloV8Onnx {
    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &LabelTable {
        &self.labels
    }

    fn infer(
        &mut self,
        frame: &Frame,
        config: &InferenceConfig,
    ) -> Result<Vec<RawDetection>, EngineError> {
        if config.precision_mode == PrecisionMode::Reduced && !self.warned_precision {
            // fp16 requires an fp16 export; the session runs whatever was exported
            warn!("⚠️ 半精度推理由模型导出决定, 当前按模型原始精度运行");
            self.warned_precision = true;
        }

        let t_pre = std::time::Instant::now();
        let (input, letterbox) = yolo::preprocess(frame.image(), self.inf_size)?;
        let input = Tensor::from_array(input).map_err(|e| EngineError::Inference(e.to_string()))?;

        let t_run = std::time::Instant::now();
        let outputs = self
            .session
            .run(ort::inputs!["images" => input])
            .map_err(|e| EngineError::Inference(e.to_string()))?;
        let preds = outputs["output0"]
            .try_extract_array::<f32>()
            .map_err(|e| EngineError::Inference(e.to_string()))?;

        let t_post = std::time::Instant::now();
        let detections =
            yolo::postprocess(preds, &letterbox, frame.width(), frame.height(), config)?;

        debug!(
            "[Model] pre {:?} | run {:?} | post {:?}",
            t_run - t_pre,
            t_post - t_run,
            t_post.elapsed()
        );
        Ok(detections)
    }

    fn infer_with_tracking(
        &mut self,
        frame: &Frame,
        config: &InferenceConfig,
    ) -> Result<Vec<RawDetection>, EngineError> {
        // no tracker here; `load_tracked` adds one
        self.infer(frame, config)
    }
}
