// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 错误类型 (Error types)
//!
//! Fatal kinds end the session; `NormalizeError` only ever drops one record.

use std::path::PathBuf;

use thiserror::Error;

/// 推理引擎错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("model '{model}' is unavailable: {reason}")]
    Unavailable { model: String, reason: String },

    #[error("inference failed: {0}")]
    Inference(String),
}

/// 摄像头错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    #[error("could not open camera source '{source_name}': {reason}")]
    Open { source_name: String, reason: String },

    #[error("camera source exhausted after {frames} frames")]
    Exhausted { frames: u64 },

    #[error("failed to grab frame from {path}: {reason}")]
    Read { path: PathBuf, reason: String },
}

/// 截图保存错误
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("could not create screenshot directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write screenshot {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// 单条检测记录的规范化错误 (只丢弃该记录)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("class id {0} has no entry in the label table")]
    UnknownClass(u32),

    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f32),
}

/// 会话级错误 (终止主循环)
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}
