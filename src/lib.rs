// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod camera; // 帧来源
pub mod config; // 查看器配置参数
pub mod controller; // 帧循环控制器
pub mod detection; // 智能检测系统
pub mod display; // 显示与按键输入
pub mod error; // 错误类型
pub mod frame; // 摄像头帧
pub mod mode; // 操作员模式状态
pub mod overlay; // 叠加绘制
pub mod snapshot; // 截图保存

pub use crate::camera::{Camera, FrameDirCamera};
pub use crate::config::{Args, Edition, ViewerConfig};
pub use crate::controller::{
    command_for_key, detection_summary, Command, FpsMeter, FrameLoop, LoopSettings, LoopState,
    RunSummary, SnapshotOutcome, StepOutcome, StopReason,
};
pub use crate::detection::{
    normalize, BoundingBox, DetectionEngine, DetectionRecord, LabelTable, RawDetection, Tracking,
};
pub use crate::display::{ConsoleDisplay, Display};
pub use crate::error::{CaptureError, EngineError, NormalizeError, SaveError, ViewerError};
pub use crate::frame::Frame;
pub use crate::mode::{ClassFilter, InferenceConfig, ModeState, PrecisionMode, Thresholds};
pub use crate::overlay::{ImageOverlay, OverlayRenderer, OverlayStatus};
pub use crate::snapshot::{DiskSnapshotWriter, SnapshotWriter};
