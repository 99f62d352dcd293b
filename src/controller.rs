// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 帧循环控制器 (Frame loop controller)
//!
//! ## 单次迭代
//! ```text
//! camera.read → frame_count += 1 → ModeState::current_config
//!      ↓
//! engine.infer / infer_with_tracking → normalize → 采样日志 (每 N 帧)
//!      ↓
//! overlay.render → display.show → display.poll_key → 命令分发
//! ```
//!
//! `step()` runs exactly one iteration; `run()` repeats it until the loop stops and
//! then releases the camera and the display. Release happens once, on every exit
//! path, and again never.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use phf::phf_map;

use crate::camera::Camera;
use crate::config::{Edition, ViewerConfig};
use crate::detection::{normalize, DetectionEngine, DetectionRecord};
use crate::display::Display;
use crate::error::{CaptureError, EngineError, ViewerError};
use crate::mode::{ModeState, Thresholds};
use crate::overlay::{OverlayRenderer, OverlayStatus};
use crate::snapshot::SnapshotWriter;

/// 键盘命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    Capture,
    TogglePersonOnly,
    ShowAll,
    ToggleTracking,
}

static KEY_COMMANDS: phf::Map<char, Command> = phf_map! {
    'q' => Command::Quit,
    'c' => Command::Capture,
    't' => Command::TogglePersonOnly,
    'a' => Command::ShowAll,
    'k' => Command::ToggleTracking,
};

/// 按键 → 命令 (区分大小写; v1 没有追踪键)
pub fn command_for_key(key: char, edition: Edition) -> Option<Command> {
    let command = *KEY_COMMANDS.get(&key)?;
    if command == Command::ToggleTracking && !edition.supports_tracking() {
        return None;
    }
    Some(command)
}

/// 启动时打印的按键说明
pub fn key_help(edition: Edition) -> Vec<&'static str> {
    let mut lines = vec![
        "➡️  Press 'q' to QUIT",
        "➡️  Press 'c' to CAPTURE screenshot",
        "➡️  Press 't' to TOGGLE person-only mode",
        "➡️  Press 'a' to SHOW ALL classes again",
    ];
    if edition.supports_tracking() {
        lines.push("➡️  Press 'k' to TOGGLE OBJECT TRACKING");
    }
    lines
}

/// 采样日志行
pub fn detection_summary(frame_count: u64, records: &[DetectionRecord]) -> String {
    if records.is_empty() {
        format!("[🔍 Frame {}] Nothing detected.", frame_count)
    } else {
        let objects: Vec<String> = records.iter().map(DetectionRecord::describe).collect();
        format!("[🔍 Frame {}] Detected: {}", frame_count, objects.join(", "))
    }
}

/// FPS 估计: 相邻两次迭代开始时刻之差的倒数
#[derive(Debug, Default)]
pub struct FpsMeter {
    last: Option<Instant>,
}

impl FpsMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` on the first tick or when no time has passed.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        let fps = self.last.and_then(|last| {
            let dt = now.saturating_duration_since(last).as_secs_f64();
            (dt > 0.0).then(|| 1.0 / dt)
        });
        self.last = Some(now);
        fps
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// 停止原因
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    Quit,
    CaptureFailed(CaptureError),
    EngineFailed(EngineError),
}

/// 'c' 键的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    Saved(PathBuf),
    /// 未配置截图保存, 只发出提示
    Disabled,
    Failed(String),
}

/// 单次迭代结果
#[derive(Debug)]
pub struct StepOutcome {
    pub state: LoopState,
    pub frame_count: u64,
    pub records: Vec<DetectionRecord>,
    pub sampled_log: Option<String>,
    pub command: Option<Command>,
    pub fps: Option<f64>,
    /// 本次迭代按下 'c' 时的截图结果
    pub snapshot: Option<SnapshotOutcome>,
}

impl StepOutcome {
    fn stopped(frame_count: u64) -> Self {
        Self {
            state: LoopState::Stopped,
            frame_count,
            records: Vec::new(),
            sampled_log: None,
            command: None,
            fps: None,
            snapshot: None,
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub frames: u64,
    pub reason: StopReason,
}

/// 循环参数
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub edition: Edition,
    pub thresholds: Thresholds,
    pub log_every: u64,
    pub key_poll: Duration,
    pub window_title: String,
    pub model_name: String,
}

impl LoopSettings {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            edition: config.edition,
            thresholds: config.thresholds(),
            log_every: config.log_every.max(1),
            key_poll: Duration::from_millis(config.key_poll_ms),
            window_title: config.window_title(),
            model_name: config.model_name(),
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

pub struct FrameLoop {
    camera: Box<dyn Camera>,
    engine: Box<dyn DetectionEngine>,
    overlay: Box<dyn OverlayRenderer>,
    display: Box<dyn Display>,
    snapshots: Option<Box<dyn SnapshotWriter>>,
    settings: LoopSettings,
    mode: ModeState,
    frame_count: u64,
    fps: FpsMeter,
    state: LoopState,
    stop_reason: Option<StopReason>,
    released: bool,
}

impl FrameLoop {
    pub fn new(
        camera: Box<dyn Camera>,
        engine: Box<dyn DetectionEngine>,
        overlay: Box<dyn OverlayRenderer>,
        display: Box<dyn Display>,
        settings: LoopSettings,
    ) -> Self {
        Self {
            camera,
            engine,
            overlay,
            display,
            snapshots: None,
            settings,
            mode: ModeState::new(),
            frame_count: 0,
            fps: FpsMeter::new(),
            state: LoopState::Running,
            stop_reason: None,
            released: false,
        }
    }

    /// 启用截图保存 (不调用时 'c' 只提示已禁用)
    pub fn with_snapshots(mut self, writer: Box<dyn SnapshotWriter>) -> Self {
        self.snapshots = Some(writer);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn mode(&self) -> ModeState {
        self.mode
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// 循环停止的原因 (仍在运行时为 `None`)
    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop_reason.as_ref()
    }

    /// 执行一次迭代
    ///
    /// A capture failure stops the loop and is reported through the outcome; an
    /// engine failure stops the loop and is returned as an error.
    pub fn step(&mut self) -> Result<StepOutcome, ViewerError> {
        if self.state == LoopState::Stopped {
            return Ok(StepOutcome::stopped(self.frame_count));
        }

        let started = Instant::now();
        let frame = match self.camera.read() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("⚠️ Failed to grab frame ({}). Exiting...", e);
                self.stop(StopReason::CaptureFailed(e));
                return Ok(StepOutcome::stopped(self.frame_count));
            }
        };
        self.frame_count += 1;
        let fps = self.fps.tick(started);

        let config = self.mode.current_config(&self.settings.thresholds);
        let inferred = if config.tracking_enabled {
            self.engine.infer_with_tracking(&frame, &config)
        } else {
            self.engine.infer(&frame, &config)
        };
        let raw = match inferred {
            Ok(raw) => raw,
            Err(e) => {
                self.stop(StopReason::EngineFailed(e.clone()));
                return Err(e.into());
            }
        };
        let records = normalize(&raw, self.engine.labels(), config.tracking_enabled);
        debug!(
            "frame {}: {} raw, {} records",
            self.frame_count,
            raw.len(),
            records.len()
        );

        let sampled_log = (self.frame_count % self.settings.log_every == 0).then(|| {
            let line = detection_summary(self.frame_count, &records);
            info!("{}", line);
            line
        });

        let status = OverlayStatus {
            edition: self.settings.edition,
            person_only: self.mode.person_only(),
            tracking_enabled: self.mode.tracking_enabled(),
            model_name: self.settings.model_name.clone(),
            confidence: self.settings.thresholds.confidence,
            fps,
            class_count: self.engine.labels().len(),
        };
        let annotated = self.overlay.render(&frame, &records, &status);
        self.display.show(&self.settings.window_title, &annotated);

        let command = self
            .display
            .poll_key(self.settings.key_poll)
            .and_then(|key| command_for_key(key, self.settings.edition));

        let mut snapshot = None;
        match command {
            Some(Command::Quit) => {
                info!("🛑 User requested exit. Shutting down...");
                self.stop(StopReason::Quit);
            }
            Some(Command::Capture) => {
                let outcome = match self.snapshots.as_mut() {
                    Some(writer) => match writer.save(&annotated) {
                        Ok(path) => {
                            info!("📸 Screenshot saved: {}", path.display());
                            SnapshotOutcome::Saved(path)
                        }
                        Err(e) => {
                            warn!("⚠️ Screenshot failed: {}", e);
                            SnapshotOutcome::Failed(e.to_string())
                        }
                    },
                    None => {
                        info!("📸 Screenshot saving is disabled.");
                        SnapshotOutcome::Disabled
                    }
                };
                snapshot = Some(outcome);
            }
            Some(Command::TogglePersonOnly) => {
                let mode = if self.mode.toggle_person_only() {
                    "Person-Only"
                } else {
                    "All Objects"
                };
                info!("🔄 Toggled detection mode: {}", mode);
            }
            Some(Command::ShowAll) => {
                self.mode.show_all();
                info!("🔄 Detection mode: ALL OBJECTS");
            }
            Some(Command::ToggleTracking) => {
                let status = if self.mode.toggle_tracking() {
                    "ENABLED"
                } else {
                    "DISABLED"
                };
                info!("➡️ Object Tracking {}!", status);
            }
            None => {}
        }

        Ok(StepOutcome {
            state: self.state,
            frame_count: self.frame_count,
            records,
            sampled_log,
            command,
            fps,
            snapshot,
        })
    }

    /// 运行到停止为止; 无论如何退出都会释放资源
    ///
    /// Calling it again on a stopped loop reports the recorded reason without
    /// stepping.
    pub fn run(&mut self) -> Result<RunSummary, ViewerError> {
        let result = self.run_until_stopped();
        self.shutdown();
        result?;

        Ok(RunSummary {
            frames: self.frame_count,
            reason: self.stop_reason.clone().unwrap_or(StopReason::Quit),
        })
    }

    fn run_until_stopped(&mut self) -> Result<(), ViewerError> {
        while self.state == LoopState::Running {
            self.step()?;
        }
        Ok(())
    }

    fn stop(&mut self, reason: StopReason) {
        self.state = LoopState::Stopped;
        self.stop_reason = Some(reason);
    }

    /// 释放摄像头并关闭窗口 (只执行一次)
    pub fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.state = LoopState::Stopped;
        self.camera.release();
        self.display.close_all();
        info!("✅ Omni-Detector terminated. Goodbye!");
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;

    #[test]
    fn key_table_is_lower_case_only() {
        assert_eq!(command_for_key('q', Edition::V2), Some(Command::Quit));
        assert_eq!(command_for_key('c', Edition::V1), Some(Command::Capture));
        assert_eq!(command_for_key('t', Edition::V1), Some(Command::TogglePersonOnly));
        assert_eq!(command_for_key('a', Edition::V1), Some(Command::ShowAll));
        assert_eq!(command_for_key('x', Edition::V2), None);

        for key in ['Q', 'C', 'T', 'A', 'K'] {
            assert_eq!(command_for_key(key, Edition::V2), None, "{key}");
        }
    }

    #[test]
    fn tracking_key_is_v2_only() {
        assert_eq!(command_for_key('k', Edition::V2), Some(Command::ToggleTracking));
        assert_eq!(command_for_key('k', Edition::V1), None);
        assert_eq!(key_help(Edition::V1).len(), 4);
        assert_eq!(key_help(Edition::V2).len(), 5);
    }

    #[test]
    fn fps_is_undefined_until_time_passes() {
        let mut meter = FpsMeter::new();
        let t0 = Instant::now();
        assert_eq!(meter.tick(t0), None);
        assert_eq!(meter.tick(t0), None);

        let fps = meter.tick(t0 + Duration::from_millis(40)).unwrap();
        assert!((fps - 25.0).abs() < 1e-6);
    }

    #[test]
    fn summary_lists_records_or_says_nothing() {
        assert_eq!(detection_summary(10, &[]), "[🔍 Frame 10] Nothing detected.");

        let records = vec![
            DetectionRecord {
                class_id: 0,
                label: "person".into(),
                confidence: 0.91,
                bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
                track_id: Some(4),
            },
            DetectionRecord {
                class_id: 56,
                label: "chair".into(),
                confidence: 0.5,
                bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
                track_id: None,
            },
        ];
        assert_eq!(
            detection_summary(20, &records),
            "[🔍 Frame 20] Detected: ID:4 person (0.91), chair (0.50)"
        );
    }

    #[test]
    fn settings_follow_edition() {
        let mut config = ViewerConfig::default();
        config.edition = Edition::V1;
        let settings = LoopSettings::from_config(&config);
        assert_eq!(settings.thresholds, Thresholds::engine_defaults());
        assert_eq!(settings.key_poll, Duration::from_millis(1));
        assert_eq!(settings.log_every, 10);
    }
}
