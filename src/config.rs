// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 查看器配置 - 通过JSON文件与命令行调整参数
//!
//! Precedence: built-in defaults, then the JSON file, then command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use serde::{Deserialize, Serialize};

use crate::mode::{PrecisionMode, Thresholds};

/// 版本 (两种查看器变体)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    /// 经典版: 引擎默认阈值, 无追踪
    V1,
    /// 优化版: 可配置阈值, 半精度, 追踪, FPS
    V2,
}

impl Edition {
    pub fn supports_tracking(&self) -> bool {
        matches!(self, Edition::V2)
    }

    pub fn version(&self) -> &'static str {
        match self {
            Edition::V1 => "v1.1",
            Edition::V2 => "v1.2",
        }
    }
}

/// 命令行参数
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Omni-Detector 实时目标检测查看器", long_about = None)]
pub struct Args {
    /// JSON 配置文件 (不存在时写入默认配置)
    #[arg(short, long, default_value = "omni-detector.json")]
    pub config: PathBuf,

    /// 检测模型 (ONNX)
    #[arg(short, long)]
    pub model: Option<String>,

    /// 帧来源目录 (按文件名顺序回放)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// 查看器版本
    #[arg(short, long, value_enum)]
    pub edition: Option<Edition>,

    /// 禁用截图保存
    #[arg(long)]
    pub no_screenshots: bool,

    /// 截图目录
    #[arg(long)]
    pub screenshot_dir: Option<PathBuf>,

    /// 叠加文字字体 (TTF/OTF)
    #[arg(long)]
    pub font: Option<PathBuf>,
}

/// 查看器参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub edition: Edition,

    // === 模型 ===
    pub model: String,
    /// 可选类别表 (每行一个名称); 缺省为 COCO 80 类
    pub labels: Option<PathBuf>,

    // === 摄像头 ===
    pub source: PathBuf,
    pub requested_width: u32,
    pub requested_height: u32,

    // === 检测参数 (仅 v2 生效) ===
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub tracking_confidence_threshold: f32,
    pub half_precision: bool,

    // === 截图 ===
    pub save_screenshots: bool,
    pub screenshot_dir: PathBuf,

    // === 显示 ===
    pub window_title: Option<String>,
    pub font_path: Option<PathBuf>,
    /// 最新叠加帧写入此文件 (可选)
    pub preview_path: Option<PathBuf>,
    pub key_poll_ms: u64,

    /// 每 N 帧打印一次检测结果
    pub log_every: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            edition: Edition::V2,
            model: "models/yolov8n.onnx".to_string(),
            labels: None,
            source: PathBuf::from("frames"),
            requested_width: 1280,
            requested_height: 720,
            confidence_threshold: 0.45,
            iou_threshold: 0.7,
            tracking_confidence_threshold: 0.3,
            half_precision: true,
            save_screenshots: true,
            screenshot_dir: PathBuf::from("screenshots"),
            window_title: None,
            font_path: None,
            preview_path: None,
            key_poll_ms: 1,
            log_every: 10,
        }
    }
}

impl ViewerConfig {
    /// 从JSON文件加载配置; 文件不存在时写入默认配置
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(json) => {
                let config: Self = serde_json::from_str(&json)
                    .with_context(|| format!("配置文件解析失败: {}", path.display()))?;
                info!("✅ 配置已从 {} 加载", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                config.save(path)?;
                Ok(config)
            }
            Err(e) => {
                Err(e).with_context(|| format!("无法读取配置文件: {}", path.display()))
            }
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("序列化配置失败")?;
        fs::write(path, json).with_context(|| format!("保存配置失败: {}", path.display()))?;
        info!("💾 配置已保存到 {}", path.display());
        Ok(())
    }

    /// 命令行参数覆盖文件配置
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(model) = &args.model {
            self.model = model.clone();
        }
        if let Some(source) = &args.source {
            self.source = source.clone();
        }
        if let Some(edition) = args.edition {
            self.edition = edition;
        }
        if args.no_screenshots {
            self.save_screenshots = false;
        }
        if let Some(dir) = &args.screenshot_dir {
            self.screenshot_dir = dir.clone();
        }
        if let Some(font) = &args.font {
            self.font_path = Some(font.clone());
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("iou_threshold", self.iou_threshold),
            ("tracking_confidence_threshold", self.tracking_confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{name} must be within [0, 1], got {value}");
            }
        }
        if self.log_every == 0 {
            bail!("log_every must be at least 1");
        }
        Ok(())
    }

    /// 本版本使用的阈值 (v1 总是使用引擎默认值)
    pub fn thresholds(&self) -> Thresholds {
        match self.edition {
            Edition::V1 => Thresholds::engine_defaults(),
            Edition::V2 => Thresholds {
                confidence: self.confidence_threshold,
                iou: self.iou_threshold,
                tracking_confidence: self.tracking_confidence_threshold,
                precision: if self.half_precision {
                    PrecisionMode::Reduced
                } else {
                    PrecisionMode::Full
                },
            },
        }
    }

    pub fn window_title(&self) -> String {
        self.window_title.clone().unwrap_or_else(|| {
            format!(
                "Omni-Detector {} - Press 'q' to Quit",
                self.edition.version()
            )
        })
    }

    /// 模型文件名 (不含目录), 用于叠加文字
    pub fn model_name(&self) -> String {
        Path::new(&self.model)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.model)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");

        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert!(path.exists());

        let reloaded = ViewerConfig::load(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        fs::write(&path, r#"{ "edition": "v1", "log_every": 5 }"#).unwrap();

        let config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.edition, Edition::V1);
        assert_eq!(config.log_every, 5);
        assert_eq!(config.requested_width, 1280);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(ViewerConfig::load(&path).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_thresholds() {
        let mut config = ViewerConfig::default();
        assert!(config.validate().is_ok());
        config.iou_threshold = 1.2;
        assert!(config.validate().is_err());

        let mut config = ViewerConfig::default();
        config.log_every = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn v1_uses_engine_defaults() {
        let mut config = ViewerConfig::default();
        config.confidence_threshold = 0.9;
        config.edition = Edition::V1;
        assert_eq!(config.thresholds(), Thresholds::engine_defaults());

        config.edition = Edition::V2;
        assert_eq!(config.thresholds().confidence, 0.9);
        assert_eq!(config.thresholds().precision, PrecisionMode::Reduced);
    }

    #[test]
    fn args_override_file_values() {
        let mut config = ViewerConfig::default();
        let args = Args::parse_from([
            "omni-detector",
            "--edition",
            "v1",
            "--no-screenshots",
            "--model",
            "models/yolov8s.onnx",
        ]);
        config.apply_args(&args);
        assert_eq!(config.edition, Edition::V1);
        assert!(!config.save_screenshots);
        assert_eq!(config.model_name(), "yolov8s.onnx");
        assert_eq!(config.window_title(), "Omni-Detector v1.1 - Press 'q' to Quit");
    }
}
