// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Omni-Detector 实时目标检测查看器
//!
//! 启动流程:
//! 1. 加载配置 (JSON + 命令行)
//! 2. 加载检测模型 (失败即退出)
//! 3. 打开帧来源 (失败即退出)
//! 4. 帧循环 (单线程, 按键控制)

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use omni_detector::controller::key_help;
use omni_detector::{
    Args, Camera, ConsoleDisplay, DetectionEngine, DiskSnapshotWriter, FrameDirCamera, FrameLoop,
    ImageOverlay, LabelTable, LoopSettings, StopReason, ViewerConfig,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("[❌] Omni-Detector stopped: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = ViewerConfig::load(&args.config)?;
    config.apply_args(&args);
    config.validate().context("配置无效")?;

    let labels = match &config.labels {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("无法读取类别文件: {}", path.display()))?;
            LabelTable::from_lines(&text)
        }
        None => LabelTable::coco(),
    };

    info!("🧠 Loading model '{}'...", config.model);
    let engine = load_engine(Path::new(&config.model), labels)?;
    info!("✅ Model loaded successfully! ({} classes)", engine.labels().len());

    let mut camera = FrameDirCamera::open(&config.source)
        .context("Could not access camera source")?;
    camera.set_resolution(config.requested_width, config.requested_height);

    let overlay = match &config.font_path {
        Some(path) => ImageOverlay::with_font_file(path)?,
        None => {
            info!("ℹ️ 未配置字体, 叠加层只绘制检测框");
            ImageOverlay::without_text()
        }
    };
    let display = ConsoleDisplay::stdin(config.preview_path.clone());

    info!(
        "🎥 Omni-Detector {} Started! (type a key and press Enter)",
        config.edition.version()
    );
    for line in key_help(config.edition) {
        info!("{}", line);
    }

    let mut frame_loop = FrameLoop::new(
        Box::new(camera),
        engine,
        Box::new(overlay),
        Box::new(display),
        LoopSettings::from_config(&config),
    );
    if config.save_screenshots {
        frame_loop =
            frame_loop.with_snapshots(Box::new(DiskSnapshotWriter::new(&config.screenshot_dir)));
    }

    let summary = frame_loop.run()?;
    match summary.reason {
        StopReason::Quit => info!("共处理 {} 帧", summary.frames),
        StopReason::CaptureFailed(e) => info!("共处理 {} 帧 (帧来源结束: {})", summary.frames, e),
        StopReason::EngineFailed(e) => return Err(e.into()),
    }
    Ok(())
}

#[cfg(feature = "onnx")]
fn load_engine(model: &Path, labels: LabelTable) -> Result<Box<dyn DetectionEngine>> {
    use omni_detector::detection::YoloV8Onnx;

    Ok(Box::new(YoloV8Onnx::load_tracked(model, labels)?))
}

#[cfg(not(feature = "onnx"))]
fn load_engine(model: &Path, _labels: LabelTable) -> Result<Box<dyn DetectionEngine>> {
    Err(omni_detector::EngineError::Unavailable {
        model: model.display().to_string(),
        reason: "built without the `onnx` feature".into(),
    }
    .into())
}
