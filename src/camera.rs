// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 摄像头输入模块
//!
//! `Camera` 是帧来源接口; `FrameDirCamera` 按文件名顺序回放目录中的图像。

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::CaptureError;
use crate::frame::Frame;

/// 支持的图像扩展名
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// 帧来源
///
/// The requested resolution is a hint; callers must read the size off each frame.
pub trait Camera {
    fn set_resolution(&mut self, width: u32, height: u32);

    /// Next frame. Any error ends the session.
    fn read(&mut self) -> Result<Frame, CaptureError>;

    fn release(&mut self);
}

/// 目录回放摄像头
pub struct FrameDirCamera {
    frames: Vec<PathBuf>,
    cursor: usize,
    requested: Option<(u32, u32)>,
    released: bool,
}

impl FrameDirCamera {
    /// 打开帧目录 (目录不存在或不含图像时失败)
    pub fn open(dir: &Path) -> Result<Self, CaptureError> {
        let open_error = |reason: String| CaptureError::Open {
            source_name: dir.display().to_string(),
            reason,
        };

        let entries = fs::read_dir(dir).map_err(|e| open_error(e.to_string()))?;
        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image(path))
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(open_error("no image files found".into()));
        }

        info!("📷 帧来源: {} ({} 帧)", dir.display(), frames.len());
        Ok(Self {
            frames,
            cursor: 0,
            requested: None,
            released: false,
        })
    }

    pub fn requested_resolution(&self) -> Option<(u32, u32)> {
        self.requested
    }

    pub fn remaining(&self) -> usize {
        self.frames.len().saturating_sub(self.cursor)
    }
}

fn is_image(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
}

impl Camera for FrameDirCamera {
    fn set_resolution(&mut self, width: u32, height: u32) {
        // frames are delivered at their native size
        debug!("requested resolution {}x{}", width, height);
        self.requested = Some((width, height));
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        if self.released {
            return Err(CaptureError::Exhausted {
                frames: self.cursor as u64,
            });
        }
        let path = self
            .frames
            .get(self.cursor)
            .ok_or(CaptureError::Exhausted {
                frames: self.cursor as u64,
            })?
            .clone();

        let image = image::open(&path).map_err(|e| CaptureError::Read {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        self.cursor += 1;
        Ok(Frame::new(image.to_rgb8()))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            info!("📷 摄像头已释放");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_frames(dir: &Path, sizes: &[(u32, u32)]) {
        for (i, &(w, h)) in sizes.iter().enumerate() {
            RgbImage::from_pixel(w, h, Rgb([i as u8, 0, 0]))
                .save(dir.join(format!("frame_{i:03}.png")))
                .unwrap();
        }
    }

    #[test]
    fn replays_frames_in_name_order_then_exhausts() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), &[(8, 6), (8, 6), (8, 6)]);
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut camera = FrameDirCamera::open(dir.path()).unwrap();
        assert_eq!(camera.remaining(), 3);
        for i in 0..3u8 {
            let frame = camera.read().unwrap();
            assert_eq!(frame.image().get_pixel(0, 0)[0], i);
        }
        assert!(matches!(
            camera.read(),
            Err(CaptureError::Exhausted { frames: 3 })
        ));
    }

    #[test]
    fn requested_resolution_is_not_enforced() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), &[(16, 9)]);

        let mut camera = FrameDirCamera::open(dir.path()).unwrap();
        camera.set_resolution(1280, 720);
        assert_eq!(camera.requested_resolution(), Some((1280, 720)));

        let frame = camera.read().unwrap();
        assert_eq!((frame.width(), frame.height()), (16, 9));
    }

    #[test]
    fn empty_or_missing_directory_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FrameDirCamera::open(dir.path()),
            Err(CaptureError::Open { .. })
        ));
        assert!(matches!(
            FrameDirCamera::open(&dir.path().join("missing")),
            Err(CaptureError::Open { .. })
        ));
    }

    #[test]
    fn released_camera_yields_no_frames() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), &[(4, 4), (4, 4)]);

        let mut camera = FrameDirCamera::open(dir.path()).unwrap();
        camera.release();
        camera.release();
        assert!(camera.read().is_err());
    }
}
