// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 截图保存 (Snapshot writer)
//!
//! File names carry the wall-clock second only, so two captures within the same
//! second overwrite each other.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::error::SaveError;

pub trait SnapshotWriter {
    fn save(&mut self, frame: &RgbImage) -> Result<PathBuf, SaveError>;
}

/// 写入 `<dir>/capture_<unix_secs>.jpg`
pub struct DiskSnapshotWriter {
    dir: PathBuf,
}

impl DiskSnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, unix_secs: i64) -> PathBuf {
        self.dir.join(format!("capture_{}.jpg", unix_secs))
    }

    /// 以指定时间戳保存
    pub fn save_at(&self, frame: &RgbImage, unix_secs: i64) -> Result<PathBuf, SaveError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).map_err(|source| SaveError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;
        }

        let path = self.path_for(unix_secs);
        frame.save(&path).map_err(|source| SaveError::Encode {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

impl SnapshotWriter for DiskSnapshotWriter {
    fn save(&mut self, frame: &RgbImage) -> Result<PathBuf, SaveError> {
        self.save_at(frame, chrono::Utc::now().timestamp())
    }
}
