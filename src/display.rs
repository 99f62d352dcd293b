// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 显示模块 (Display)
//!
//! `ConsoleDisplay` is a headless window: keys come from stdin through a reader
//! thread, and the latest annotated frame can be mirrored to a preview file.

use std::io::BufRead;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use image::RgbImage;
use log::{debug, info, warn};

/// 显示接口
pub trait Display {
    fn show(&mut self, title: &str, frame: &RgbImage);

    /// Waits at most `timeout` for one key press.
    fn poll_key(&mut self, timeout: Duration) -> Option<char>;

    fn close_all(&mut self);
}

/// 控制台显示 (无窗口)
pub struct ConsoleDisplay {
    keys: Receiver<char>,
    preview: Option<PathBuf>,
    shown: u64,
    closed: bool,
    input_closed: bool,
}

impl ConsoleDisplay {
    /// 从标准输入读取按键 (每行中的每个字符算一次按键, 回车后生效)
    pub fn stdin(preview: Option<PathBuf>) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(64);
        if let Err(e) = thread::Builder::new()
            .name("stdin-keys".into())
            .spawn(move || read_keys(tx))
        {
            warn!("⚠️ 无法启动按键线程: {}", e);
        }
        Self::with_keys(rx, preview)
    }

    /// 使用外部按键通道
    pub fn with_keys(keys: Receiver<char>, preview: Option<PathBuf>) -> Self {
        Self {
            keys,
            preview,
            shown: 0,
            closed: false,
            input_closed: false,
        }
    }

    pub fn frames_shown(&self) -> u64 {
        self.shown
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

fn read_keys(tx: Sender<char>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        for key in line.chars().filter(|c| !c.is_whitespace()) {
            if tx.send(key).is_err() {
                return;
            }
        }
    }
}

impl Display for ConsoleDisplay {
    fn show(&mut self, title: &str, frame: &RgbImage) {
        if self.closed {
            return;
        }
        self.shown += 1;
        if self.shown == 1 {
            info!("🖥️ {} ({}x{})", title, frame.width(), frame.height());
        }
        if let Some(path) = &self.preview {
            if let Err(e) = frame.save(path) {
                warn!("⚠️ 预览写入失败 {}: {}", path.display(), e);
            }
        }
    }

    fn poll_key(&mut self, timeout: Duration) -> Option<char> {
        if self.input_closed {
            // keep the loop cadence once the input side hangs up
            thread::sleep(timeout);
            return None;
        }
        match self.keys.recv_timeout(timeout) {
            Ok(key) => Some(key),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("key input closed");
                self.input_closed = true;
                None
            }
        }
    }

    fn close_all(&mut self) {
        if !self.closed {
            self.closed = true;
            info!("🖥️ 窗口已关闭 (共显示 {} 帧)", self.shown);
        }
    }
}
