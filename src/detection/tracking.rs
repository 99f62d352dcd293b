// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 追踪引擎包装 (Tracking wrapper)
//!
//! Gives any detector a persistent tracker. `infer` passes straight through;
//! `infer_with_tracking` feeds the detections into a `ByteTracker` that lives as long
//! as the wrapper, so track ids stay stable across frames.

use log::{debug, info};

use super::bytetrack::{ByteTrackConfig, ByteTracker};
use super::engine::DetectionEngine;
use super::types::{LabelTable, RawDetection};
use crate::error::EngineError;
use crate::frame::Frame;
use crate::mode::InferenceConfig;

pub struct Tracking<E> {
    inner: E,
    tracker: ByteTracker,
    calls: u64,
}

impl<E: DetectionEngine> Tracking<E> {
    pub fn new(inner: E) -> Self {
        Self::with_config(inner, ByteTrackConfig::default())
    }

    pub fn with_config(inner: E, config: ByteTrackConfig) -> Self {
        info!("🎯 跟踪器: ByteTrack (高低分分开处理)");
        Self {
            inner,
            tracker: ByteTracker::new(config),
            calls: 0,
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn tracker(&self) -> &ByteTracker {
        &self.tracker
    }
}

impl<E: DetectionEngine> DetectionEngine for Tracking<E> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn labels(&self) -> &LabelTable {
        self.inner.labels()
    }

    fn infer(
        &mut self,
        frame: &Frame,
        config: &InferenceConfig,
    ) -> Result<Vec<RawDetection>, EngineError> {
        self.inner.infer(frame, config)
    }

    fn infer_with_tracking(
        &mut self,
        frame: &Frame,
        config: &InferenceConfig,
    ) -> Result<Vec<RawDetection>, EngineError> {
        let detections = self.inner.infer(frame, config)?;
        let tracked = self.tracker.update(&detections);

        self.calls += 1;
        if self.calls % 60 == 0 {
            debug!("{}", self.tracker.stats());
        }
        Ok(tracked)
    }
}
