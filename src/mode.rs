// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 模式状态 (Mode state)
//!
//! Operator toggles plus the per-frame derivation of the inference configuration.
//! Only keyboard commands mutate `ModeState`; the configuration is rebuilt every
//! frame and never edited in place.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// COCO 类别: 0 = person
pub const PERSON_CLASS_ID: u32 = 0;

/// 推理精度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrecisionMode {
    Full,
    Reduced,
}

/// 类别过滤
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassFilter {
    All,
    Only(BTreeSet<u32>),
}

impl ClassFilter {
    pub fn person_only() -> Self {
        ClassFilter::Only(BTreeSet::from([PERSON_CLASS_ID]))
    }

    pub fn allows(&self, class_id: u32) -> bool {
        match self {
            ClassFilter::All => true,
            ClassFilter::Only(ids) => ids.contains(&class_id),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, ClassFilter::All)
    }
}

/// 阈值设置 (base thresholds the mode is applied on top of)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub confidence: f32,
    pub iou: f32,
    /// 追踪模式下使用的较低置信度
    pub tracking_confidence: f32,
    pub precision: PrecisionMode,
}

impl Thresholds {
    pub const ENGINE_DEFAULT_CONFIDENCE: f32 = 0.25;
    pub const ENGINE_DEFAULT_IOU: f32 = 0.7;

    /// What the engine uses when the caller configures nothing.
    pub fn engine_defaults() -> Self {
        Self {
            confidence: Self::ENGINE_DEFAULT_CONFIDENCE,
            iou: Self::ENGINE_DEFAULT_IOU,
            tracking_confidence: Self::ENGINE_DEFAULT_CONFIDENCE,
            precision: PrecisionMode::Full,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confidence: 0.45,
            iou: 0.7,
            tracking_confidence: 0.3,
            precision: PrecisionMode::Reduced,
        }
    }
}

/// 单帧推理配置
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceConfig {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub class_filter: ClassFilter,
    pub tracking_enabled: bool,
    pub precision_mode: PrecisionMode,
}

/// 操作员切换的模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeState {
    person_only: bool,
    tracking_enabled: bool,
}

impl ModeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn person_only(&self) -> bool {
        self.person_only
    }

    pub fn tracking_enabled(&self) -> bool {
        self.tracking_enabled
    }

    pub fn toggle_person_only(&mut self) -> bool {
        self.person_only = !self.person_only;
        self.person_only
    }

    pub fn show_all(&mut self) {
        self.person_only = false;
    }

    pub fn toggle_tracking(&mut self) -> bool {
        self.tracking_enabled = !self.tracking_enabled;
        self.tracking_enabled
    }

    pub fn current_config(&self, base: &Thresholds) -> InferenceConfig {
        InferenceConfig {
            confidence_threshold: if self.tracking_enabled {
                base.tracking_confidence
            } else {
                base.confidence
            },
            iou_threshold: base.iou,
            class_filter: if self.person_only {
                ClassFilter::person_only()
            } else {
                ClassFilter::All
            },
            tracking_enabled: self.tracking_enabled,
            precision_mode: base.precision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_all_always_clears_person_only() {
        let histories: [&[bool]; 4] = [&[], &[true], &[true, true], &[true, true, true]];
        for toggles in histories {
            let mut mode = ModeState::new();
            for _ in toggles {
                mode.toggle_person_only();
            }
            mode.show_all();
            assert!(!mode.person_only());
            mode.show_all();
            assert!(!mode.person_only());
        }
    }

    #[test]
    fn toggle_person_only_twice_is_identity() {
        let mut mode = ModeState::new();
        let before = mode;
        assert!(mode.toggle_person_only());
        assert!(!mode.toggle_person_only());
        assert_eq!(mode, before);
    }

    #[test]
    fn person_only_filter_contains_exactly_person() {
        let mut mode = ModeState::new();
        let base = Thresholds::default();
        assert!(mode.current_config(&base).class_filter.is_unrestricted());

        mode.toggle_person_only();
        match mode.current_config(&base).class_filter {
            ClassFilter::Only(ids) => assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![0]),
            ClassFilter::All => panic!("expected person filter"),
        }
    }

    #[test]
    fn tracking_switches_confidence_threshold() {
        let mut mode = ModeState::new();
        let base = Thresholds::default();

        let cfg = mode.current_config(&base);
        assert!(!cfg.tracking_enabled);
        assert_eq!(cfg.confidence_threshold, 0.45);
        assert_eq!(cfg.iou_threshold, 0.7);
        assert_eq!(cfg.precision_mode, PrecisionMode::Reduced);

        mode.toggle_tracking();
        let cfg = mode.current_config(&base);
        assert!(cfg.tracking_enabled);
        assert_eq!(cfg.confidence_threshold, 0.3);
    }

    #[test]
    fn engine_defaults_ignore_mode_thresholds() {
        let mode = ModeState::new();
        let cfg = mode.current_config(&Thresholds::engine_defaults());
        assert_eq!(cfg.confidence_threshold, 0.25);
        assert_eq!(cfg.precision_mode, PrecisionMode::Full);
    }
}
