// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 检测结果规范化 (Detection record normalizer)
//!
//! Engine order is kept as-is. A record that cannot be resolved is dropped on its
//! own; the rest of the frame still goes through.

use log::warn;

use super::types::{DetectionRecord, LabelTable, RawDetection};
use crate::error::NormalizeError;

/// Resolve one raw detection. The track id is attached only when tracking is on
/// and the engine actually supplied one.
pub fn normalize_one(
    raw: &RawDetection,
    labels: &LabelTable,
    tracking_enabled: bool,
) -> Result<DetectionRecord, NormalizeError> {
    let confidence = raw.confidence();
    // NaN fails the range check too
    if !(0.0..=1.0).contains(&confidence) {
        return Err(NormalizeError::ConfidenceOutOfRange(confidence));
    }

    let class_id = raw.class_id();
    let label = labels
        .get(class_id)
        .ok_or(NormalizeError::UnknownClass(class_id))?;

    Ok(DetectionRecord {
        class_id,
        label: label.to_string(),
        confidence,
        bbox: raw.bbox(),
        track_id: if tracking_enabled {
            raw.track_id()
        } else {
            None
        },
    })
}

pub fn normalize(
    raw_results: &[RawDetection],
    labels: &LabelTable,
    tracking_enabled: bool,
) -> Vec<DetectionRecord> {
    raw_results
        .iter()
        .filter_map(|raw| match normalize_one(raw, labels, tracking_enabled) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("⚠️ 跳过检测记录: {}", e);
                None
            }
        })
        .collect()
}
