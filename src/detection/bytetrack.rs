// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! ByteTrack 算法实现
//! ByteTrack: Simple and effective multi-object tracking
//!
//! 核心思想:
//! 1. 高低分检测框分开处理
//! 2. 高分框优先匹配 (IOU)
//! 3. 低分框救援丢失的轨迹
//! 4. 纯运动模型,无需外观特征
//!
//! Tracks only match detections of the same class.

use super::types::{BoundingBox, RawDetection};

/// ByteTrack 参数
#[derive(Clone, Debug, PartialEq)]
pub struct ByteTrackConfig {
    /// 最大允许丢失帧数
    pub max_lost_frames: u32,
    /// 高分检测阈值 (第一轮匹配)
    pub high_score_threshold: f32,
    /// 低分检测阈值 (用于救援)
    pub low_score_threshold: f32,
    /// 未匹配检测新建轨迹的最低置信度
    pub new_track_threshold: f32,
    pub high_iou_threshold: f32,
    pub low_iou_threshold: f32,
    /// 运动模型观测噪声
    pub obs_noise: f32,
    pub process_noise: f32,
}

impl Default for ByteTrackConfig {
    fn default() -> Self {
        Self {
            max_lost_frames: 60,
            high_score_threshold: 0.4,
            low_score_threshold: 0.1,
            new_track_threshold: 0.25,
            high_iou_threshold: 0.4,
            low_iou_threshold: 0.3,
            obs_noise: 0.5,
            process_noise: 0.1,
        }
    }
}

// ========== 运动模型 ==========

/// 单轴匀速卡尔曼: 状态 (位置, 速度), 2x2 协方差
#[derive(Clone, Copy, Debug)]
struct AxisFilter {
    pos: f32,
    vel: f32,
    cov: [[f32; 2]; 2],
}

impl AxisFilter {
    fn new(pos: f32) -> Self {
        // velocity starts unknown
        Self {
            pos,
            vel: 0.0,
            cov: [[10.0, 0.0], [0.0, 100.0]],
        }
    }

    fn predict(&mut self, q: f32) {
        let [[a, b], [c, d]] = self.cov;
        self.pos += self.vel;
        self.cov = [[a + b + c + d + q, b + d], [c + d, d + q]];
    }

    fn correct(&mut self, z: f32, r: f32) {
        let [[a, b], [c, d]] = self.cov;
        let s = a + r;
        let (k_pos, k_vel) = (a / s, c / s);
        let innovation = z - self.pos;

        self.pos += k_pos * innovation;
        self.vel += k_vel * innovation;
        self.cov = [
            [(1.0 - k_pos) * a, (1.0 - k_pos) * b],
            [c - k_vel * a, d - k_vel * b],
        ];
    }
}

/// 边界框运动滤波: 中心点与宽高各一个轴
#[derive(Clone, Debug)]
pub struct BoxFilter {
    axes: [AxisFilter; 4],
    process_noise: f32,
    obs_noise: f32,
}

impl BoxFilter {
    pub fn new(bbox: &BoundingBox, process_noise: f32, obs_noise: f32) -> Self {
        let (cx, cy) = bbox.center();
        Self {
            axes: [cx, cy, bbox.w, bbox.h].map(AxisFilter::new),
            process_noise,
            obs_noise,
        }
    }

    pub fn predict(&mut self) {
        for axis in &mut self.axes {
            axis.predict(self.process_noise);
        }
    }

    pub fn correct(&mut self, bbox: &BoundingBox) {
        let (cx, cy) = bbox.center();
        for (axis, z) in self.axes.iter_mut().zip([cx, cy, bbox.w, bbox.h]) {
            axis.correct(z, self.obs_noise);
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        let [cx, cy, w, h] = self.axes.map(|a| a.pos);
        let (w, h) = (w.max(1.0), h.max(1.0));
        BoundingBox::new(cx - w / 2.0, cy - h / 2.0, w, h)
    }

    /// Estimated per-frame motion of the box centre.
    pub fn velocity(&self) -> (f32, f32) {
        (self.axes[0].vel, self.axes[1].vel)
    }
}

/// 单个检测 (跟踪器输入)
#[derive(Clone, Debug)]
struct Candidate {
    class_id: u32,
    confidence: f32,
    bbox: BoundingBox,
}

/// ByteTrack 跟踪对象
#[derive(Clone, Debug)]
pub struct Track {
    pub id: u32,
    pub class_id: u32,
    /// 当前边界框 (卡尔曼滤波平滑后)
    pub bbox: BoundingBox,
    /// 最近一次匹配的检测置信度
    pub score: f32,
    pub frames_lost: u32,
    pub total_frames: u32,
    filter: BoxFilter,
}

impl Track {
    fn new(id: u32, det: &Candidate, config: &ByteTrackConfig) -> Self {
        let filter = BoxFilter::new(
            &det.bbox,
            config.process_noise,
            config.obs_noise,
        );
        Self {
            id,
            class_id: det.class_id,
            bbox: filter.bbox(),
            score: det.confidence,
            frames_lost: 0,
            total_frames: 1,
            filter,
        }
    }

    fn predict(&mut self) {
        self.filter.predict();
        self.bbox = self.filter.bbox();
    }

    fn update(&mut self, det: &Candidate) {
        self.filter.correct(&det.bbox);
        self.bbox = self.filter.bbox();
        self.frames_lost = 0;
        self.total_frames += 1;
        self.score = det.confidence;
    }

    fn mark_lost(&mut self) {
        self.frames_lost += 1;
    }
}

/// ByteTrack 追踪器
pub struct ByteTracker {
    tracks: Vec<Track>,
    next_id: u32,
    config: ByteTrackConfig,
}

impl ByteTracker {
    pub fn new(config: ByteTrackConfig) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            config,
        }
    }

    /// 更新跟踪 (ByteTrack 三步匹配)
    ///
    /// Returns the detections matched or created this frame as `Tracked`, in the
    /// order the detections came in.
    pub fn update(&mut self, detections: &[RawDetection]) -> Vec<RawDetection> {
        let candidates: Vec<Candidate> = detections
            .iter()
            .map(|d| Candidate {
                class_id: d.class_id(),
                confidence: d.confidence(),
                bbox: d.bbox(),
            })
            .collect();

        // 1. 所有轨迹先预测
        for track in &mut self.tracks {
            track.predict();
        }

        // 2. 分离高低分检测框
        let mut high_dets = Vec::new();
        let mut low_dets = Vec::new();
        for (idx, det) in candidates.iter().enumerate() {
            if det.confidence >= self.config.high_score_threshold {
                high_dets.push(idx);
            } else if det.confidence >= self.config.low_score_threshold {
                low_dets.push(idx);
            }
        }

        // det index -> track index
        let mut det_to_track: Vec<Option<usize>> = vec![None; candidates.len()];
        let mut matched_track = vec![false; self.tracks.len()];

        // 3. 第一轮匹配: 高分检测 + 所有轨迹
        let all_tracks: Vec<usize> = (0..self.tracks.len()).collect();
        for (det_idx, track_idx) in self.associate(
            &candidates,
            &high_dets,
            &all_tracks,
            self.config.high_iou_threshold,
        ) {
            det_to_track[det_idx] = Some(track_idx);
            matched_track[track_idx] = true;
        }

        // 4. 第二轮匹配: 低分检测 + 未匹配的轨迹 (救援)
        let unmatched_tracks: Vec<usize> = (0..self.tracks.len())
            .filter(|&idx| !matched_track[idx])
            .collect();
        for (det_idx, track_idx) in self.associate(
            &candidates,
            &low_dets,
            &unmatched_tracks,
            self.config.low_iou_threshold,
        ) {
            det_to_track[det_idx] = Some(track_idx);
            matched_track[track_idx] = true;
        }

        for (det_idx, slot) in det_to_track.iter().enumerate() {
            if let Some(track_idx) = slot {
                self.tracks[*track_idx].update(&candidates[det_idx]);
            }
        }

        // 5. 未匹配的轨迹 → 标记丢失
        for (track_idx, &matched) in matched_track.iter().enumerate() {
            if !matched {
                self.tracks[track_idx].mark_lost();
            }
        }

        // 6. 未匹配且足够可信的检测 → 新建轨迹
        for (det_idx, det) in candidates.iter().enumerate() {
            if det_to_track[det_idx].is_none() && det.confidence >= self.config.new_track_threshold {
                let track = Track::new(self.next_id, det, &self.config);
                self.next_id += 1;
                self.tracks.push(track);
                det_to_track[det_idx] = Some(self.tracks.len() - 1);
            }
        }

        let output = det_to_track
            .iter()
            .enumerate()
            .filter_map(|(det_idx, slot)| {
                slot.map(|track_idx| {
                    let track = &self.tracks[track_idx];
                    RawDetection::Tracked {
                        track_id: track.id,
                        class_id: track.class_id,
                        confidence: candidates[det_idx].confidence,
                        bbox: track.bbox,
                    }
                })
            })
            .collect();

        // 7. 删除丢失太久的轨迹
        let max_lost = self.config.max_lost_frames;
        self.tracks.retain(|t| t.frames_lost <= max_lost);

        output
    }

    /// IOU 贪心匹配
    fn associate(
        &self,
        candidates: &[Candidate],
        det_indices: &[usize],
        track_indices: &[usize],
        iou_threshold: f32,
    ) -> Vec<(usize, usize)> {
        if det_indices.is_empty() || track_indices.is_empty() {
            return Vec::new();
        }

        let mut pairs = Vec::new();
        for &det_idx in det_indices {
            let det = &candidates[det_idx];
            for &track_idx in track_indices {
                let track = &self.tracks[track_idx];
                if track.class_id != det.class_id {
                    continue;
                }
                let iou = det.bbox.iou(&track.bbox);
                if iou >= iou_threshold {
                    pairs.push((1.0 - iou, det_idx, track_idx));
                }
            }
        }

        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut used_det = vec![false; candidates.len()];
        let mut used_track = vec![false; self.tracks.len()];
        let mut assignments = Vec::new();
        for (_, det_idx, track_idx) in pairs {
            if !used_det[det_idx] && !used_track[track_idx] {
                used_det[det_idx] = true;
                used_track[track_idx] = true;
                assignments.push((det_idx, track_idx));
            }
        }
        assignments
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
        self.next_id = 1;
    }

    /// 跟踪统计信息
    pub fn stats(&self) -> String {
        format!(
            "跟踪: {} 个目标 | 总ID: {}",
            self.tracks.len(),
            self.next_id - 1
        )
    }
}

impl Default for ByteTracker {
    fn default() -> Self {
        Self::new(ByteTrackConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class_id: u32, confidence: f32, x: f32) -> RawDetection {
        RawDetection::Detection {
            class_id,
            confidence,
            bbox: BoundingBox::new(x, 100.0, 40.0, 80.0),
        }
    }

    #[test]
    fn filter_holds_a_static_box() {
        let bbox = BoundingBox::new(100.0, 100.0, 50.0, 80.0);
        let mut filter = BoxFilter::new(&bbox, 0.1, 0.5);
        for _ in 0..20 {
            filter.predict();
            filter.correct(&bbox);
        }
        let out = filter.bbox();
        assert!((out.x - 100.0).abs() < 0.5);
        assert!((out.w - 50.0).abs() < 0.5);
        assert!(filter.velocity().0.abs() < 0.1);
    }

    #[test]
    fn filter_learns_constant_motion() {
        let mut filter = BoxFilter::new(&BoundingBox::new(0.0, 0.0, 20.0, 20.0), 0.1, 0.5);
        for step in 1..=30 {
            filter.predict();
            filter.correct(&BoundingBox::new(step as f32 * 5.0, 0.0, 20.0, 20.0));
        }
        let (vx, vy) = filter.velocity();
        assert!((vx - 5.0).abs() < 0.5);
        assert!(vy.abs() < 0.5);

        filter.predict();
        assert!((filter.bbox().x - 155.0).abs() < 2.0);
    }

    #[test]
    fn mid_confidence_detection_starts_a_track() {
        let mut tracker = ByteTracker::default();
        let first = tracker.update(&[det(0, 0.3, 100.0)]);
        assert_eq!(first.len(), 1);
        let second = tracker.update(&[det(0, 0.3, 102.0)]);
        assert_eq!(first[0].track_id(), second[0].track_id());
    }

    #[test]
    fn identity_persists_across_frames() {
        let mut tracker = ByteTracker::default();
        let first = tracker.update(&[det(0, 0.9, 100.0), det(2, 0.8, 400.0)]);
        let second = tracker.update(&[det(0, 0.9, 103.0), det(2, 0.8, 402.0)]);

        assert_eq!(first.len(), 2);
        assert_eq!(first[0].track_id(), second[0].track_id());
        assert_eq!(first[1].track_id(), second[1].track_id());
        assert_ne!(first[0].track_id(), first[1].track_id());
    }

    #[test]
    fn low_score_detection_rescues_existing_track_only() {
        let mut tracker = ByteTracker::default();
        let first = tracker.update(&[det(0, 0.9, 100.0)]);
        let rescued = tracker.update(&[det(0, 0.2, 101.0)]);
        assert_eq!(rescued.len(), 1);
        assert_eq!(rescued[0].track_id(), first[0].track_id());

        // 低分且无轨迹可救援 → 不新建
        let orphan = tracker.update(&[det(5, 0.2, 600.0)]);
        assert!(orphan.is_empty());
    }

    #[test]
    fn classes_never_share_a_track() {
        let mut tracker = ByteTracker::default();
        let first = tracker.update(&[det(0, 0.9, 100.0)]);
        let second = tracker.update(&[det(16, 0.9, 100.0)]);
        assert_ne!(first[0].track_id(), second[0].track_id());
    }

    #[test]
    fn lost_tracks_expire() {
        let config = ByteTrackConfig {
            max_lost_frames: 2,
            ..Default::default()
        };
        let mut tracker = ByteTracker::new(config);
        tracker.update(&[det(0, 0.9, 100.0)]);
        for _ in 0..3 {
            tracker.update(&[]);
        }
        assert!(tracker.tracks().is_empty());
    }
}
