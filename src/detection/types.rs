// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 检测系统数据结构定义
//! Data structures for the detection system

// ========== 公共常量 ==========

/// COCO 80 类别名 (YOLOv8 默认类别表)
pub const COCO_NAMES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

// ========== 数据结构 ==========

/// 检测框 (x, y = 左上角; 像素坐标)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            w: x2 - x1,
            h: y2 - y1,
        }
    }

    pub fn x2(&self) -> f32 {
        self.x + self.w
    }

    pub fn y2(&self) -> f32 {
        self.y + self.h
    }

    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let l = self.x.max(other.x);
        let t = self.y.max(other.y);
        let r = self.x2().min(other.x2());
        let b = self.y2().min(other.y2());
        if r <= l || b <= t {
            return 0.0;
        }
        let inter = (r - l) * (b - t);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }
}

/// 引擎原始输出 (追踪模式下带 track id)
#[derive(Debug, Clone, PartialEq)]
pub enum RawDetection {
    Detection {
        class_id: u32,
        confidence: f32,
        bbox: BoundingBox,
    },
    Tracked {
        track_id: u32,
        class_id: u32,
        confidence: f32,
        bbox: BoundingBox,
    },
}

impl RawDetection {
    pub fn class_id(&self) -> u32 {
        match self {
            RawDetection::Detection { class_id, .. } | RawDetection::Tracked { class_id, .. } => {
                *class_id
            }
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            RawDetection::Detection { confidence, .. }
            | RawDetection::Tracked { confidence, .. } => *confidence,
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        match self {
            RawDetection::Detection { bbox, .. } | RawDetection::Tracked { bbox, .. } => *bbox,
        }
    }

    pub fn track_id(&self) -> Option<u32> {
        match self {
            RawDetection::Detection { .. } => None,
            RawDetection::Tracked { track_id, .. } => Some(*track_id),
        }
    }
}

/// 规范化后的检测记录 (每帧重新生成)
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRecord {
    pub class_id: u32,
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub track_id: Option<u32>,
}

impl DetectionRecord {
    /// `ID:3 person (0.87)` or `person (0.87)`
    pub fn describe(&self) -> String {
        match self.track_id {
            Some(id) => format!("ID:{} {} ({:.2})", id, self.label, self.confidence),
            None => format!("{} ({:.2})", self.label, self.confidence),
        }
    }
}

/// 类别表 (模型加载时固定)
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTable {
    names: Vec<String>,
}

impl LabelTable {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn coco() -> Self {
        Self::new(COCO_NAMES.iter().map(|s| s.to_string()).collect())
    }

    /// One label per line; blank lines are ignored.
    pub fn from_lines(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn get(&self, class_id: u32) -> Option<&str> {
        self.names.get(class_id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::coco()
    }
}
