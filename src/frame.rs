// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use image::RgbImage;

/// 摄像头帧 (Camera frame)
///
/// Owned by exactly one loop iteration. The overlay draws onto a copy, never onto
/// the frame itself.
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Solid-colour frame, handy for synthetic sources.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, image::Rgb(rgb)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Copy used as the canvas for the annotated frame.
    pub fn annotated_copy(&self) -> RgbImage {
        self.image.clone()
    }
}
