use crate::shared::pixel_buffer::PixelBuffer;

/// A sampled frame: decoded pixels plus the presentation timestamp the
/// decoder reported right after decoding them.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    image: PixelBuffer,
    timestamp_ms: i64,
}

impl Frame {
    pub fn new(image: PixelBuffer, timestamp_ms: i64) -> Self {
        Self {
            image,
            timestamp_ms,
        }
    }

    pub fn image(&self) -> &PixelBuffer {
        &self.image
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
