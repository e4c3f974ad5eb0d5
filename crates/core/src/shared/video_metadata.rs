use std::path::PathBuf;

use crate::shared::constants::MS_PER_SECOND;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Frame count reported by the container; 0 when unknown.
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Estimated stream duration, or `None` when frame rate or frame count
    /// is unknown.
    pub fn duration_ms(&self) -> Option<i64> {
        if self.fps <= 0.0 || self.total_frames == 0 {
            return None;
        }
        Some((self.total_frames as f64 / self.fps * MS_PER_SECOND as f64).round() as i64)
    }

    /// Upper bound on frames a sampling pass can return at `rate` fps.
    /// A rate of 0 (or one above the source rate) keeps every frame.
    pub fn expected_sampled_frames(&self, rate: i64) -> Option<usize> {
        let duration_ms = self.duration_ms()?;
        if rate <= 0 || rate as f64 >= self.fps {
            return Some(self.total_frames);
        }
        let interval_ms = MS_PER_SECOND / rate;
        Some((duration_ms / interval_ms.max(1)) as usize + 1)
    }
}
