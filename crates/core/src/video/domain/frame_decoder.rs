use std::path::Path;

use crate::shared::pixel_buffer::PixelBuffer;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::reader_error::DecoderError;

/// Two-phase frame decoding primitive wrapped by the sampling reader.
///
/// Implementations handle codec and container details. A position of 0 from
/// [`FrameDecoder::position_ms`] means "no reliable frame", never a real
/// frame timestamp.
pub trait FrameDecoder: Send {
    /// Opens a video file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, DecoderError>;

    /// Advances the read position by one frame. Returns `false` when no new
    /// frame could be decoded, whether from a transient error or end of
    /// stream.
    fn grab(&mut self) -> bool;

    /// Materializes the pixels of the frame at the current position.
    fn retrieve(&mut self) -> Option<PixelBuffer>;

    /// Presentation time of the current position in milliseconds.
    fn position_ms(&self) -> i64;

    /// Releases any resources held by the decoder.
    fn close(&mut self);
}
