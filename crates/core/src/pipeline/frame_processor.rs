use crate::shared::frame::Frame;

pub type ProcessorError = Box<dyn std::error::Error + Send + Sync>;

/// Consumer of sampled frames, e.g. a face analysis engine.
///
/// The use case hands every sampled frame to `process` in timestamp order
/// and calls `reset` between passes over the same input.
pub trait FrameProcessor: Send {
    fn process(&mut self, frame: &Frame) -> Result<(), ProcessorError>;

    /// Clears per-pass state. Default: no-op.
    fn reset(&mut self) {}
}
