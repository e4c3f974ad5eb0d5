/// Container extensions accepted by the sampling reader, leading dot included.
/// Matching is case-sensitive.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".avi", ".mov", ".flv", ".webm", ".wmv", ".mp4"];

/// Extra grab/retrieve attempts after a failed decode step.
pub const MAX_DECODE_RETRIES: usize = 2;

pub const MS_PER_SECOND: i64 = 1000;

/// Frames between progress lines in the stdout pipeline logger.
pub const DEFAULT_PROGRESS_THROTTLE: usize = 30;
