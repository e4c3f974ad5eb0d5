use crate::shared::constants::MS_PER_SECOND;
use crate::video::domain::reader_error::ReaderError;

/// Minimum gap between two returned frames, derived from a target rate in
/// frames per second. A rate of 0 disables sub-sampling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplingInterval {
    rate: i64,
}

impl SamplingInterval {
    pub fn from_rate(rate: i64) -> Result<Self, ReaderError> {
        if rate < 0 {
            return Err(ReaderError::InvalidConfiguration(format!(
                "sampling rate must be >= 0, got {rate}"
            )));
        }
        Ok(Self { rate })
    }

    pub fn is_enabled(&self) -> bool {
        self.rate > 0
    }

    /// Interval in whole milliseconds (integer division), 0 when disabled.
    pub fn interval_ms(&self) -> i64 {
        if self.is_enabled() {
            MS_PER_SECOND / self.rate
        } else {
            0
        }
    }

    /// Last-returned timestamp to start a session with: one interval before
    /// zero, so the first decoded frame always passes [`Self::admits`].
    pub fn initial_timestamp(&self) -> i64 {
        if self.is_enabled() {
            -self.interval_ms()
        } else {
            -1
        }
    }

    /// Whether a frame stamped `candidate_ms` may be returned after one
    /// stamped `last_returned_ms`.
    ///
    /// Non-positive timestamps are unreliable and bypass the gate.
    pub fn admits(&self, candidate_ms: i64, last_returned_ms: i64) -> bool {
        !self.is_enabled()
            || candidate_ms <= 0
            || candidate_ms - last_returned_ms >= self.interval_ms()
    }
}
