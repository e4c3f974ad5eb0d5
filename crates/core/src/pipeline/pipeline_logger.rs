use std::io::{self, Write};
use std::time::Instant;

use crate::shared::constants::DEFAULT_PROGRESS_THROTTLE;

const REPORT_RULE: &str = "******************************************************************";

/// Cross-cutting logger for sampling run events.
///
/// Decouples the use case from specific output mechanisms (stdout, log
/// crate) so each caller can observe a run without changing the
/// orchestration code.
pub trait PipelineLogger: Send {
    /// Report a sampled frame. `current` counts frames within the pass;
    /// `expected` is an estimate, 0 when unknown.
    fn progress(&mut self, current: usize, expected: usize, timestamp_ms: i64);

    /// Report the end of one pass over an input.
    fn pass_complete(&mut self, pass: usize, frames: usize);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
///
/// Used by `--quiet` runs and by tests where logger output is irrelevant.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _expected: usize, _timestamp_ms: i64) {}
    fn pass_complete(&mut self, _pass: usize, _frames: usize) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI-oriented logger. Progress goes through the `log` crate with
/// throttling; every finished pass writes a frame-count report block to
/// the output stream as soon as the pass ends.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    start_time: Instant,
    passes: usize,
    total_frames: usize,
    last_pass_frames: usize,
    last_timestamp_ms: Option<i64>,
    out: Box<dyn Write + Send>,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self::with_writer(throttle_frames, Box::new(io::stdout()))
    }

    pub fn with_writer(throttle_frames: usize, out: Box<dyn Write + Send>) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            start_time: Instant::now(),
            passes: 0,
            total_frames: 0,
            last_pass_frames: 0,
            last_timestamp_ms: None,
            out,
        }
    }

    /// Returns the formatted summary string, or `None` if no pass finished.
    pub fn summary_string(&self) -> Option<String> {
        if self.passes == 0 {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Sampling summary ({} passes, {} frames, {elapsed_s:.1}s total):",
            self.passes, self.total_frames
        )];
        lines.push(format!("  Last pass: {} frames", self.last_pass_frames));

        if let Some(ts) = self.last_timestamp_ms {
            lines.push(format!("  Last timestamp: {ts} ms"));
        }

        if self.total_frames > 0 && elapsed_s > 0.0 {
            let fps = self.total_frames as f64 / elapsed_s;
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    fn write_pass_report(&mut self, pass: usize, frames: usize) -> io::Result<()> {
        writeln!(self.out, "{REPORT_RULE}")?;
        writeln!(self.out, "Pass: {pass}")?;
        writeln!(self.out, "Processed Frame count: {frames}")?;
        writeln!(self.out, "{REPORT_RULE}")?;
        self.out.flush()
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_THROTTLE)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, expected: usize, timestamp_ms: i64) {
        self.total_frames += 1;
        self.last_timestamp_ms = Some(timestamp_ms);
        if current % self.throttle_frames != 0 {
            return;
        }
        if expected > 0 {
            let pct = (current as f64 / expected as f64 * 100.0).min(100.0);
            log::info!("Sampled {current}/~{expected} frames ({pct:.1}%) at {timestamp_ms} ms");
        } else {
            log::info!("Sampled {current} frames at {timestamp_ms} ms");
        }
    }

    fn pass_complete(&mut self, pass: usize, frames: usize) {
        self.passes += 1;
        self.last_pass_frames = frames;
        log::info!("Pass {pass} complete: {frames} frames");
        if let Err(e) = self.write_pass_report(pass, frames) {
            log::warn!("Could not write report for pass {pass}: {e}");
        }
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
