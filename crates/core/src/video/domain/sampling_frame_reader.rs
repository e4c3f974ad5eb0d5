use std::path::Path;

use crate::shared::constants::MAX_DECODE_RETRIES;
use crate::shared::frame::Frame;
use crate::shared::pixel_buffer::PixelBuffer;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_decoder::FrameDecoder;
use crate::video::domain::media_source::MediaSource;
use crate::video::domain::reader_error::ReaderError;
use crate::video::domain::sampling_interval::SamplingInterval;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReaderState {
    Open,
    /// A decode step failed after all retries. Terminal for this session.
    Exhausted,
    Closed,
}

/// Reads a video file one sampled frame at a time.
///
/// Wraps a [`FrameDecoder`] and adds two things on top of it:
///
/// - bounded retries that tell a transient decode failure apart from the end
///   of the stream (the decoder reports both as "no frame");
/// - temporal sub-sampling, so consecutive returned frames are at least one
///   [`SamplingInterval`] apart in decoded timestamps.
///
/// The reader owns its decode session. Reading the same file again requires
/// a new reader.
pub struct SamplingFrameReader {
    decoder: Box<dyn FrameDecoder>,
    source: MediaSource,
    metadata: VideoMetadata,
    interval: SamplingInterval,
    last_returned_ms: i64,
    state: ReaderState,
}

impl SamplingFrameReader {
    /// Validates the configuration and opens a decode session on `path`.
    ///
    /// `sampling_rate` is in frames per second; 0 returns every decoded
    /// frame. Validation order is rate, then extension, then opening, so a
    /// rejected input never reaches the decoder.
    pub fn open(
        path: &Path,
        sampling_rate: i64,
        mut decoder: Box<dyn FrameDecoder>,
    ) -> Result<Self, ReaderError> {
        let interval = SamplingInterval::from_rate(sampling_rate)?;
        let source = MediaSource::new(path)?;

        let metadata = decoder
            .open(source.path())
            .map_err(|err| ReaderError::OpenFailure {
                path: path.to_path_buf(),
                source: err,
            })?;

        log::info!(
            "Opened {} ({}x{}, {:.2} fps, sampling every {} ms)",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            interval.interval_ms()
        );

        Ok(Self {
            decoder,
            source,
            metadata,
            interval,
            last_returned_ms: interval.initial_timestamp(),
            state: ReaderState::Open,
        })
    }

    /// Returns the next frame that passes the sampling gate, or `None` once
    /// the stream is exhausted or the reader is closed.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.state != ReaderState::Open {
            return None;
        }

        loop {
            let Some(frame) = self.decode_step() else {
                log::debug!("End of stream for {}", self.source.path().display());
                self.state = ReaderState::Exhausted;
                return None;
            };

            let timestamp_ms = frame.timestamp_ms();
            if self.interval.admits(timestamp_ms, self.last_returned_ms) {
                self.last_returned_ms = timestamp_ms;
                return Some(frame);
            }
            log::trace!(
                "Skipping frame at {timestamp_ms} ms (last returned {} ms)",
                self.last_returned_ms
            );
        }
    }

    /// One grab + retrieve with up to [`MAX_DECODE_RETRIES`] extra attempts.
    ///
    /// When a retry was needed, the recovered frame must be stamped strictly
    /// after the position recorded before the first attempt; otherwise the
    /// decoder is replaying a frame it already served and the step fails.
    /// A first-attempt success is trusted as is.
    fn decode_step(&mut self) -> Option<Frame> {
        let previous_ms = self.decoder.position_ms();
        let (mut image, mut timestamp_ms) = self.attempt_decode();

        let mut retries = 0;
        while image.is_none() && retries < MAX_DECODE_RETRIES {
            retries += 1;
            log::debug!("Decode attempt failed at {timestamp_ms} ms, retry {retries}");
            (image, timestamp_ms) = self.attempt_decode();
        }

        let image = image?;
        if retries > 0 && timestamp_ms <= previous_ms {
            log::debug!(
                "Decoder did not advance after retry ({timestamp_ms} ms <= {previous_ms} ms)"
            );
            return None;
        }
        Some(Frame::new(image, timestamp_ms))
    }

    fn attempt_decode(&mut self) -> (Option<PixelBuffer>, i64) {
        let grabbed = self.decoder.grab();
        let retrieved = self.decoder.retrieve();
        let timestamp_ms = self.decoder.position_ms();
        (retrieved.filter(|_| grabbed), timestamp_ms)
    }

    /// Releases the decode session. Further reads return `None`.
    pub fn close(&mut self) {
        if self.state != ReaderState::Closed {
            self.decoder.close();
            self.state = ReaderState::Closed;
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    pub fn interval(&self) -> SamplingInterval {
        self.interval
    }

    pub fn last_returned_ms(&self) -> i64 {
        self.last_returned_ms
    }
}

impl Iterator for SamplingFrameReader {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        self.next_frame()
    }
}

impl Drop for SamplingFrameReader {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::domain::reader_error::DecoderError;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    // --- Scripted decoder ---

    /// Outcome of one grab + retrieve pair and the position reported after it.
    #[derive(Clone, Copy)]
    struct Step {
        grab: bool,
        retrieve: bool,
        position_ms: i64,
    }

    fn ok(position_ms: i64) -> Step {
        Step {
            grab: true,
            retrieve: true,
            position_ms,
        }
    }

    fn fail(position_ms: i64) -> Step {
        Step {
            grab: false,
            retrieve: false,
            position_ms,
        }
    }

    #[derive(Default)]
    struct Calls {
        open: usize,
        grab: usize,
        close: usize,
    }

    struct ScriptedDecoder {
        steps: VecDeque<Step>,
        current: Option<Step>,
        position_ms: i64,
        fail_open: bool,
        calls: Arc<Mutex<Calls>>,
    }

    impl ScriptedDecoder {
        fn new(steps: Vec<Step>) -> (Self, Arc<Mutex<Calls>>) {
            let calls = Arc::new(Mutex::new(Calls::default()));
            let decoder = Self {
                steps: steps.into(),
                current: None,
                position_ms: 0,
                fail_open: false,
                calls: Arc::clone(&calls),
            };
            (decoder, calls)
        }

        fn starting_at(mut self, position_ms: i64) -> Self {
            self.position_ms = position_ms;
            self
        }

        fn failing_open(mut self) -> Self {
            self.fail_open = true;
            self
        }
    }

    impl FrameDecoder for ScriptedDecoder {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, DecoderError> {
            self.calls.lock().unwrap().open += 1;
            if self.fail_open {
                return Err("codec not found".into());
            }
            Ok(VideoMetadata {
                width: 2,
                height: 2,
                fps: 25.0,
                total_frames: self.steps.len(),
                codec: "scripted".to_string(),
                source_path: Some(path.to_path_buf()),
            })
        }

        fn grab(&mut self) -> bool {
            self.calls.lock().unwrap().grab += 1;
            let step = self.steps.pop_front().unwrap_or(fail(0));
            self.position_ms = step.position_ms;
            self.current = Some(step);
            step.grab
        }

        fn retrieve(&mut self) -> Option<PixelBuffer> {
            match self.current {
                Some(step) if step.retrieve => {
                    Some(PixelBuffer::new(vec![step.position_ms as u8; 12], 2, 2, 3))
                }
                _ => None,
            }
        }

        fn position_ms(&self) -> i64 {
            self.position_ms
        }

        fn close(&mut self) {
            self.calls.lock().unwrap().close += 1;
        }
    }

    fn video_path() -> PathBuf {
        PathBuf::from("/videos/clip.mp4")
    }

    fn open_reader(steps: Vec<Step>, rate: i64) -> SamplingFrameReader {
        let (decoder, _) = ScriptedDecoder::new(steps);
        SamplingFrameReader::open(&video_path(), rate, Box::new(decoder)).unwrap()
    }

    fn timestamps(reader: SamplingFrameReader) -> Vec<i64> {
        reader.map(|f| f.timestamp_ms()).collect()
    }

    // --- Construction ---

    #[test]
    fn test_negative_rate_is_rejected_before_opening() {
        let (decoder, calls) = ScriptedDecoder::new(vec![ok(10)]);
        let result = SamplingFrameReader::open(&video_path(), -1, Box::new(decoder));
        assert!(matches!(result, Err(ReaderError::InvalidConfiguration(_))));
        assert_eq!(calls.lock().unwrap().open, 0);
    }

    #[test]
    fn test_rate_is_checked_before_extension() {
        let (decoder, _) = ScriptedDecoder::new(vec![]);
        let result = SamplingFrameReader::open(Path::new("notes.txt"), -5, Box::new(decoder));
        assert!(matches!(result, Err(ReaderError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_unsupported_extension_is_rejected_before_any_decode() {
        let (decoder, calls) = ScriptedDecoder::new(vec![ok(10)]);
        let result = SamplingFrameReader::open(Path::new("notes.txt"), 0, Box::new(decoder));
        match result {
            Err(ReaderError::UnsupportedFormat { extension, .. }) => assert_eq!(extension, ".txt"),
            Err(other) => panic!("expected UnsupportedFormat, got {other:?}"),
            Ok(_) => panic!("expected UnsupportedFormat, got a reader"),
        }
        let calls = calls.lock().unwrap();
        assert_eq!(calls.open, 0);
        assert_eq!(calls.grab, 0);
    }

    #[test]
    fn test_open_failure_wraps_decoder_reason() {
        let (decoder, _) = ScriptedDecoder::new(vec![]);
        let result =
            SamplingFrameReader::open(&video_path(), 0, Box::new(decoder.failing_open()));
        match result {
            Err(ReaderError::OpenFailure { path, source }) => {
                assert_eq!(path, video_path());
                assert_eq!(source.to_string(), "codec not found");
            }
            Err(other) => panic!("expected OpenFailure, got {other:?}"),
            Ok(_) => panic!("expected OpenFailure, got a reader"),
        }
    }

    #[test]
    fn test_open_reader_exposes_session_details() {
        let reader = open_reader(vec![ok(10)], 25);
        assert_eq!(reader.state(), ReaderState::Open);
        assert_eq!(reader.source().extension(), ".mp4");
        assert_eq!(reader.metadata().codec, "scripted");
        assert_eq!(reader.interval().interval_ms(), 40);
        assert_eq!(reader.last_returned_ms(), -40);
    }

    // --- Sampling ---

    #[test]
    fn test_zero_rate_returns_every_decoded_frame() {
        let steps = (1..=6).map(|i| ok(i * 5)).collect();
        assert_eq!(
            timestamps(open_reader(steps, 0)),
            vec![5, 10, 15, 20, 25, 30]
        );
    }

    #[test]
    fn test_returned_frames_are_at_least_one_interval_apart() {
        let steps = (1..=20).map(|i| ok(i * 10)).collect();
        let returned = timestamps(open_reader(steps, 25));
        assert_eq!(returned, vec![10, 50, 90, 130, 170]);
        for pair in returned.windows(2) {
            assert!(pair[1] - pair[0] >= 40);
        }
    }

    #[test]
    fn test_gap_is_measured_from_last_returned_frame() {
        // 50 and 60 are skipped; 80 is 40 after the returned 40, not after 60
        let returned = timestamps(open_reader(vec![ok(40), ok(50), ok(60), ok(80)], 25));
        assert_eq!(returned, vec![40, 80]);
    }

    #[test]
    fn test_first_frame_is_always_accepted() {
        // 1 fps means a 1000 ms interval; the first frame at 5 ms still passes
        let returned = timestamps(open_reader(vec![ok(5), ok(500), ok(1005)], 1));
        assert_eq!(returned, vec![5, 1005]);
    }

    #[test]
    fn test_non_positive_timestamps_bypass_the_gate() {
        let returned = timestamps(open_reader(vec![ok(50), ok(0), ok(0), ok(60)], 25));
        assert_eq!(returned, vec![50, 0, 0, 60]);
    }

    #[test]
    fn test_evenly_spaced_stream_at_exact_interval_loses_nothing() {
        let steps = vec![ok(0), ok(0), ok(40), ok(80), ok(120)];
        let returned = timestamps(open_reader(steps, 25));
        assert_eq!(returned, vec![0, 0, 40, 80, 120]);
    }

    // --- Retry and end-of-stream disambiguation ---

    #[test]
    fn test_transient_failure_is_absorbed_when_decoder_advances() {
        let returned = timestamps(open_reader(vec![ok(40), fail(0), ok(80), ok(120)], 0));
        assert_eq!(returned, vec![40, 80, 120]);
    }

    #[test]
    fn test_still_image_surfaces_on_second_attempt() {
        let returned = timestamps(open_reader(vec![fail(0), ok(33)], 0));
        assert_eq!(returned, vec![33]);
    }

    #[test]
    fn test_retrieve_failure_alone_triggers_retry() {
        let retrieve_fails = Step {
            grab: true,
            retrieve: false,
            position_ms: 40,
        };
        let returned = timestamps(open_reader(vec![ok(40), retrieve_fails, ok(80)], 0));
        assert_eq!(returned, vec![40, 80]);
    }

    #[test]
    fn test_success_on_third_attempt_without_progress_is_end_of_stream() {
        let (decoder, calls) = ScriptedDecoder::new(vec![fail(0), fail(0), ok(100)]);
        let mut reader =
            SamplingFrameReader::open(&video_path(), 0, Box::new(decoder.starting_at(100)))
                .unwrap();
        assert!(reader.next_frame().is_none());
        assert_eq!(reader.state(), ReaderState::Exhausted);
        assert_eq!(calls.lock().unwrap().grab, 3);
    }

    #[test]
    fn test_success_on_third_attempt_with_progress_is_accepted() {
        let (decoder, _) = ScriptedDecoder::new(vec![fail(0), fail(0), ok(101)]);
        let mut reader =
            SamplingFrameReader::open(&video_path(), 0, Box::new(decoder.starting_at(100)))
                .unwrap();
        assert_eq!(reader.next_frame().map(|f| f.timestamp_ms()), Some(101));
    }

    #[test]
    fn test_first_attempt_success_skips_progress_check() {
        // Known asymmetry: a non-advancing timestamp is only rejected after a retry
        let (decoder, _) = ScriptedDecoder::new(vec![ok(80), ok(50)]);
        let reader =
            SamplingFrameReader::open(&video_path(), 0, Box::new(decoder.starting_at(80)))
                .unwrap();
        assert_eq!(timestamps(reader), vec![80, 50]);
    }

    #[test]
    fn test_retries_are_bounded() {
        let (decoder, calls) = ScriptedDecoder::new(vec![fail(0), fail(0), fail(0), ok(40)]);
        let mut reader = SamplingFrameReader::open(&video_path(), 0, Box::new(decoder)).unwrap();
        assert!(reader.next_frame().is_none());
        assert_eq!(calls.lock().unwrap().grab, 1 + MAX_DECODE_RETRIES);
    }

    #[test]
    fn test_exhausted_reader_never_decodes_again() {
        let (decoder, calls) = ScriptedDecoder::new(vec![fail(0), fail(0), fail(0), ok(40)]);
        let mut reader = SamplingFrameReader::open(&video_path(), 0, Box::new(decoder)).unwrap();
        assert!(reader.next_frame().is_none());
        assert!(reader.next_frame().is_none());
        assert_eq!(reader.state(), ReaderState::Exhausted);
        assert_eq!(calls.lock().unwrap().grab, 3);
    }

    #[test]
    fn test_returned_frame_carries_decoded_pixels() {
        let mut reader = open_reader(vec![ok(7)], 0);
        let frame = reader.next_frame().unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.image().data(), &[7u8; 12]);
    }

    // --- Lifecycle ---

    #[test]
    fn test_close_releases_decoder_once() {
        let (decoder, calls) = ScriptedDecoder::new(vec![ok(10), ok(20)]);
        let mut reader = SamplingFrameReader::open(&video_path(), 0, Box::new(decoder)).unwrap();
        reader.close();
        reader.close();
        assert_eq!(reader.state(), ReaderState::Closed);
        assert!(reader.next_frame().is_none());
        drop(reader);
        assert_eq!(calls.lock().unwrap().close, 1);
    }

    #[test]
    fn test_drop_closes_session() {
        let (decoder, calls) = ScriptedDecoder::new(vec![ok(10)]);
        let reader = SamplingFrameReader::open(&video_path(), 0, Box::new(decoder)).unwrap();
        drop(reader);
        assert_eq!(calls.lock().unwrap().close, 1);
    }

    #[test]
    fn test_exhausted_reader_can_still_be_closed() {
        let mut reader = open_reader(vec![], 0);
        assert!(reader.next_frame().is_none());
        assert_eq!(reader.state(), ReaderState::Exhausted);
        reader.close();
        assert_eq!(reader.state(), ReaderState::Closed);
    }
}
