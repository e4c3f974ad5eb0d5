use std::path::Path;

use thiserror::Error;

use crate::pipeline::frame_processor::{FrameProcessor, ProcessorError};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::video::domain::frame_decoder::FrameDecoder;
use crate::video::domain::reader_error::ReaderError;
use crate::video::domain::sampling_frame_reader::SamplingFrameReader;

/// Builds a fresh decoder for every pass over an input.
pub type DecoderFactory = Box<dyn Fn() -> Box<dyn FrameDecoder> + Send>;

#[derive(Error, Debug)]
pub enum SampleError {
    #[error(transparent)]
    Reader(#[from] ReaderError),
    #[error("frame processor failed at {timestamp_ms} ms: {source}")]
    Processor {
        timestamp_ms: i64,
        #[source]
        source: ProcessorError,
    },
}

/// Running totals for one input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passes: usize,
    pub total_frames: usize,
    pub last_pass_frames: usize,
}

impl RunSummary {
    fn record_pass(&mut self, frames: usize) {
        self.passes += 1;
        self.total_frames += frames;
        self.last_pass_frames = frames;
    }
}

/// Sampling pipeline: open → sample → process, repeated per pass.
///
/// Each pass constructs a new [`SamplingFrameReader`], which is the only way
/// to read a file from the start again. With `passes = None` the input is
/// re-read until a pass yields no frames.
pub struct SampleFramesUseCase {
    decoder_factory: DecoderFactory,
    processor: Box<dyn FrameProcessor>,
    logger: Box<dyn PipelineLogger>,
    sampling_rate: i64,
    passes: Option<usize>,
}

impl SampleFramesUseCase {
    pub fn new(
        decoder_factory: DecoderFactory,
        processor: Box<dyn FrameProcessor>,
        logger: Box<dyn PipelineLogger>,
        sampling_rate: i64,
        passes: Option<usize>,
    ) -> Self {
        Self {
            decoder_factory,
            processor,
            logger,
            sampling_rate,
            passes: passes.map(|n| n.max(1)),
        }
    }

    pub fn execute(&mut self, input_path: &Path) -> Result<RunSummary, SampleError> {
        let mut summary = RunSummary::default();

        loop {
            let pass = summary.passes + 1;
            let frames = self.run_pass(input_path)?;
            self.processor.reset();
            self.logger.pass_complete(pass, frames);
            summary.record_pass(frames);

            let finished = match self.passes {
                Some(limit) => pass >= limit,
                None => frames == 0,
            };
            if finished {
                break;
            }
        }

        if self.passes.is_none() {
            log::warn!(
                "Stopped looping over {} after an empty pass",
                input_path.display()
            );
        }
        self.logger.summary();
        Ok(summary)
    }

    fn run_pass(&mut self, input_path: &Path) -> Result<usize, SampleError> {
        let decoder = (self.decoder_factory)();
        let mut reader = SamplingFrameReader::open(input_path, self.sampling_rate, decoder)?;
        let metadata = reader.metadata();
        let expected = metadata
            .expected_sampled_frames(self.sampling_rate)
            .unwrap_or(0);
        self.logger.info(&format!(
            "Opened {} ({}x{}, {:.2} fps, {}, sampling every {} ms)",
            input_path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.codec,
            reader.interval().interval_ms()
        ));

        let mut frames = 0;
        while let Some(frame) = reader.next_frame() {
            frames += 1;
            self.processor
                .process(&frame)
                .map_err(|source| SampleError::Processor {
                    timestamp_ms: frame.timestamp_ms(),
                    source,
                })?;
            self.logger.progress(frames, expected, frame.timestamp_ms());
        }
        reader.close();
        Ok(frames)
    }
}
