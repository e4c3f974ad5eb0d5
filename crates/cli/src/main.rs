use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use framesampler_core::pipeline::frame_processor::{FrameProcessor, ProcessorError};
use framesampler_core::pipeline::pipeline_logger::{
    NullPipelineLogger, PipelineLogger, StdoutPipelineLogger,
};
use framesampler_core::pipeline::sample_frames_use_case::{
    DecoderFactory, RunSummary, SampleError, SampleFramesUseCase,
};
use framesampler_core::shared::constants::SUPPORTED_EXTENSIONS;
use framesampler_core::shared::frame::Frame;
use framesampler_core::video::domain::frame_decoder::FrameDecoder;
use framesampler_core::video::infrastructure::ffmpeg_decoder::FfmpegDecoder;

/// Sample decoded frames from video files at a target frame rate.
#[derive(Parser)]
#[command(name = "framesampler")]
struct Cli {
    /// Video files to process, in order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Input sampling frame rate. 0 reads every frame at the video's own rate.
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    sfps: i64,

    /// Re-read each input until a pass yields no frames.
    #[arg(long = "loop", conflicts_with = "passes")]
    loop_input: bool,

    /// Number of passes over each input.
    #[arg(long, default_value = "1")]
    passes: usize,

    /// Disable per-frame output and per-pass reports.
    #[arg(short, long)]
    quiet: bool,
}

/// Writes one `timestamp_ms,width,height` line per sampled frame.
struct FrameReportProcessor<W: Write + Send> {
    out: W,
    header_written: bool,
}

impl<W: Write + Send> FrameReportProcessor<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            header_written: false,
        }
    }
}

impl<W: Write + Send> FrameProcessor for FrameReportProcessor<W> {
    fn process(&mut self, frame: &Frame) -> Result<(), ProcessorError> {
        if !self.header_written {
            writeln!(self.out, "TimeStamp,width,height")?;
            self.header_written = true;
        }
        writeln!(
            self.out,
            "{},{},{}",
            frame.timestamp_ms(),
            frame.width(),
            frame.height()
        )?;
        Ok(())
    }
}

/// Discards frames; used with `--quiet`.
struct SilentProcessor;

impl FrameProcessor for SilentProcessor {
    fn process(&mut self, _frame: &Frame) -> Result<(), ProcessorError> {
        Ok(())
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Builds the decoder used for each pass over an input.
type DecoderBuilder = fn() -> Box<dyn FrameDecoder>;

fn ffmpeg_decoder() -> Box<dyn FrameDecoder> {
    Box::new(FfmpegDecoder::new())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    sample_batch(&cli, ffmpeg_decoder)?;
    Ok(())
}

/// Samples every input in order and returns how many were processed.
///
/// Unsupported or unopenable inputs are skipped; a configuration error
/// aborts the batch, as does a batch where no input could be processed.
fn sample_batch(
    cli: &Cli,
    make_decoder: DecoderBuilder,
) -> Result<usize, Box<dyn std::error::Error>> {
    let passes = if cli.loop_input {
        None
    } else {
        Some(cli.passes)
    };

    let mut processed = 0;
    for input in &cli.inputs {
        match sample_input(input, cli.sfps, passes, cli.quiet, make_decoder) {
            Ok(summary) => {
                processed += 1;
                log::info!(
                    "Finished {}: {} passes, {} frames",
                    input.display(),
                    summary.passes,
                    summary.total_frames
                );
            }
            Err(SampleError::Reader(e)) if e.is_input_specific() => {
                log::warn!("Skipping {}: {e}", input.display());
            }
            Err(e) => return Err(e.into()),
        }
    }

    if processed == 0 {
        return Err(format!(
            "No input could be processed (supported extensions: {})",
            SUPPORTED_EXTENSIONS.join(", ")
        )
        .into());
    }
    Ok(processed)
}

fn sample_input(
    input: &Path,
    sfps: i64,
    passes: Option<usize>,
    quiet: bool,
    make_decoder: DecoderBuilder,
) -> Result<RunSummary, SampleError> {
    let decoder_factory: DecoderFactory = Box::new(make_decoder);

    let (processor, logger): (Box<dyn FrameProcessor>, Box<dyn PipelineLogger>) = if quiet {
        (Box::new(SilentProcessor), Box::new(NullPipelineLogger))
    } else {
        (
            Box::new(FrameReportProcessor::new(io::stdout())),
            Box::new(StdoutPipelineLogger::default()),
        )
    };

    let mut use_case = SampleFramesUseCase::new(decoder_factory, processor, logger, sfps, passes);
    use_case.execute(input)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.passes == 0 {
        return Err("Passes must be at least 1".into());
    }
    Ok(())
}
