use std::path::Path;

use crate::shared::constants::MS_PER_SECOND;
use crate::shared::pixel_buffer::PixelBuffer;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_decoder::FrameDecoder;
use crate::video::domain::reader_error::DecoderError;

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// `grab` decodes the next frame of the best video stream and keeps it
/// pending; `retrieve` converts the pending frame to packed BGR24.
pub struct FfmpegDecoder {
    session: Option<DecodeSession>,
}

// Safety: FfmpegDecoder is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegDecoder {}

impl FfmpegDecoder {
    pub fn new() -> Self {
        Self { session: None }
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new()
    }
}

struct DecodeSession {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    video_stream_index: usize,
    time_base: ffmpeg_next::Rational,
    width: u32,
    height: u32,
    grabbed: Option<ffmpeg_next::util::frame::video::Video>,
    position_ms: i64,
    flushing: bool,
    done: bool,
}

impl DecodeSession {
    fn try_receive(&mut self) -> Option<ffmpeg_next::util::frame::video::Video> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        self.decoder
            .receive_frame(&mut decoded)
            .ok()
            .map(|_| decoded)
    }

    /// Feeds packets to the decoder until it yields a frame, flushing the
    /// decoder once the container runs out of packets.
    fn decode_next(&mut self) -> Option<ffmpeg_next::util::frame::video::Video> {
        if self.done {
            return None;
        }

        if let Some(decoded) = self.try_receive() {
            return Some(decoded);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(decoded) = self.try_receive() {
                    return Some(decoded);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Dropping undecodable packet: {e}");
                continue;
            }

            if let Some(decoded) = self.try_receive() {
                return Some(decoded);
            }
        }
    }

    fn convert_grabbed(&mut self) -> Option<PixelBuffer> {
        let decoded = self.grabbed.as_ref()?;
        let mut bgr_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(decoded, &mut bgr_frame) {
            log::warn!("Failed to convert frame to BGR: {e}");
            return None;
        }
        let pixels = extract_packed_pixels(&bgr_frame, self.width, self.height);
        Some(PixelBuffer::new(pixels, self.width, self.height, 3))
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, DecoderError> {
        self.session = None;
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let time_base = stream.time_base();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let width = decoder.width();
        let height = decoder.height();

        let metadata = VideoMetadata {
            width,
            height,
            fps,
            total_frames: stream.frames().max(0) as usize,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::BGR24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.session = Some(DecodeSession {
            ictx,
            decoder,
            scaler,
            video_stream_index,
            time_base,
            width,
            height,
            grabbed: None,
            position_ms: 0,
            flushing: false,
            done: false,
        });

        Ok(metadata)
    }

    fn grab(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        match session.decode_next() {
            Some(decoded) => {
                let timestamp = decoded.timestamp().or(decoded.pts());
                session.position_ms = timestamp
                    .map(|ts| to_milliseconds(ts, session.time_base))
                    .unwrap_or(0);
                session.grabbed = Some(decoded);
                true
            }
            None => {
                session.grabbed = None;
                session.position_ms = 0;
                false
            }
        }
    }

    fn retrieve(&mut self) -> Option<PixelBuffer> {
        self.session.as_mut()?.convert_grabbed()
    }

    fn position_ms(&self) -> i64 {
        self.session.as_ref().map_or(0, |s| s.position_ms)
    }

    fn close(&mut self) {
        self.session = None;
    }
}

/// Converts a stream timestamp to milliseconds, rounding to the nearest ms.
fn to_milliseconds(timestamp: i64, time_base: ffmpeg_next::Rational) -> i64 {
    if time_base.denominator() == 0 {
        return 0;
    }
    let seconds = timestamp as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    (seconds * MS_PER_SECOND as f64).round() as i64
}

/// Copies pixel data from an ffmpeg frame into a contiguous 3-channel buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
/// This function strips that padding to produce a tightly-packed pixel buffer.
fn extract_packed_pixels(
    frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = frame.stride(0);
    let data = frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
