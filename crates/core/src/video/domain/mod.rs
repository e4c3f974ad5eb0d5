pub mod frame_decoder;
pub mod media_source;
pub mod reader_error;
pub mod sampling_frame_reader;
pub mod sampling_interval;
