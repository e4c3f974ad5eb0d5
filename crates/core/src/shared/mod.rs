pub mod constants;
pub mod frame;
pub mod pixel_buffer;
pub mod video_metadata;
