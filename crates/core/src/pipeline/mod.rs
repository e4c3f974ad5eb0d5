pub mod frame_processor;
pub mod pipeline_logger;
pub mod sample_frames_use_case;
