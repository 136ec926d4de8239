pub mod client;
pub mod config;
pub mod core;
pub mod form;
pub mod media;
pub mod uploaders;
pub mod utils;
pub mod validation;

// 重新导出核心类型
pub use crate::core::{
    Chunk,
    Difficulty,
    Privacy,
    Quality,
    Result,
    SessionGrant,
    UploadError,
    UploadJob,
    UploadObserver,
    UploadOutcome,
    UploadProgress,
    UploadStatus,
    VideoDetails,
    VideoFile,
    VideoMetadata,
};

pub use client::HttpBackend;
pub use config::Config;
pub use form::UploadForm;
pub use uploaders::{ChannelObserver, ChunkedConfig, ChunkedUploader, UploadEvent};
pub use validation::{FileValidator, ValidationResult};
