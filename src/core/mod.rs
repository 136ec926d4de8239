mod chunk;
mod errors;
mod job;
mod traits;
mod types;

pub use chunk::{partition, Chunk, DEFAULT_CHUNK_SIZE};
pub use errors::{Result, UploadError};
pub use job::UploadJob;
pub use traits::{
    ChunkPayload,
    ChunkTransport,
    CompletionRequest,
    CompletionResponse,
    NoopObserver,
    ProcessedVideo,
    SessionRequest,
    UploadObserver,
    UploadSessionService,
    VideoProcessingService,
};
pub use types::{
    Difficulty,
    JobId,
    Privacy,
    Quality,
    SessionGrant,
    UploadOutcome,
    UploadProgress,
    UploadStatus,
    VideoDetails,
    VideoFile,
    VideoMetadata,
};
