pub mod chunked;
pub mod events;

pub use chunked::{ChunkedConfig, ChunkedUploader};
pub use events::{ChannelObserver, UploadEvent};
