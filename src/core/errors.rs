use thiserror::Error;
use super::types::UploadStatus;

#[derive(Error, Debug)]
pub enum UploadError {
    /// 文件校验失败（不会发送到服务器）
    #[error("Validation error: {0}")]
    Validation(String),

    /// 媒体解码失败
    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Chunk {index} transfer failed: {message}")]
    ChunkTransfer {
        index: usize,
        status: Option<u16>,
        message: String,
    },

    #[error("Failed to initialize upload session: {0}")]
    SessionInit(String),

    #[error("Failed to complete upload: {0}")]
    Completion(String),

    /// 传输结束后仍有分片未上传
    #[error("Upload incomplete, missing chunks: {missing:?}")]
    IncompleteUpload {
        missing: Vec<usize>,
    },

    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: UploadStatus,
        to: UploadStatus,
    },

    #[error("Chunk {0} does not exist or is already uploaded")]
    InvalidChunk(usize),

    #[error("Form is locked while an upload is running")]
    FormLocked,

    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP Request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn metadata(message: impl Into<String>) -> Self {
        Self::Metadata(message.into())
    }

    pub fn chunk_status(index: usize, status_code: u16) -> Self {
        Self::ChunkTransfer {
            index,
            status: Some(status_code),
            message: format!("server responded with status {}", status_code),
        }
    }

    pub fn chunk_network(index: usize, message: impl Into<String>) -> Self {
        Self::ChunkTransfer {
            index,
            status: None,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// 是否值得对同一个分片重试
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ChunkTransfer { status: None, .. } => true,
            Self::ChunkTransfer { status: Some(code), .. } => *code >= 500 || *code == 408 || *code == 429,
            Self::Http(_) | Self::Io(_) => true,
            _ => false,
        }
    }

    /// 面向用户的提示
    pub fn user_message(&self) -> String {
        match self {
            Self::SessionInit(_) | Self::Completion(_) => {
                format!("{}. Please try again.", self)
            }
            _ => self.to_string(),
        }
    }
}

/// Error alias
pub type Result<T, E = UploadError> = std::result::Result<T, E>;
