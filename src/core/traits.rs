use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use super::errors::{Result, UploadError};
use super::types::{Difficulty, Privacy, Quality, SessionGrant, UploadProgress, UploadStatus, VideoDetails};

/// 会话初始化请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub file_name: String,
    pub file_size: u64,
    pub course_id: String,
}

/// 单个分片的请求内容
#[derive(Debug, Clone)]
pub struct ChunkPayload {
    pub file_name: String,
    pub data: Bytes,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// 完成握手请求
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub upload_id: String,
    pub course_id: String,
    pub title: String,
    pub description: String,
    pub position: Option<u32>,
    pub tags: Vec<String>,
    pub difficulty: Difficulty,
    pub is_preview: bool,
    pub enable_comments: bool,
    pub enable_downloads: bool,
    pub quality: Quality,
    pub format: Option<String>,
    pub enable_watermark: bool,
    pub enable_subtitles: bool,
    pub privacy: Privacy,
}

impl CompletionRequest {
    pub fn new(upload_id: &str, course_id: &str, details: &VideoDetails) -> Self {
        Self {
            upload_id: upload_id.to_string(),
            course_id: course_id.to_string(),
            title: details.title.clone(),
            description: details.description.clone(),
            position: details.position,
            tags: details.tags.clone(),
            difficulty: details.difficulty,
            is_preview: details.is_preview,
            enable_comments: details.enable_comments,
            enable_downloads: details.enable_downloads,
            quality: details.quality,
            format: details.format.clone(),
            enable_watermark: details.enable_watermark,
            enable_subtitles: details.enable_subtitles,
            privacy: details.privacy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessedVideo {
    pub url: Option<String>,
}

/// 完成握手响应 `{ "video": { "url": ... } }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompletionResponse {
    pub video: Option<ProcessedVideo>,
}

impl CompletionResponse {
    pub fn video_url(&self) -> Option<&str> {
        self.video.as_ref().and_then(|v| v.url.as_deref())
    }
}

/// 上传会话服务
#[async_trait]
pub trait UploadSessionService: Send + Sync {
    async fn init_session(&self, request: &SessionRequest) -> Result<SessionGrant>;
}

/// 分片传输
#[async_trait]
pub trait ChunkTransport: Send + Sync {
    /// 任何 2xx 都视为成功
    async fn send_chunk(&self, grant: &SessionGrant, payload: ChunkPayload) -> Result<()>;
}

/// 视频处理服务（完成握手）
#[async_trait]
pub trait VideoProcessingService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}

/// 上传过程回调，默认全部为空实现
pub trait UploadObserver: Send + Sync {
    /// 每个分片成功后调用
    fn on_progress(&self, _progress: &UploadProgress) {}

    fn on_state_change(&self, _old_state: UploadStatus, _new_state: UploadStatus) {}

    /// 分片失败并被跳过
    fn on_chunk_failed(&self, _index: usize, _error: &UploadError) {}

    /// 完成握手成功后调用一次
    fn on_success(&self, _video_url: Option<&str>) {}

    fn on_error(&self, _message: &str) {}
}

/// 不关心任何事件
pub struct NoopObserver;

impl UploadObserver for NoopObserver {}
