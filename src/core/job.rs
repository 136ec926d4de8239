use chrono::{DateTime, Utc};
use tracing::debug;
use crate::utils::ProgressTracker;
use super::chunk::{partition, Chunk};
use super::errors::{Result, UploadError};
use super::types::{JobId, SessionGrant, UploadProgress, UploadStatus, VideoFile};

/// 单次上传任务
///
/// 状态只能按 `Idle -> Uploading -> Processing -> Completed` 前进，
/// 任何非终止状态都可以进入 `Error`。
#[derive(Debug, Clone)]
pub struct UploadJob {
    id: JobId,
    file: VideoFile,
    chunk_size: u64,
    chunks: Vec<Chunk>,
    grant: Option<SessionGrant>,
    status: UploadStatus,
    tracker: ProgressTracker,
    error: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl UploadJob {
    pub fn new(file: VideoFile, chunk_size: u64) -> Result<Self> {
        if chunk_size == 0 {
            return Err(UploadError::config("chunk_size must be greater than 0"));
        }
        if file.size == 0 {
            return Err(UploadError::validation(format!("File {} is empty", file.name)));
        }

        let chunks = partition(file.size, chunk_size);
        let tracker = ProgressTracker::new(file.size);

        Ok(Self {
            id: JobId::new(),
            file,
            chunk_size,
            chunks,
            grant: None,
            status: UploadStatus::Idle,
            tracker,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        })
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn file(&self) -> &VideoFile {
        &self.file
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn grant(&self) -> Option<&SessionGrant> {
        self.grant.as_ref()
    }

    pub fn upload_id(&self) -> Option<&str> {
        self.grant.as_ref().map(|g| g.upload_id.as_str())
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn progress(&self) -> UploadProgress {
        self.tracker.snapshot()
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// 尚未上传的分片序号
    pub fn pending_chunks(&self) -> Vec<usize> {
        self.chunks
            .iter()
            .filter(|c| !c.uploaded)
            .map(|c| c.index)
            .collect()
    }

    pub fn is_fully_uploaded(&self) -> bool {
        self.chunks.iter().all(|c| c.uploaded)
    }

    /// 绑定会话，进入 `Uploading`
    pub fn bind_session(&mut self, grant: SessionGrant) -> Result<UploadStatus> {
        let old = self.transition(UploadStatus::Idle, UploadStatus::Uploading)?;
        self.grant = Some(grant);
        self.started_at = Some(Utc::now());
        self.tracker.restart();
        Ok(old)
    }

    /// 标记分片已上传，返回最新进度
    pub fn mark_uploaded(&mut self, index: usize) -> Result<UploadProgress> {
        if self.status != UploadStatus::Uploading {
            return Err(UploadError::InvalidChunk(index));
        }

        let chunk = self
            .chunks
            .get_mut(index)
            .filter(|c| !c.uploaded)
            .ok_or(UploadError::InvalidChunk(index))?;

        chunk.uploaded = true;
        self.tracker.add_bytes(chunk.len());
        debug!(job = %self.id, index, uploaded = self.tracker.uploaded_bytes(), "chunk marked");

        Ok(self.tracker.snapshot())
    }

    /// 所有分片上传完成后进入 `Processing`
    pub fn begin_processing(&mut self) -> Result<UploadStatus> {
        if self.status == UploadStatus::Uploading && !self.is_fully_uploaded() {
            return Err(UploadError::IncompleteUpload {
                missing: self.pending_chunks(),
            });
        }

        self.transition(UploadStatus::Uploading, UploadStatus::Processing)
    }

    pub fn complete(&mut self) -> Result<UploadStatus> {
        let old = self.transition(UploadStatus::Processing, UploadStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        Ok(old)
    }

    /// 进入 `Error`，已是终止状态时返回错误
    pub fn fail(&mut self, message: impl Into<String>) -> Result<UploadStatus> {
        let old = self.status;
        if old.is_terminal() {
            return Err(UploadError::InvalidTransition {
                from: old,
                to: UploadStatus::Error,
            });
        }

        self.status = UploadStatus::Error;
        self.error = Some(message.into());
        Ok(old)
    }

    /// 同一会话内恢复失败的任务，只重传未完成的分片
    pub fn reopen(&mut self) -> Result<UploadStatus> {
        if self.grant.is_none() || self.is_fully_uploaded() {
            return Err(UploadError::InvalidTransition {
                from: self.status,
                to: UploadStatus::Uploading,
            });
        }

        let old = self.transition(UploadStatus::Error, UploadStatus::Uploading)?;
        self.error = None;
        Ok(old)
    }

    fn transition(&mut self, from: UploadStatus, to: UploadStatus) -> Result<UploadStatus> {
        if self.status != from {
            return Err(UploadError::InvalidTransition {
                from: self.status,
                to,
            });
        }

        self.status = to;
        Ok(from)
    }
}
