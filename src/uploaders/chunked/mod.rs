use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use crate::core::{
    Chunk, ChunkPayload, ChunkTransport, CompletionRequest, Result, SessionGrant, SessionRequest,
    UploadError, UploadJob, UploadObserver, UploadOutcome, UploadSessionService, UploadStatus,
    VideoDetails, VideoFile, VideoMetadata, VideoProcessingService, DEFAULT_CHUNK_SIZE,
};
use crate::media::{extract_metadata, MediaProbe};
use crate::utils::{retry_with_config, RetryConfig, RetryStrategy};
use crate::validation::FileValidator;

/// 分片上传配置
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkedConfig {
    pub chunk_size: u64,
    /// 为 true 时失败的分片被跳过，继续上传后续分片
    pub resumable: bool,
    /// 单个分片失败后的额外尝试次数
    pub max_chunk_retries: u32,
    pub retry_delay: Duration,
}

impl Default for ChunkedConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            resumable: true,
            max_chunk_retries: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// 分片上传器
///
/// 按 初始化 -> 顺序传输分片 -> 完成握手 三个阶段驱动一个 [`UploadJob`]。
pub struct ChunkedUploader {
    sessions: Arc<dyn UploadSessionService>,
    transport: Arc<dyn ChunkTransport>,
    processing: Arc<dyn VideoProcessingService>,
    probe: Option<Arc<dyn MediaProbe>>,
    validator: FileValidator,
    config: ChunkedConfig,
    retry: RetryConfig,
    course_id: String,
}

impl ChunkedUploader {
    /// 三个服务由同一个后端提供
    pub fn new<B>(backend: Arc<B>, course_id: impl Into<String>, config: ChunkedConfig) -> Self
    where
        B: UploadSessionService + ChunkTransport + VideoProcessingService + 'static,
    {
        Self::with_services(backend.clone(), backend.clone(), backend, course_id, config)
    }

    pub fn with_services(
        sessions: Arc<dyn UploadSessionService>,
        transport: Arc<dyn ChunkTransport>,
        processing: Arc<dyn VideoProcessingService>,
        course_id: impl Into<String>,
        config: ChunkedConfig,
    ) -> Self {
        let retry = Self::retry_config(&config);

        Self {
            sessions,
            transport,
            processing,
            probe: None,
            validator: FileValidator::default(),
            config,
            retry,
            course_id: course_id.into(),
        }
    }

    pub fn with_validator(mut self, validator: FileValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn MediaProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn config(&self) -> &ChunkedConfig {
        &self.config
    }

    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    fn retry_config(config: &ChunkedConfig) -> RetryConfig {
        RetryConfig::with_retries(
            config.max_chunk_retries,
            RetryStrategy::Exponential {
                initial: config.retry_delay,
                multiplier: 2.0,
                max_delay: Duration::from_secs(30),
            },
        )
    }

    /// 校验文件并创建任务，不发送任何请求
    pub fn prepare(&self, file: VideoFile) -> Result<UploadJob> {
        self.validator.check(&file)?;
        UploadJob::new(file, self.config.chunk_size)
    }

    /// 提取元数据，失败时返回 `None`
    pub async fn inspect(&self, file: &VideoFile) -> Option<VideoMetadata> {
        let probe = self.probe.as_deref()?;

        match extract_metadata(probe, file).await {
            Ok(metadata) => Some(metadata),
            Err(err) => {
                warn!(file = %file.name, error = %err, "metadata extraction failed, continuing without it");
                None
            }
        }
    }

    /// 执行完整的上传流程
    ///
    /// 出错时任务进入 `Error`，观察者收到 `on_error`，同时返回错误。
    #[instrument(skip_all, fields(job = %job.id(), file = %job.file().name))]
    pub async fn upload(
        &self,
        job: &mut UploadJob,
        details: &VideoDetails,
        observer: &dyn UploadObserver,
    ) -> Result<UploadOutcome> {
        // 非空闲任务原样保留，不触发观察者
        if job.status() != UploadStatus::Idle {
            return Err(UploadError::InvalidTransition {
                from: job.status(),
                to: UploadStatus::Uploading,
            });
        }

        let result = self.run(job, details, observer).await;
        self.settle(job, result, observer)
    }

    /// 在同一会话内重传未完成的分片，然后完成握手
    #[instrument(skip_all, fields(job = %job.id(), file = %job.file().name))]
    pub async fn resume(
        &self,
        job: &mut UploadJob,
        details: &VideoDetails,
        observer: &dyn UploadObserver,
    ) -> Result<UploadOutcome> {
        self.preflight(job.file(), details)?;

        let old = job.reopen()?;
        observer.on_state_change(old, UploadStatus::Uploading);
        info!(pending = job.pending_chunks().len(), "resuming upload");

        let result = match self.transfer(job, observer).await {
            Ok(()) => self.finish(job, details, observer).await,
            Err(err) => Err(err),
        };
        self.settle(job, result, observer)
    }

    async fn run(
        &self,
        job: &mut UploadJob,
        details: &VideoDetails,
        observer: &dyn UploadObserver,
    ) -> Result<UploadOutcome> {
        self.preflight(job.file(), details)?;

        let grant = self.initialize(job).await?;
        let old = job.bind_session(grant)?;
        observer.on_state_change(old, UploadStatus::Uploading);

        self.transfer(job, observer).await?;
        self.finish(job, details, observer).await
    }

    /// 发送任何请求前的本地检查
    fn preflight(&self, file: &VideoFile, details: &VideoDetails) -> Result<()> {
        self.validator.check(file)?;
        if details.title.trim().is_empty() {
            return Err(UploadError::validation("Please enter a video title"));
        }
        Ok(())
    }

    async fn initialize(&self, job: &UploadJob) -> Result<SessionGrant> {
        let request = SessionRequest {
            file_name: job.file().name.clone(),
            file_size: job.file().size,
            course_id: self.course_id.clone(),
        };

        let grant = self
            .sessions
            .init_session(&request)
            .await
            .map_err(|err| match err {
                UploadError::SessionInit(_) => err,
                other => UploadError::SessionInit(other.to_string()),
            })?;

        info!(
            upload_id = %grant.upload_id,
            total_chunks = job.chunks().len(),
            chunk_size = job.chunk_size(),
            "upload session initialized"
        );

        Ok(grant)
    }

    /// 严格按序号顺序传输所有未完成的分片
    async fn transfer(&self, job: &mut UploadJob, observer: &dyn UploadObserver) -> Result<()> {
        let grant = job
            .grant()
            .cloned()
            .ok_or_else(|| UploadError::SessionInit("No upload session bound".into()))?;
        let file = job.file().clone();
        let total_chunks = job.chunks().len();

        for index in job.pending_chunks() {
            let chunk = job.chunks()[index].clone();

            match self.send_chunk(&file, &grant, &chunk, total_chunks).await {
                Ok(()) => {
                    let progress = job.mark_uploaded(index)?;
                    debug!(
                        index,
                        total_chunks,
                        percentage = progress.percentage,
                        speed = progress.speed,
                        "chunk uploaded"
                    );
                    observer.on_progress(&progress);
                }
                Err(err) if self.config.resumable => {
                    warn!(index, error = %err, "chunk failed, skipping");
                    observer.on_chunk_failed(index, &err);
                }
                Err(err) => {
                    error!(index, error = %err, "chunk failed, aborting");
                    return Err(err);
                }
            }
        }

        let missing = job.pending_chunks();
        if !missing.is_empty() {
            return Err(UploadError::IncompleteUpload { missing });
        }

        Ok(())
    }

    async fn send_chunk(
        &self,
        file: &VideoFile,
        grant: &SessionGrant,
        chunk: &Chunk,
        total_chunks: usize,
    ) -> Result<()> {
        let path: &Path = &file.path;
        let file_name = file.name.as_str();
        let transport = self.transport.as_ref();

        retry_with_config(&self.retry, move || async move {
            let data = chunk.read_from(path).await?;
            let payload = ChunkPayload {
                file_name: file_name.to_string(),
                data,
                chunk_index: chunk.index,
                total_chunks,
            };
            transport.send_chunk(grant, payload).await
        })
        .await
        .map_err(|err| match err {
            UploadError::ChunkTransfer { .. } => err,
            other => UploadError::chunk_network(chunk.index, other.to_string()),
        })
    }

    async fn finish(
        &self,
        job: &mut UploadJob,
        details: &VideoDetails,
        observer: &dyn UploadObserver,
    ) -> Result<UploadOutcome> {
        let old = job.begin_processing()?;
        observer.on_state_change(old, UploadStatus::Processing);

        let upload_id = job.upload_id().unwrap_or_default().to_string();
        let request = CompletionRequest::new(&upload_id, &self.course_id, details);

        let response = self
            .processing
            .complete(&request)
            .await
            .map_err(|err| match err {
                UploadError::Completion(_) => err,
                other => UploadError::Completion(other.to_string()),
            })?;

        let old = job.complete()?;
        observer.on_state_change(old, UploadStatus::Completed);

        let video_url = response.video_url().map(String::from);
        info!(upload_id = %upload_id, video_url = ?video_url, "upload completed");

        Ok(UploadOutcome {
            upload_id,
            video_url,
            uploaded_bytes: job.tracker().uploaded_bytes(),
            elapsed: job.tracker().elapsed(),
        })
    }

    fn settle(
        &self,
        job: &mut UploadJob,
        result: Result<UploadOutcome>,
        observer: &dyn UploadObserver,
    ) -> Result<UploadOutcome> {
        match result {
            Ok(outcome) => {
                observer.on_success(outcome.video_url.as_deref());
                Ok(outcome)
            }
            Err(err) => {
                let message = err.user_message();
                error!(error = %err, "upload failed");

                if let Ok(old) = job.fail(message.clone()) {
                    observer.on_state_change(old, UploadStatus::Error);
                }
                observer.on_error(&message);

                Err(err)
            }
        }
    }
}
