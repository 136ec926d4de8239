use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use uuid::Uuid;
use super::errors::{Result, UploadError};

/// 本地任务标识，仅用于日志关联
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 用于嗅探媒体类型的文件头长度
const SNIFF_LEN: usize = 8192;

/// 待上传的视频文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    /// 媒体类型，例如 `video/mp4`
    pub media_type: Option<String>,
}

impl VideoFile {
    /// 打开文件并根据文件头识别媒体类型
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::validation(format!("Invalid file name: {}", path.display())))?
            .to_string();

        let size = tokio::fs::metadata(path).await?.len();

        let mut file = tokio::fs::File::open(path).await?;
        let mut header = vec![0u8; SNIFF_LEN.min(size as usize)];
        file.read_exact(&mut header).await?;
        let media_type = infer::get(&header).map(|kind| kind.mime_type().to_string());

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size,
            media_type,
        })
    }

    /// 直接构造，不访问文件系统
    pub fn new(path: impl Into<PathBuf>, size: u64, media_type: Option<&str>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path,
            name,
            size,
            media_type: media_type.map(String::from),
        }
    }

    /// 覆盖嗅探结果
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// 小写扩展名
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// 尚未开始
    Idle,
    /// 上传中
    Uploading,
    /// 服务端处理中（完成握手）
    Processing,
    /// 已完成
    Completed,
    /// 失败
    Error,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// 上传会话服务返回的凭据
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    pub upload_id: String,
    pub upload_url: String,
    pub upload_preset: String,
    pub cloud_name: String,
}

/// 上传进度
#[derive(Debug, Clone, PartialEq)]
pub struct UploadProgress {
    /// 已上传字节数
    pub uploaded_bytes: u64,
    /// 总字节数
    pub total_bytes: u64,
    /// 完成百分比 [0, 100]
    pub percentage: f64,
    /// 自任务开始以来的平均速度（字节/秒）
    pub speed: f64,
    /// 预计剩余时间，速度为 0 时未知
    pub remaining: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl FromStr for Difficulty {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(UploadError::validation(format!("Unknown difficulty: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl FromStr for Privacy {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "unlisted" => Ok(Self::Unlisted),
            "private" => Ok(Self::Private),
            other => Err(UploadError::validation(format!("Unknown privacy: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Quality {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "480p")]
    Sd480,
}

impl FromStr for Quality {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "1080p" => Ok(Self::Hd1080),
            "720p" => Ok(Self::Hd720),
            "480p" => Ok(Self::Sd480),
            other => Err(UploadError::validation(format!("Unknown quality: {}", other))),
        }
    }
}

/// 用户填写的视频信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
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

impl Default for VideoDetails {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            position: None,
            tags: Vec::new(),
            difficulty: Difficulty::Beginner,
            is_preview: false,
            enable_comments: true,
            enable_downloads: false,
            quality: Quality::Auto,
            format: None,
            enable_watermark: false,
            enable_subtitles: false,
            privacy: Privacy::Public,
        }
    }
}

/// 视频元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// 时长（秒）
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub size: u64,
    pub format: String,
    /// `data:image/jpeg;base64,...`
    pub thumbnail: Option<String>,
}

/// 上传结果
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub upload_id: String,
    pub video_url: Option<String>,
    pub uploaded_bytes: u64,
    pub elapsed: Duration,
}
