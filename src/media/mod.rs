//! 视频元数据提取
//!
//! 缩略图生成失败只记录日志，不会导致整个提取失败。

mod ffprobe;

use std::time::Duration;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};
use crate::core::{Result, VideoFile, VideoMetadata};

pub use ffprobe::FfprobeProbe;

/// 解码器报告的基本信息
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// 读取时长、分辨率和容器格式
    async fn probe(&self, file: &VideoFile) -> Result<ProbeReport>;

    /// 在 `at` 处截取一帧，返回 JPEG 数据
    async fn thumbnail(&self, file: &VideoFile, at: Duration) -> Result<Vec<u8>>;
}

/// 截帧位置：一秒处，短视频取中点
fn thumbnail_offset(duration: f64) -> Duration {
    if duration > 2.0 {
        Duration::from_secs(1)
    } else {
        Duration::from_secs_f64((duration / 2.0).max(0.0))
    }
}

pub async fn extract_metadata(probe: &dyn MediaProbe, file: &VideoFile) -> Result<VideoMetadata> {
    let report = probe.probe(file).await?;
    debug!(file = %file.name, duration = report.duration, width = report.width, height = report.height, "probed video");

    let thumbnail = match probe.thumbnail(file, thumbnail_offset(report.duration)).await {
        Ok(jpeg) if !jpeg.is_empty() => Some(format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg))),
        Ok(_) => {
            warn!(file = %file.name, "thumbnail generation produced no data");
            None
        }
        Err(err) => {
            warn!(file = %file.name, error = %err, "thumbnail generation failed");
            None
        }
    };

    Ok(VideoMetadata {
        duration: report.duration,
        width: report.width,
        height: report.height,
        size: file.size,
        format: report.format,
        thumbnail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::UploadError;

    struct FakeProbe {
        probe_ok: bool,
        thumbnail_ok: bool,
    }

    #[async_trait]
    impl MediaProbe for FakeProbe {
        async fn probe(&self, _file: &VideoFile) -> Result<ProbeReport> {
            if !self.probe_ok {
                return Err(UploadError::metadata("moov atom not found"));
            }
            Ok(ProbeReport {
                duration: 93.5,
                width: 1280,
                height: 720,
                format: "mp4".into(),
            })
        }

        async fn thumbnail(&self, _file: &VideoFile, at: Duration) -> Result<Vec<u8>> {
            assert_eq!(at, Duration::from_secs(1));
            if self.thumbnail_ok {
                Ok(vec![0xFF, 0xD8, 0xFF])
            } else {
                Err(UploadError::metadata("no frame"))
            }
        }
    }

    fn file() -> VideoFile {
        VideoFile::new("/tmp/lecture.mp4", 4096, Some("video/mp4"))
    }

    #[tokio::test]
    async fn metadata_includes_thumbnail() {
        let probe = FakeProbe { probe_ok: true, thumbnail_ok: true };
        let metadata = extract_metadata(&probe, &file()).await.unwrap();

        assert_eq!(metadata.width, 1280);
        assert_eq!(metadata.size, 4096);
        assert_eq!(metadata.thumbnail.as_deref(), Some("data:image/jpeg;base64,/9j/"));
    }

    #[tokio::test]
    async fn thumbnail_failure_is_not_fatal() {
        let probe = FakeProbe { probe_ok: true, thumbnail_ok: false };
        let metadata = extract_metadata(&probe, &file()).await.unwrap();

        assert_eq!(metadata.duration, 93.5);
        assert_eq!(metadata.thumbnail, None);
    }

    #[tokio::test]
    async fn decode_failure_is_metadata_error() {
        let probe = FakeProbe { probe_ok: false, thumbnail_ok: true };
        let result = extract_metadata(&probe, &file()).await;

        assert!(matches!(result, Err(UploadError::Metadata(_))));
    }

    #[test]
    fn short_clips_use_midpoint() {
        assert_eq!(thumbnail_offset(60.0), Duration::from_secs(1));
        assert_eq!(thumbnail_offset(1.0), Duration::from_millis(500));
    }
}
