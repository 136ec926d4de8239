use std::process::Stdio;
use std::time::Duration;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;
use crate::core::{Result, UploadError, VideoFile};
use super::{MediaProbe, ProbeReport};

const FFPROBE_COMMAND: &str = "ffprobe";
const FFMPEG_COMMAND: &str = "ffmpeg";

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    /// ffprobe 以字符串输出时长
    duration: Option<String>,
    format_name: Option<String>,
}

/// 通过 ffprobe / ffmpeg 命令行读取视频信息
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe: String,
    ffmpeg: String,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self {
            ffprobe: FFPROBE_COMMAND.to_string(),
            ffmpeg: FFMPEG_COMMAND.to_string(),
        }
    }
}

impl FfprobeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commands(ffprobe: impl Into<String>, ffmpeg: impl Into<String>) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            ffmpeg: ffmpeg.into(),
        }
    }

    fn parse_output(stdout: &[u8]) -> Result<ProbeReport> {
        let output: FfprobeOutput = serde_json::from_slice(stdout)
            .map_err(|e| UploadError::metadata(format!("Invalid ffprobe output: {}", e)))?;

        let stream = output
            .streams
            .iter()
            .find(|s| s.width.is_some() && s.height.is_some())
            .ok_or_else(|| UploadError::metadata("No video stream found"))?;

        let format = output
            .format
            .ok_or_else(|| UploadError::metadata("No format section in ffprobe output"))?;

        let duration = format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        // "mov,mp4,m4a,3gp,3g2,mj2" -> "mov"
        let format_name = format
            .format_name
            .as_deref()
            .and_then(|name| name.split(',').next())
            .unwrap_or("unknown")
            .to_string();

        Ok(ProbeReport {
            duration,
            width: stream.width.unwrap_or(0),
            height: stream.height.unwrap_or(0),
            format: format_name,
        })
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe(&self, file: &VideoFile) -> Result<ProbeReport> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v", "error",
                "-select_streams", "v:0",
                "-show_entries", "stream=width,height:format=duration,format_name",
                "-of", "json",
            ])
            .arg(&file.path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| UploadError::metadata(format!("Failed to run {}: {}", self.ffprobe, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(UploadError::metadata(format!("ffprobe failed: {}", stderr.trim())));
        }

        Self::parse_output(&output.stdout)
    }

    async fn thumbnail(&self, file: &VideoFile, at: Duration) -> Result<Vec<u8>> {
        debug!(file = %file.name, at = at.as_secs_f64(), "rendering thumbnail");

        let output = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-ss"])
            .arg(format!("{:.3}", at.as_secs_f64()))
            .arg("-i")
            .arg(&file.path)
            .args(["-frames:v", "1", "-f", "image2", "-vcodec", "mjpeg", "pipe:1"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| UploadError::metadata(format!("Failed to run {}: {}", self.ffmpeg, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(UploadError::metadata(format!("ffmpeg failed: {}", stderr.trim())));
        }

        Ok(output.stdout)
    }
}
