use std::collections::BTreeSet;
use crate::core::{Result, UploadError, VideoFile};

/// 默认最大文件大小 2 GiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "m4v"];

const MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Pass,
    Fail(String),
}

impl ValidationResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// 文件校验器，没有任何副作用
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
    allowed_extensions: BTreeSet<String>,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE, DEFAULT_ALLOWED_EXTENSIONS.iter().copied())
    }
}

impl FileValidator {
    pub fn new<I, S>(max_file_size: u64, allowed_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_extensions = allowed_extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
            .collect();

        Self {
            max_file_size,
            allowed_extensions,
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn validate(&self, file: &VideoFile) -> ValidationResult {
        if file.size > self.max_file_size {
            return ValidationResult::Fail(format!(
                "File size ({:.2} MB) exceeds maximum allowed size ({:.2} MB)",
                file.size as f64 / MB,
                self.max_file_size as f64 / MB,
            ));
        }

        let allowed = file
            .extension()
            .map(|ext| self.allowed_extensions.contains(&ext))
            .unwrap_or(false);
        if !allowed {
            let list: Vec<&str> = self.allowed_extensions.iter().map(String::as_str).collect();
            return ValidationResult::Fail(format!(
                "File type not supported. Allowed types: {}",
                list.join(", ")
            ));
        }

        let is_video = file
            .media_type
            .as_deref()
            .map(|mime| mime.to_lowercase().starts_with("video/"))
            .unwrap_or(false);
        if !is_video {
            return ValidationResult::Fail("Please select a valid video file".to_string());
        }

        ValidationResult::Pass
    }

    /// 同 `validate`，失败时转成 `UploadError::Validation`
    pub fn check(&self, file: &VideoFile) -> Result<()> {
        match self.validate(file) {
            ValidationResult::Pass => Ok(()),
            ValidationResult::Fail(reason) => Err(UploadError::Validation(reason)),
        }
    }
}
