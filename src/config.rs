use std::fs;
use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use url::Url;
use crate::core::{Result, UploadError, DEFAULT_CHUNK_SIZE};
use crate::uploaders::ChunkedConfig;
use crate::validation::{FileValidator, DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_FILE_SIZE};

/// 单个分片允许配置的最大重试次数
pub const MAX_CHUNK_RETRIES: u32 = 10;

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_allowed_extensions() -> Vec<String> {
    DEFAULT_ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_true() -> bool {
    true
}

fn default_max_chunk_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    300
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub session_url: String,
    pub complete_url: String,
    pub course_id: String,
    pub token: Option<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    #[serde(default = "default_true")]
    pub resumable: bool,
    #[serde(default = "default_max_chunk_retries")]
    pub max_chunk_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .map_err(|e| UploadError::config(format!("Can't read {}: {}", path.display(), e)))?;
        Self::from_toml(&config_str)
    }

    pub fn from_toml(config_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(config_str)
            .map_err(|e| UploadError::config(format!("Can't parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("session_url", &self.session_url), ("complete_url", &self.complete_url)] {
            Url::parse(value).map_err(|e| UploadError::config(format!("Invalid {}: {}", name, e)))?;
        }

        if self.course_id.trim().is_empty() {
            return Err(UploadError::config("course_id must not be empty"));
        }
        if self.chunk_size == 0 {
            return Err(UploadError::config("chunk_size must be greater than 0"));
        }
        if self.max_chunk_retries > MAX_CHUNK_RETRIES {
            return Err(UploadError::config(format!(
                "max_chunk_retries must be at most {}",
                MAX_CHUNK_RETRIES
            )));
        }
        if self.timeout_secs == 0 {
            return Err(UploadError::config("timeout_secs must be greater than 0"));
        }
        if self.allowed_extensions.is_empty() {
            return Err(UploadError::config("allowed_extensions must not be empty"));
        }

        Ok(())
    }

    pub fn uploader_config(&self) -> ChunkedConfig {
        ChunkedConfig {
            chunk_size: self.chunk_size,
            resumable: self.resumable,
            max_chunk_retries: self.max_chunk_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn validator(&self) -> FileValidator {
        FileValidator::new(self.max_file_size, &self.allowed_extensions)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        session_url = "https://lms.example.com/api/upload/session"
        complete_url = "https://lms.example.com/api/videos/complete"
        course_id = "course-123"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();

        assert_eq!(config.token, None);
        assert_eq!(config.chunk_size, 5 * 1024 * 1024);
        assert!(config.resumable);
        assert_eq!(config.max_chunk_retries, 2);
        assert_eq!(config.timeout(), Duration::from_secs(300));
        assert!(config.allowed_extensions.contains(&"mp4".to_string()));

        let uploader = config.uploader_config();
        assert_eq!(uploader.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn overrides_are_applied() {
        let toml = format!(
            "{}\ntoken = \"abc\"\nchunk_size = 1024\nresumable = false\nallowed_extensions = [\"mp4\"]\n",
            MINIMAL
        );
        let config = Config::from_toml(&toml).unwrap();

        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.uploader_config().chunk_size, 1024);
        assert!(!config.uploader_config().resumable);
        assert_eq!(config.validator().max_file_size(), DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let toml = format!("{}\nchunk_size = 0\n", MINIMAL);
        assert!(matches!(Config::from_toml(&toml), Err(UploadError::Config(_))));
    }

    #[test]
    fn rejects_zero_timeout() {
        let toml = format!("{}\ntimeout_secs = 0\n", MINIMAL);
        assert!(matches!(Config::from_toml(&toml), Err(UploadError::Config(_))));
    }

    #[test]
    fn bounds_chunk_retries() {
        let toml = format!("{}\nmax_chunk_retries = 4294967295\n", MINIMAL);
        assert!(matches!(Config::from_toml(&toml), Err(UploadError::Config(_))));

        let toml = format!("{}\nmax_chunk_retries = {}\n", MINIMAL, MAX_CHUNK_RETRIES);
        assert_eq!(Config::from_toml(&toml).unwrap().max_chunk_retries, MAX_CHUNK_RETRIES);
    }

    #[test]
    fn rejects_bad_url() {
        let toml = MINIMAL.replace("https://lms.example.com/api/upload/session", "nope");
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, MINIMAL).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.course_id, "course-123");

        assert!(Config::load(dir.path().join("missing.toml")).is_err());
    }
}
