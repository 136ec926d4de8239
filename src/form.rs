use crate::core::{Difficulty, Privacy, Quality, Result, UploadError, VideoDetails, VideoFile};

/// 上传表单状态
///
/// 只校验标题和文件两个必填项，其他字段使用默认值。
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    file: Option<VideoFile>,
    details: VideoDetails,
    locked: bool,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self) -> Option<&VideoFile> {
        self.file.as_ref()
    }

    pub fn details(&self) -> &VideoDetails {
        &self.details
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            return Err(UploadError::FormLocked);
        }
        Ok(())
    }

    pub fn set_file(&mut self, file: VideoFile) -> Result<()> {
        self.ensure_unlocked()?;
        self.file = Some(file);
        Ok(())
    }

    pub fn clear_file(&mut self) -> Result<()> {
        self.ensure_unlocked()?;
        self.file = None;
        Ok(())
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        self.ensure_unlocked()?;
        self.details.title = title.into();
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<()> {
        self.ensure_unlocked()?;
        self.details.description = description.into();
        Ok(())
    }

    pub fn set_position(&mut self, position: Option<u32>) -> Result<()> {
        self.ensure_unlocked()?;
        self.details.position = position;
        Ok(())
    }

    /// 逗号分隔，去掉空白和空项
    pub fn set_tags_from_str(&mut self, tags: &str) -> Result<()> {
        self.ensure_unlocked()?;
        self.details.tags = tags
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(String::from)
            .collect();
        Ok(())
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> Result<()> {
        self.ensure_unlocked()?;
        self.details.difficulty = difficulty;
        Ok(())
    }

    pub fn set_privacy(&mut self, privacy: Privacy) -> Result<()> {
        self.ensure_unlocked()?;
        self.details.privacy = privacy;
        Ok(())
    }

    pub fn set_quality(&mut self, quality: Quality) -> Result<()> {
        self.ensure_unlocked()?;
        self.details.quality = quality;
        Ok(())
    }

    /// 直接修改其余开关
    pub fn update(&mut self, f: impl FnOnce(&mut VideoDetails)) -> Result<()> {
        self.ensure_unlocked()?;
        f(&mut self.details);
        Ok(())
    }

    /// 检查必填项
    pub fn ready(&self) -> Result<(&VideoFile, &VideoDetails)> {
        if self.details.title.trim().is_empty() {
            return Err(UploadError::validation("Please enter a video title"));
        }

        let file = self
            .file
            .as_ref()
            .ok_or_else(|| UploadError::validation("Please select a video file"))?;

        Ok((file, &self.details))
    }

    /// 上传开始，锁定表单
    pub fn lock(&mut self) -> Result<(VideoFile, VideoDetails)> {
        let (file, details) = self.ready()?;
        let snapshot = (file.clone(), details.clone());
        self.locked = true;
        Ok(snapshot)
    }

    /// 上传失败后解锁，保留已填内容
    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// 上传成功后重置
    pub fn finish(&mut self) {
        self.reset();
    }

    pub fn cancel(&mut self) {
        self.reset();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> VideoFile {
        VideoFile::new("/tmp/intro.mp4", 100, Some("video/mp4"))
    }

    #[test]
    fn requires_title_and_file() {
        let mut form = UploadForm::new();
        assert!(matches!(form.ready(), Err(UploadError::Validation(_))));

        form.set_title("   ").unwrap();
        form.set_file(file()).unwrap();
        assert!(form.ready().is_err());

        form.set_title("Intro").unwrap();
        let (f, details) = form.ready().unwrap();
        assert_eq!(f.name, "intro.mp4");
        assert_eq!(details.difficulty, Difficulty::Beginner);
        assert_eq!(details.privacy, Privacy::Public);
        assert_eq!(details.quality, Quality::Auto);
    }

    #[test]
    fn missing_file_is_rejected() {
        let mut form = UploadForm::new();
        form.set_title("Intro").unwrap();
        assert!(form.ready().is_err());
    }

    #[test]
    fn tags_are_split_and_trimmed() {
        let mut form = UploadForm::new();
        form.set_tags_from_str(" rust, async ,, tokio ,").unwrap();
        assert_eq!(form.details().tags, vec!["rust", "async", "tokio"]);
    }

    #[test]
    fn locked_form_rejects_edits() {
        let mut form = UploadForm::new();
        form.set_title("Intro").unwrap();
        form.set_file(file()).unwrap();
        form.lock().unwrap();

        assert!(matches!(form.set_title("Other"), Err(UploadError::FormLocked)));
        assert!(matches!(form.clear_file(), Err(UploadError::FormLocked)));

        form.unlock();
        form.set_title("Other").unwrap();
        assert_eq!(form.details().title, "Other");
    }

    #[test]
    fn finish_and_cancel_reset_to_defaults() {
        let mut form = UploadForm::new();
        form.set_title("Intro").unwrap();
        form.set_file(file()).unwrap();
        form.set_difficulty(Difficulty::Advanced).unwrap();
        form.update(|d| d.enable_downloads = true).unwrap();
        form.lock().unwrap();

        form.finish();
        assert!(!form.is_locked());
        assert!(form.file().is_none());
        assert_eq!(form.details(), &VideoDetails::default());

        form.set_title("Again").unwrap();
        form.cancel();
        assert_eq!(form.details().title, "");
    }
}
