use tokio::sync::mpsc;
use crate::core::{UploadObserver, UploadProgress, UploadStatus};

/// 上传事件
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// 状态变更
    StateChanged {
        old_state: UploadStatus,
        new_state: UploadStatus,
    },
    /// 进度更新
    Progress(UploadProgress),
    /// 分片失败并被跳过
    ChunkSkipped {
        index: usize,
        error: String,
    },
    /// 任务完成
    Completed {
        video_url: Option<String>,
    },
    /// 任务失败
    Failed {
        error: String,
    },
}

/// 把回调转成事件发送到 channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<UploadEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UploadEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: UploadEvent) {
        // 接收端已关闭时丢弃
        let _ = self.sender.send(event);
    }
}

impl UploadObserver for ChannelObserver {
    fn on_progress(&self, progress: &UploadProgress) {
        self.send(UploadEvent::Progress(progress.clone()));
    }

    fn on_state_change(&self, old_state: UploadStatus, new_state: UploadStatus) {
        self.send(UploadEvent::StateChanged { old_state, new_state });
    }

    fn on_chunk_failed(&self, index: usize, error: &crate::core::UploadError) {
        self.send(UploadEvent::ChunkSkipped {
            index,
            error: error.to_string(),
        });
    }

    fn on_success(&self, video_url: Option<&str>) {
        self.send(UploadEvent::Completed {
            video_url: video_url.map(String::from),
        });
    }

    fn on_error(&self, message: &str) {
        self.send(UploadEvent::Failed {
            error: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_callbacks_as_events() {
        let (observer, mut events) = ChannelObserver::new();

        observer.on_state_change(UploadStatus::Idle, UploadStatus::Uploading);
        observer.on_success(Some("https://cdn.example.com/v.mp4"));
        drop(observer);

        assert_eq!(
            events.recv().await,
            Some(UploadEvent::StateChanged {
                old_state: UploadStatus::Idle,
                new_state: UploadStatus::Uploading,
            })
        );
        assert_eq!(
            events.recv().await,
            Some(UploadEvent::Completed {
                video_url: Some("https://cdn.example.com/v.mp4".into()),
            })
        );
        assert_eq!(events.recv().await, None);
    }

    #[test]
    fn closed_receiver_is_ignored() {
        let (observer, events) = ChannelObserver::new();
        drop(events);
        observer.on_error("boom");
    }
}
