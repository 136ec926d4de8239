use std::time::{Duration, Instant};
use crate::core::UploadProgress;

/// 进度跟踪器
///
/// 速度按任务开始以来的平均值计算，每个分片完成后重新计算。
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    /// 总字节数
    total_bytes: u64,
    /// 已传输字节数
    uploaded_bytes: u64,
    /// 开始时间
    start_time: Instant,
}

impl ProgressTracker {
    pub fn new(total_bytes: u64) -> Self {
        Self::starting_at(total_bytes, Instant::now())
    }

    pub fn starting_at(total_bytes: u64, start_time: Instant) -> Self {
        Self {
            total_bytes,
            uploaded_bytes: 0,
            start_time,
        }
    }

    /// 增加传输字节数
    pub fn add_bytes(&mut self, bytes: u64) {
        self.uploaded_bytes = self.uploaded_bytes.saturating_add(bytes).min(self.total_bytes);
    }

    /// 重新计时，已传输字节数不变
    pub fn restart(&mut self) {
        self.start_time = Instant::now();
    }

    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// 获取运行时间
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> UploadProgress {
        self.snapshot_at(Instant::now())
    }

    /// 以 `now` 为当前时间计算进度
    pub fn snapshot_at(&self, now: Instant) -> UploadProgress {
        let elapsed = now.saturating_duration_since(self.start_time).as_secs_f64();
        let speed = if elapsed > 0.0 {
            self.uploaded_bytes as f64 / elapsed
        } else {
            0.0
        };

        let remaining_bytes = self.total_bytes.saturating_sub(self.uploaded_bytes);
        let remaining = if remaining_bytes == 0 {
            Some(Duration::ZERO)
        } else if speed > 0.0 {
            Some(Duration::from_secs_f64(remaining_bytes as f64 / speed))
        } else {
            None
        };

        UploadProgress {
            uploaded_bytes: self.uploaded_bytes,
            total_bytes: self.total_bytes,
            percentage: percentage(self.uploaded_bytes, self.total_bytes),
            speed,
            remaining,
        }
    }
}

/// `uploaded / total * 100`，限制在 [0, 100]
pub fn percentage(uploaded: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }

    ((uploaded as f64 / total as f64) * 100.0).clamp(0.0, 100.0)
}

/// 格式化字节数
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const UNIT_SIZE: f64 = 1024.0;

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= UNIT_SIZE && unit_index < UNITS.len() - 1 {
        size /= UNIT_SIZE;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// 格式化速度
pub fn format_speed(bytes_per_second: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_second as u64))
}

/// 格式化剩余时间，未知时显示 `--`
pub fn format_duration(duration: Option<Duration>) -> String {
    let Some(duration) = duration else {
        return "--".to_string();
    };

    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_and_remaining_since_start() {
        let start = Instant::now();
        let mut tracker = ProgressTracker::starting_at(1000, start);
        tracker.add_bytes(250);

        let progress = tracker.snapshot_at(start + Duration::from_secs(5));
        assert_eq!(progress.uploaded_bytes, 250);
        assert_eq!(progress.percentage, 25.0);
        assert_eq!(progress.speed, 50.0);
        assert_eq!(progress.remaining, Some(Duration::from_secs(15)));
    }

    #[test]
    fn zero_speed_has_unknown_remaining() {
        let start = Instant::now();
        let tracker = ProgressTracker::starting_at(1000, start);

        let progress = tracker.snapshot_at(start);
        assert_eq!(progress.speed, 0.0);
        assert_eq!(progress.remaining, None);
        assert_eq!(progress.percentage, 0.0);
    }

    #[test]
    fn bytes_never_exceed_total() {
        let mut tracker = ProgressTracker::new(100);
        tracker.add_bytes(80);
        tracker.add_bytes(80);

        let progress = tracker.snapshot();
        assert_eq!(progress.uploaded_bytes, 100);
        assert_eq!(progress.percentage, 100.0);
        assert_eq!(progress.remaining, Some(Duration::ZERO));
    }

    #[test]
    fn percentage_is_clamped() {
        assert_eq!(percentage(0, 10), 0.0);
        assert_eq!(percentage(15, 10), 100.0);
        assert_eq!(percentage(0, 0), 100.0);
    }

    #[test]
    fn formatting() {
        assert_eq!(format_bytes(512), "512.00 B");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_speed(2048.0), "2.00 KB/s");
        assert_eq!(format_duration(Some(Duration::from_secs(3725))), "1h 2m 5s");
        assert_eq!(format_duration(Some(Duration::from_secs(65))), "1m 5s");
        assert_eq!(format_duration(None), "--");
    }
}
