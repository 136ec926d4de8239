pub mod progress;
pub mod retry;

pub use progress::{ProgressTracker, percentage, format_bytes, format_speed, format_duration};
pub use retry::{retry_with_config, RetryConfig, RetryStrategy};
