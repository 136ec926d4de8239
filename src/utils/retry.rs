use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;
use crate::core::{Result, UploadError};

/// 重试策略
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// 固定延迟
    Fixed(Duration),
    /// 指数退避
    Exponential {
        initial: Duration,
        multiplier: f64,
        max_delay: Duration,
    },
}

impl RetryStrategy {
    /// 计算第 n 次重试的延迟
    pub fn get_delay(&self, attempt: u32) -> Duration {
        match self {
            RetryStrategy::Fixed(delay) => *delay,
            RetryStrategy::Exponential { initial, multiplier, max_delay } => {
                let delay = initial.as_secs_f64() * multiplier.powf(attempt as f64);
                let delay = Duration::from_secs_f64(delay.min(max_delay.as_secs_f64()));
                std::cmp::min(delay, *max_delay)
            }
        }
    }
}

/// 重试配置
pub struct RetryConfig {
    /// 最大尝试次数（含第一次）
    pub max_attempts: u32,
    /// 重试策略
    pub strategy: RetryStrategy,
    /// 是否重试的判断函数
    pub should_retry: Box<dyn Fn(&UploadError) -> bool + Send + Sync>,
}

impl RetryConfig {
    /// `retries` 为失败后的额外尝试次数
    pub fn with_retries(retries: u32, strategy: RetryStrategy) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            strategy,
            ..Default::default()
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            strategy: RetryStrategy::Exponential {
                initial: Duration::from_secs(1),
                multiplier: 2.0,
                max_delay: Duration::from_secs(60),
            },
            should_retry: Box::new(UploadError::is_retryable),
        }
    }
}

impl std::fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// 执行带重试的操作，返回最后一次的错误
pub async fn retry_with_config<F, Fut, T>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                attempt += 1;

                if attempt >= max_attempts || !(config.should_retry)(&error) {
                    return Err(error);
                }

                let delay = config.strategy.get_delay(attempt - 1);
                debug!(attempt, ?delay, %error, "retrying");
                sleep(delay).await;
            }
        }
    }
}
