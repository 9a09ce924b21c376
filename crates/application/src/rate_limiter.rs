//! 按（键，类别）计数的固定窗口限流器。
//!
//! 两个配置类别：`auth`（认证尝试，15 分钟窗口）和 `message`
//! （消息发送，1 秒窗口）。超出窗口上限对两个类别都是显式拒绝，
//! 直到窗口滚动为止。计数器状态只在内存中，从不持久化。

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use config::ChatConfig;

/// 限流类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateCategory {
    /// 认证尝试，代外部认证协作者执行。
    Auth,
    /// 消息发送，在消息管道内执行。
    Message,
}

impl fmt::Display for RateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateCategory::Auth => f.write_str("auth"),
            RateCategory::Message => f.write_str("message"),
        }
    }
}

/// 限流错误类型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("{category} rate limit exceeded: max {max} per window")]
    Exceeded { category: RateCategory, max: u32 },
}

#[derive(Debug, Clone)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

struct CategoryPolicy {
    max: u32,
    window: Duration,
}

pub struct RateLimiter {
    auth: CategoryPolicy,
    message: CategoryPolicy,
    counters: RwLock<HashMap<(String, RateCategory), WindowState>>,
}

impl RateLimiter {
    pub fn new(
        auth_limit: u32,
        auth_window: Duration,
        message_limit: u32,
        message_window: Duration,
    ) -> Self {
        Self {
            auth: CategoryPolicy {
                max: auth_limit,
                window: auth_window,
            },
            message: CategoryPolicy {
                max: message_limit,
                window: message_window,
            },
            counters: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(chat: &ChatConfig) -> Self {
        Self::new(
            chat.auth_limit_per_window,
            Duration::from_secs(chat.auth_window_secs),
            chat.message_limit_per_window,
            Duration::from_secs(chat.message_window_secs),
        )
    }

    /// 检查并记录一次动作。
    ///
    /// 窗口内未超限则计数加一并放行；已超限则显式拒绝，
    /// 不再累加，直到窗口滚动。
    pub fn check(&self, key: &str, category: RateCategory) -> Result<(), RateLimitError> {
        let policy = self.policy(category);
        let now = Instant::now();

        let mut counters = self
            .counters
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let state = counters
            .entry((key.to_owned(), category))
            .or_insert_with(|| WindowState {
                count: 0,
                window_start: now,
            });

        if now.duration_since(state.window_start) >= policy.window {
            state.count = 0;
            state.window_start = now;
        }

        if state.count >= policy.max {
            return Err(RateLimitError::Exceeded {
                category,
                max: policy.max,
            });
        }

        state.count += 1;
        Ok(())
    }

    /// 当前窗口内已记录的动作数（状态查询用）。
    pub fn current_count(&self, key: &str, category: RateCategory) -> u32 {
        self.counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(key.to_owned(), category))
            .map(|state| state.count)
            .unwrap_or(0)
    }

    /// 计数器当前跟踪的键数。
    pub fn tracked_keys(&self) -> usize {
        self.counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// 清理过期的窗口记录（防止内存泄漏）。
    ///
    /// 只保留不超过两个窗口的记录，需要周期性调用；
    /// 认证类的键来自出示的凭证字符串，不清理会无限增长。
    pub fn cleanup_expired(&self) {
        let mut counters = self
            .counters
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        counters.retain(|(_, category), state| {
            let window = self.policy(*category).window;
            now.duration_since(state.window_start) < window * 2
        });
    }

    fn policy(&self, category: RateCategory) -> &CategoryPolicy {
        match category {
            RateCategory::Auth => &self.auth,
            RateCategory::Message => &self.message,
        }
    }
}
