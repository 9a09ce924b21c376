use domain::DomainError;
use thiserror::Error;

use crate::rate_limiter::RateLimitError;
use crate::store::StoreError;

/// 消息管道的失败面。
///
/// 凭证问题在网关阶段就以 `SessionError` 终止，
/// 不会进入管道，因此这里没有对应的变体。
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 内容校验失败，本次提交被丢弃，连接保持存活。
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    /// 超出限流窗口，显式拒绝本次操作。
    #[error("rate limited: {0}")]
    RateLimited(#[from] RateLimitError),
    /// 持久化失败，消息整体丢弃，连接保持存活。
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ApplicationError {
    /// 回发给提交者的拒绝原因，用于 `message:rejected` 载荷。
    pub fn rejection_reason(&self) -> &'static str {
        match self {
            Self::Domain(_) => "invalid_content",
            Self::RateLimited(_) => "rate_limited",
            Self::Store(_) => "persistence_failure",
        }
    }
}
