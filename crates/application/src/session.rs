//! 会话校验端口。
//!
//! 会话的签发属于外部认证协作者，实时核心只消费这个契约：
//! 把不透明凭证换成已验证身份，或者拒绝。

use async_trait::async_trait;
use thiserror::Error;

use domain::Identity;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// 凭证无效或过期。终止性错误：连接被拒绝，不创建任何状态。
    #[error("unauthenticated")]
    Unauthenticated,
}

#[async_trait]
pub trait SessionValidator: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Identity, SessionError>;
}
