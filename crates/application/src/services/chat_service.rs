use std::sync::Arc;

use domain::{ChatMessage, Identity, MessageContent};

use crate::{
    error::ApplicationError,
    events::ServerEvent,
    presence::PresenceRegistry,
    rate_limiter::{RateCategory, RateLimiter},
    store::MessageStore,
};

pub struct ChatServiceDependencies {
    pub store: Arc<dyn MessageStore>,
    pub presence: Arc<PresenceRegistry>,
    pub rate_limiter: Arc<RateLimiter>,
    /// 消息正文最大字符数（按原始输入计）。
    pub max_content_chars: usize,
}

/// 聊天用例服务：消息管道与打字中继。
pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    /// 消息管道，严格按序执行：
    /// 限流 → 校验+转义 → 持久化 → 广播。
    ///
    /// 任何一步失败都只丢弃本次提交，不影响所属连接；
    /// 持久化是唯一可能长时间挂起的步骤，失败时记录日志、
    /// 不重试、不广播。持久化成功即决定送达——广播面向
    /// 当时的在线快照，包括发送者自己。
    pub async fn submit_message(
        &self,
        sender: &Identity,
        raw_content: String,
    ) -> Result<ChatMessage, ApplicationError> {
        self.deps
            .rate_limiter
            .check(&sender.id.to_string(), RateCategory::Message)?;

        // 校验与转义共用同一入口，转义对原始输入恰好一次
        let content =
            MessageContent::parse_with_limit(raw_content, self.deps.max_content_chars)?;

        let message = self
            .deps
            .store
            .insert_message(sender, &content)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, user_id = %sender.id, "消息持久化失败，已丢弃");
                err
            })?;

        self.deps
            .presence
            .broadcast(ServerEvent::message_new(&message))
            .await;

        tracing::debug!(message_id = %message.id, user_id = %sender.id, "消息已广播");
        Ok(message)
    }

    /// 打字状态中继：发给除发送者外的所有连接，不持久化，
    /// 最后状态生效。
    pub async fn update_typing(&self, sender: &Identity, typing: bool) {
        let event = ServerEvent::TypingUpdate {
            display_name: sender.display_name.to_string(),
            typing,
        };
        self.deps.presence.broadcast_except(sender.id, event).await;
    }

    /// 连接建立时回放的有界历史窗口，旧消息在前。
    pub async fn recent_history(&self, limit: u32) -> Result<Vec<ChatMessage>, ApplicationError> {
        Ok(self.deps.store.recent_messages(limit).await?)
    }
}
