use serde::{Deserialize, Serialize};

use crate::value_objects::{ColorTag, DisplayName, MessageContent, MessageId, Timestamp};

/// 发送时刻的作者快照。
///
/// 显示名和颜色在消息创建时固化，之后身份变更不影响已有消息。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSnapshot {
    pub display_name: DisplayName,
    pub color: ColorTag,
}

/// 聊天消息。
///
/// 只能由消息管道成功完成时创建；`id` 与 `created_at`
/// 由持久化存储分配，构成消息的全局时序。创建之后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub author: AuthorSnapshot,
    pub content: MessageContent,
    pub created_at: Timestamp,
}

impl ChatMessage {
    pub fn new(
        id: MessageId,
        author: AuthorSnapshot,
        content: MessageContent,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            author,
            content,
            created_at,
        }
    }
}
