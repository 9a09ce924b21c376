//! 持久连接上的逻辑事件面。
//!
//! 载荷形状与传输层无关：入站事件由客户端提交，
//! 出站事件按在线快照扇出。全部采用 `type` 字段内联标签。

use serde::{Deserialize, Serialize};

use domain::{ChatMessage, Timestamp};

/// 客户端 → 服务端事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "message:send")]
    MessageSend { content: String },
    #[serde(rename = "typing:start")]
    TypingStart,
    #[serde(rename = "typing:stop")]
    TypingStop,
}

/// `users:online` 快照里的一项。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUser {
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub color: String,
}

/// 服务端 → 客户端事件。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// 新消息，广播到在线快照中的每个连接（包括发送者）。
    #[serde(rename = "message:new", rename_all = "camelCase")]
    MessageNew {
        id: i64,
        display_name: String,
        color: String,
        content: String,
        #[serde(with = "time::serde::rfc3339")]
        created_at: Timestamp,
    },
    /// 提交成功的逐条确认，只发给发送者。
    #[serde(rename = "message:ack")]
    MessageAck { id: i64 },
    /// 提交被拒绝（限流、校验失败、持久化失败），只发给发送者。
    #[serde(rename = "message:rejected")]
    MessageRejected { reason: String },
    /// 完整在线集合快照，不做增量 diff。
    #[serde(rename = "users:online")]
    UsersOnline { users: Vec<OnlineUser> },
    /// 打字状态，发给除发送者外的所有连接。
    #[serde(rename = "typing:update", rename_all = "camelCase")]
    TypingUpdate { display_name: String, typing: bool },
}

impl ServerEvent {
    pub fn message_new(message: &ChatMessage) -> Self {
        Self::MessageNew {
            id: message.id.into(),
            display_name: message.author.display_name.to_string(),
            color: message.author.color.to_string(),
            content: message.content.to_string(),
            created_at: message.created_at,
        }
    }
}
