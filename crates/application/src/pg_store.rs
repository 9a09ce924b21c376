//! PostgreSQL 消息存储实现。
//!
//! id 由 BIGSERIAL 分配，单调递增；created_at 由数据库 now() 分配。
//! 两者共同构成消息的全局时序。

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use domain::{
    ChatMessage, ColorTag, DisplayName, Identity, MessageContent, MessageId, Timestamp,
};

use crate::store::{MessageStore, StoreError};

pub async fn create_pg_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_message(row: &sqlx::postgres::PgRow) -> Result<ChatMessage, StoreError> {
        let id: i64 = row
            .try_get("id")
            .map_err(|err| StoreError::persistence(err.to_string()))?;
        let display_name: String = row
            .try_get("display_name")
            .map_err(|err| StoreError::persistence(err.to_string()))?;
        let color: String = row
            .try_get("color")
            .map_err(|err| StoreError::persistence(err.to_string()))?;
        let content: String = row
            .try_get("content")
            .map_err(|err| StoreError::persistence(err.to_string()))?;
        let created_at: Timestamp = row
            .try_get("created_at")
            .map_err(|err| StoreError::persistence(err.to_string()))?;

        // 入库前已验证过；读回失败说明数据损坏，按持久化错误上报
        let display_name = DisplayName::parse(display_name)
            .map_err(|err| StoreError::persistence(format!("corrupt display_name: {err}")))?;
        let color = ColorTag::parse(color)
            .map_err(|err| StoreError::persistence(format!("corrupt color: {err}")))?;

        Ok(ChatMessage::new(
            MessageId::from(id),
            domain::AuthorSnapshot {
                display_name,
                color,
            },
            // 存储的内容已转义，读回时不再处理
            MessageContent::from_stored(content),
            created_at,
        ))
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn insert_message(
        &self,
        author: &Identity,
        content: &MessageContent,
    ) -> Result<ChatMessage, StoreError> {
        let row = sqlx::query(
            "INSERT INTO messages (author_id, display_name, color, content) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, created_at",
        )
        .bind(Uuid::from(author.id))
        .bind(author.display_name.as_str())
        .bind(author.color.as_str())
        .bind(content.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| StoreError::persistence(err.to_string()))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|err| StoreError::persistence(err.to_string()))?;
        let created_at: Timestamp = row
            .try_get("created_at")
            .map_err(|err| StoreError::persistence(err.to_string()))?;

        Ok(ChatMessage::new(
            MessageId::from(id),
            author.author_snapshot(),
            content.clone(),
            created_at,
        ))
    }

    async fn recent_messages(&self, limit: u32) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, display_name, color, content, created_at FROM messages \
             ORDER BY id DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|err| StoreError::persistence(err.to_string()))?;

        let mut messages = rows
            .iter()
            .map(Self::row_to_message)
            .collect::<Result<Vec<_>, _>>()?;
        // 查询按 id 倒序取最近 N 条，回放时旧消息在前
        messages.reverse();
        Ok(messages)
    }
}
