//! 消息持久化端口。
//!
//! 持久化引擎本身是外部协作者，这里只定义核心消费的契约：
//! 追加一条消息并取回存储分配的 id 与时间戳，以及读取
//! 一个有界的最近历史窗口。

use async_trait::async_trait;
use thiserror::Error;

use domain::{ChatMessage, Identity, MessageContent};

#[derive(Debug, Error)]
pub enum StoreError {
    /// 持久化失败。消息整体丢弃，不重试，连接保持存活。
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl StoreError {
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// 持久化一条消息，由存储分配单调递增的 id 和时间戳。
    async fn insert_message(
        &self,
        author: &Identity,
        content: &MessageContent,
    ) -> Result<ChatMessage, StoreError>;

    /// 最近的消息窗口，旧消息在前。只在连接建立时调用一次。
    async fn recent_messages(&self, limit: u32) -> Result<Vec<ChatMessage>, StoreError>;
}

/// 内存实现（用于开发和测试）。
pub mod memory {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    use domain::MessageId;

    use crate::clock::{Clock, SystemClock};

    pub struct MemoryMessageStore {
        clock: Arc<dyn Clock>,
        next_id: AtomicI64,
        messages: Mutex<Vec<ChatMessage>>,
        fail_writes: AtomicBool,
    }

    impl Default for MemoryMessageStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MemoryMessageStore {
        pub fn new() -> Self {
            Self::with_clock(Arc::new(SystemClock))
        }

        pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
            Self {
                clock,
                next_id: AtomicI64::new(1),
                messages: Mutex::new(Vec::new()),
                fail_writes: AtomicBool::new(false),
            }
        }

        /// 测试开关：让后续写入失败，模拟持久化故障。
        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        pub async fn message_count(&self) -> usize {
            self.messages.lock().await.len()
        }

        pub async fn all_messages(&self) -> Vec<ChatMessage> {
            self.messages.lock().await.clone()
        }
    }

    #[async_trait]
    impl MessageStore for MemoryMessageStore {
        async fn insert_message(
            &self,
            author: &Identity,
            content: &MessageContent,
        ) -> Result<ChatMessage, StoreError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::persistence("simulated write failure"));
            }

            let mut messages = self.messages.lock().await;
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let message = ChatMessage::new(
                MessageId::from(id),
                author.author_snapshot(),
                content.clone(),
                self.clock.now(),
            );
            messages.push(message.clone());
            Ok(message)
        }

        async fn recent_messages(&self, limit: u32) -> Result<Vec<ChatMessage>, StoreError> {
            let messages = self.messages.lock().await;
            let start = messages.len().saturating_sub(limit as usize);
            Ok(messages[start..].to_vec())
        }
    }
}
