//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务：消息管道、打字中继、
//! 在线状态注册表、限流器，以及对外部协作者
//! （会话校验、消息持久化）的抽象。

pub mod clock;
pub mod error;
pub mod events;
pub mod presence;
pub mod rate_limiter;
pub mod services;
pub mod session;
pub mod store;

#[cfg(feature = "sqlx")]
pub mod pg_store;

pub use clock::{Clock, SystemClock};
pub use error::ApplicationError;
pub use events::{ClientEvent, OnlineUser, ServerEvent};
pub use presence::{PeerHandle, PresenceRegistry};
pub use rate_limiter::{RateCategory, RateLimitError, RateLimiter};
pub use services::{ChatService, ChatServiceDependencies};
pub use session::{SessionError, SessionValidator};
pub use store::{memory::MemoryMessageStore, MessageStore, StoreError};

#[cfg(feature = "sqlx")]
pub use pg_store::{create_pg_pool, PgMessageStore};
