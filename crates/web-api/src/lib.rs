//! Web API 层。
//!
//! 提供 Axum 路由，把 WebSocket 握手与事件委托给应用层的
//! 用例服务；同时承载 JWT 会话校验的具体实现。

mod auth;
mod error;
mod routes;
mod state;
mod ws_connection;

pub use auth::{Claims, JwtService};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
