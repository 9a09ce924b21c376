use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use application::{OnlineUser, RateCategory};

use crate::{error::ApiError, state::AppState, ws_connection::ChatConnection};

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(websocket_upgrade))
        .route("/online", get(online_users))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// 当前在线集合快照（只读）。
async fn online_users(State(state): State<AppState>) -> Json<Vec<OnlineUser>> {
    Json(state.presence.snapshot().await)
}

/// 连接网关入口：认证限流 → 会话校验 → 升级为 WebSocket。
///
/// 凭证无效时立即终止，不重试，也不创建任何在线表项。
async fn websocket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let token = query.token.unwrap_or_default();
    if token.is_empty() {
        tracing::warn!("WebSocket upgrade rejected: empty token");
        return Err(ApiError::unauthorized("missing session credential"));
    }

    // 认证类限流按出示的凭证计数，反复的无效握手会被显式拒绝
    state.rate_limiter.check(&token, RateCategory::Auth)?;

    let identity = match state.session_validator.verify(&token).await {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(error = %err, "WebSocket upgrade rejected: invalid credential");
            return Err(err.into());
        }
    };

    Ok(ws.on_upgrade(move |socket| ChatConnection::new(state, identity).run(socket)))
}
