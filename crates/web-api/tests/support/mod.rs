//! 集成测试支撑：在随机端口上拉起一个使用内存存储的完整服务。
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use application::{
    ChatService, ChatServiceDependencies, MemoryMessageStore, PresenceRegistry, RateLimiter,
    SessionValidator,
};
use config::{ChatConfig, JwtConfig};
use domain::{ColorTag, DisplayName, Identity, UserId};
use web_api::{router, AppState, JwtService};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub jwt: JwtService,
    pub store: Arc<MemoryMessageStore>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn http_base(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://{}/api/v1/ws?token={}", self.addr, token)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// 测试用聊天配置：窗口拉长，测试过程中不会滚动
pub fn test_chat_config() -> ChatConfig {
    ChatConfig {
        message_limit_per_window: 5,
        message_window_secs: 60,
        auth_limit_per_window: 100,
        auth_window_secs: 900,
        max_content_chars: 2000,
        heartbeat_secs: 60,
        history_limit: 50,
    }
}

pub async fn spawn_server() -> TestServer {
    spawn_server_with(test_chat_config()).await
}

pub async fn spawn_server_with(chat: ChatConfig) -> TestServer {
    let store = Arc::new(MemoryMessageStore::new());
    let presence = Arc::new(PresenceRegistry::new());
    let rate_limiter = Arc::new(RateLimiter::from_config(&chat));
    let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
        store: store.clone(),
        presence: presence.clone(),
        rate_limiter: rate_limiter.clone(),
        max_content_chars: chat.max_content_chars,
    }));

    let jwt = JwtService::new(&JwtConfig {
        secret: "integration-test-secret-key-32-chars!!".to_string(),
    });
    let session_validator: Arc<dyn SessionValidator> = Arc::new(jwt.clone());

    let state = AppState::new(chat_service, presence, rate_limiter, session_validator, chat);
    let router = router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    TestServer {
        addr,
        jwt,
        store,
        shutdown: Some(shutdown_tx),
    }
}

pub fn identity(name: &str, color: &str) -> Identity {
    Identity::new(
        UserId::from(Uuid::new_v4()),
        DisplayName::parse(name).expect("display name"),
        ColorTag::parse(color).expect("color"),
    )
}

pub fn token_for(server: &TestServer, identity: &Identity) -> String {
    server
        .jwt
        .issue_token(identity, time::Duration::hours(1))
        .expect("issue token")
}

pub async fn connect(server: &TestServer, token: &str) -> WsClient {
    let (ws, _) = connect_async(server.ws_url(token)).await.expect("ws connect");
    ws
}

pub async fn send_event(ws: &mut WsClient, value: serde_json::Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send event");
}

/// 读取下一条服务端事件（最多等待2秒）
pub async fn next_event(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .expect("ws error");
        match frame {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str()).expect("event json")
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// 持续读取直到出现指定类型的事件
pub async fn next_event_of(ws: &mut WsClient, event_type: &str) -> serde_json::Value {
    for _ in 0..32 {
        let event = next_event(ws).await;
        if event["type"] == event_type {
            return event;
        }
    }
    panic!("event {event_type} not received");
}

/// 断言在给定时间内没有更多事件到达
pub async fn assert_silent(ws: &mut WsClient, wait: Duration) {
    let result = tokio::time::timeout(wait, ws.next()).await;
    if let Ok(Some(Ok(Message::Text(text)))) = result {
        panic!("expected silence, got event: {text}");
    }
}
