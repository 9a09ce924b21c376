//! WebSocket 连接网关
//!
//! 封装单个持久连接从握手成功到断开的全部生命周期，包括：
//! - 历史回放与在线注册
//! - 入站事件路由（消息提交、打字状态）
//! - 心跳超时
//! - 断开清理（注销在线表项、合成 typing:false）

use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use uuid::Uuid;

use application::{ClientEvent, PeerHandle, ServerEvent};
use domain::Identity;

use crate::state::AppState;

pub struct ChatConnection {
    state: AppState,
    identity: Identity,
    connection_id: Uuid,
}

impl ChatConnection {
    pub fn new(state: AppState, identity: Identity) -> Self {
        Self {
            state,
            identity,
            connection_id: Uuid::new_v4(),
        }
    }

    /// 运行连接主循环。
    ///
    /// 出站事件（广播与直达回执）统一经由注册表里登记的通道；
    /// 入站帧逐条处理完毕才读取下一帧，因此同一身份的消息
    /// 顺序端到端保持。任何一侧结束都走同一条清理路径。
    pub async fn run(self, socket: WebSocket) {
        tracing::info!(
            user_id = %self.identity.id,
            connection_id = %self.connection_id,
            "WebSocket 连接已建立"
        );

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerEvent>();

        // 历史回放先于在线注册入队：客户端先收到有界历史窗口，
        // 再收到自己的上线快照
        match self
            .state
            .chat_service
            .recent_history(self.state.chat_config.history_limit)
            .await
        {
            Ok(history) => {
                for message in &history {
                    let _ = outbound_tx.send(ServerEvent::message_new(message));
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "历史回放读取失败，跳过");
            }
        }

        self.state
            .presence
            .register(PeerHandle {
                connection_id: self.connection_id,
                identity: self.identity.clone(),
                sender: outbound_tx.clone(),
                connected_at: time::OffsetDateTime::now_utc(),
            })
            .await;

        let (mut sink, mut stream) = socket.split();
        let heartbeat = Duration::from_secs(self.state.chat_config.heartbeat_secs);
        let mut deadline = Instant::now() + heartbeat;

        loop {
            tokio::select! {
                maybe_event = outbound_rx.recv() => {
                    let Some(event) = maybe_event else { break };
                    let payload = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(err) => {
                            tracing::warn!(error = %err, "事件序列化失败，跳过");
                            continue;
                        }
                    };
                    if sink.send(WsMessage::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                maybe_frame = stream.next() => {
                    let Some(Ok(frame)) = maybe_frame else { break };
                    // 任何入站帧都算作存活确认
                    deadline = Instant::now() + heartbeat;
                    match frame {
                        WsMessage::Text(text) => {
                            self.handle_client_event(text.as_str(), &outbound_tx).await;
                        }
                        WsMessage::Ping(data) => {
                            if sink.send(WsMessage::Pong(data)).await.is_err() {
                                break;
                            }
                        }
                        WsMessage::Pong(_) | WsMessage::Binary(_) => {}
                        WsMessage::Close(_) => {
                            tracing::info!(user_id = %self.identity.id, "WebSocket收到关闭消息");
                            break;
                        }
                    }
                }
                // 心跳超时与客户端主动断开走同一条清理路径
                _ = sleep_until(deadline) => {
                    tracing::info!(
                        user_id = %self.identity.id,
                        timeout_secs = heartbeat.as_secs(),
                        "心跳超时，强制断开"
                    );
                    break;
                }
            }
        }

        self.cleanup().await;
    }

    /// 路由一条入站事件。
    ///
    /// 校验、限流、持久化的失败都只作用于本次提交：
    /// 给提交者回 `message:rejected`，连接保持存活。
    async fn handle_client_event(
        &self,
        raw: &str,
        outbound_tx: &mpsc::UnboundedSender<ServerEvent>,
    ) {
        let event: ClientEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(error = %err, "无法解析的客户端事件，忽略");
                return;
            }
        };

        match event {
            ClientEvent::MessageSend { content } => {
                match self
                    .state
                    .chat_service
                    .submit_message(&self.identity, content)
                    .await
                {
                    Ok(message) => {
                        let _ = outbound_tx.send(ServerEvent::MessageAck {
                            id: message.id.into(),
                        });
                    }
                    Err(err) => {
                        let _ = outbound_tx.send(ServerEvent::MessageRejected {
                            reason: err.rejection_reason().to_string(),
                        });
                    }
                }
            }
            ClientEvent::TypingStart => {
                self.state
                    .chat_service
                    .update_typing(&self.identity, true)
                    .await;
            }
            ClientEvent::TypingStop => {
                self.state
                    .chat_service
                    .update_typing(&self.identity, false)
                    .await;
            }
        }
    }

    /// 断开清理。
    ///
    /// 注销是条件式的：只有本连接仍是表项的当前持有者才移除，
    /// 被取代的旧连接断开不会影响后继者。无论哪种情况都合成
    /// 一条 typing:false，对端不会保留已离开身份的打字指示。
    async fn cleanup(&self) {
        self.state
            .presence
            .unregister(self.identity.id, self.connection_id)
            .await;
        self.state
            .chat_service
            .update_typing(&self.identity, false)
            .await;

        tracing::info!(
            user_id = %self.identity.id,
            connection_id = %self.connection_id,
            "WebSocket 连接已断开，在线状态已清理"
        );
    }
}
