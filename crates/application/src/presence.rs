//! 在线状态注册表。
//!
//! 系统中"谁在线"的唯一事实来源。所有读写都经过同一把锁，
//! 这是整个核心仅有的序列化点之一（另一个是限流器计数）。
//! 每次成功的注册/注销都会向所有已注册连接广播完整的在线
//! 集合快照，用带宽换取最简单的一致性。

use std::collections::HashMap;

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use domain::{Identity, Timestamp, UserId};

use crate::events::{OnlineUser, ServerEvent};

/// 单个连接在注册表中的句柄。
///
/// 连接本体始终由网关独占，注册表只持有身份快照和出站通道的引用。
#[derive(Debug, Clone)]
pub struct PeerHandle {
    pub connection_id: Uuid,
    pub identity: Identity,
    pub sender: mpsc::UnboundedSender<ServerEvent>,
    pub connected_at: Timestamp,
}

pub struct PresenceRegistry {
    peers: Mutex<HashMap<UserId, PeerHandle>>,
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self {
            peers: Mutex::new(HashMap::new()),
        }
    }

    /// 注册一个已验证的连接。
    ///
    /// 同一身份再次注册时，新连接直接取代旧连接的表项
    /// （last-writer-wins）：被取代的连接保持打开，但从在线
    /// 快照中消失。
    pub async fn register(&self, handle: PeerHandle) {
        let mut peers = self.peers.lock().await;
        let user_id = handle.identity.id;
        let superseded = peers.insert(user_id, handle).is_some();

        tracing::info!(user_id = %user_id, superseded, "用户上线");
        Self::broadcast_online(&peers);
    }

    /// 注销一个连接。
    ///
    /// 只有当表项仍属于该连接时才移除——被取代的旧连接断开时
    /// 不能误删后继者的表项。返回是否真的移除了表项。
    pub async fn unregister(&self, user_id: UserId, connection_id: Uuid) -> bool {
        let mut peers = self.peers.lock().await;
        let is_current = peers
            .get(&user_id)
            .map(|handle| handle.connection_id == connection_id)
            .unwrap_or(false);
        if !is_current {
            return false;
        }

        peers.remove(&user_id);
        tracing::info!(user_id = %user_id, "用户下线");
        Self::broadcast_online(&peers);
        true
    }

    /// 当前在线集合快照。
    pub async fn snapshot(&self) -> Vec<OnlineUser> {
        let peers = self.peers.lock().await;
        Self::online_users(&peers)
    }

    /// 向在线快照中的每个连接投递事件。
    ///
    /// 已关闭的通道直接跳过：对应连接正在走清理路径，
    /// 很快会自行注销。
    pub async fn broadcast(&self, event: ServerEvent) {
        let peers = self.peers.lock().await;
        for handle in peers.values() {
            let _ = handle.sender.send(event.clone());
        }
    }

    /// 向除指定身份外的所有连接投递事件（打字中继使用）。
    pub async fn broadcast_except(&self, excluded: UserId, event: ServerEvent) {
        let peers = self.peers.lock().await;
        for (user_id, handle) in peers.iter() {
            if *user_id == excluded {
                continue;
            }
            let _ = handle.sender.send(event.clone());
        }
    }

    fn online_users(peers: &HashMap<UserId, PeerHandle>) -> Vec<OnlineUser> {
        let mut users: Vec<OnlineUser> = peers
            .values()
            .map(|handle| OnlineUser {
                display_name: handle.identity.display_name.to_string(),
                color: handle.identity.color.to_string(),
            })
            .collect();
        // 快照顺序稳定，方便客户端渲染和测试断言
        users.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        users
    }

    fn broadcast_online(peers: &HashMap<UserId, PeerHandle>) {
        let event = ServerEvent::UsersOnline {
            users: Self::online_users(peers),
        };
        for handle in peers.values() {
            let _ = handle.sender.send(event.clone());
        }
    }
}
