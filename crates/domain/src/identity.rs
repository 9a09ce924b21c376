use serde::{Deserialize, Serialize};

use crate::message::AuthorSnapshot;
use crate::value_objects::{ColorTag, DisplayName, UserId};

/// 已认证的参与者身份。
///
/// 由验证通过的会话凭证派生，派生之后不可变；
/// 实时核心永远不会修改身份信息。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub display_name: DisplayName,
    pub color: ColorTag,
}

impl Identity {
    pub fn new(id: UserId, display_name: DisplayName, color: ColorTag) -> Self {
        Self {
            id,
            display_name,
            color,
        }
    }

    /// 发送时刻的作者快照，固化在消息上。
    pub fn author_snapshot(&self) -> AuthorSnapshot {
        AuthorSnapshot {
            display_name: self.display_name.clone(),
            color: self.color.clone(),
        }
    }
}
