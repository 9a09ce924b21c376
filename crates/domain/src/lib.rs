//! 实时聊天核心领域模型
//!
//! 包含身份、消息等核心实体，以及内容校验与转义规则。

pub mod errors;
pub mod identity;
pub mod message;
pub mod value_objects;

// 重新导出常用类型
pub use errors::*;
pub use identity::*;
pub use message::*;
pub use value_objects::*;
