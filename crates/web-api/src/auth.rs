//! JWT 会话校验模块
//!
//! 会话令牌由外部认证服务签发，实时核心只负责校验：
//! 把令牌换成已验证的 Identity，或者拒绝连接。

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use application::{SessionError, SessionValidator};
use config::JwtConfig;
use domain::{ColorTag, DisplayName, Identity, UserId};

/// JWT Claims 结构
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// 用户ID
    pub sub: Uuid,
    /// 显示名
    pub name: String,
    /// 颜色标签
    pub color: String,
    /// 过期时间 (Unix timestamp)
    pub exp: i64,
}

/// JWT Token 服务
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_ref()),
            decoding_key: DecodingKey::from_secret(config.secret.as_ref()),
        }
    }

    /// 签发会话令牌。
    ///
    /// 生产路径上令牌由外部认证服务签发，这里保留签发能力
    /// 供测试和运维工具使用。
    pub fn issue_token(
        &self,
        identity: &Identity,
        ttl: time::Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let exp = time::OffsetDateTime::now_utc() + ttl;
        let claims = Claims {
            sub: identity.id.into(),
            name: identity.display_name.to_string(),
            color: identity.color.to_string(),
            exp: exp.unix_timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
    }
}

#[async_trait]
impl SessionValidator for JwtService {
    async fn verify(&self, credential: &str) -> Result<Identity, SessionError> {
        let claims = self
            .decode_claims(credential)
            .map_err(|_| SessionError::Unauthenticated)?;

        // 令牌里的字段同样要通过领域校验，否则视为无效会话
        let display_name =
            DisplayName::parse(claims.name).map_err(|_| SessionError::Unauthenticated)?;
        let color = ColorTag::parse(claims.color).map_err(|_| SessionError::Unauthenticated)?;

        Ok(Identity::new(UserId::from(claims.sub), display_name, color))
    }
}
