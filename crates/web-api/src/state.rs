use std::sync::Arc;

use application::{ChatService, PresenceRegistry, RateLimiter, SessionValidator};
use config::ChatConfig;

#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ChatService>,
    pub presence: Arc<PresenceRegistry>,
    pub rate_limiter: Arc<RateLimiter>,
    pub session_validator: Arc<dyn SessionValidator>,
    pub chat_config: ChatConfig,
}

impl AppState {
    pub fn new(
        chat_service: Arc<ChatService>,
        presence: Arc<PresenceRegistry>,
        rate_limiter: Arc<RateLimiter>,
        session_validator: Arc<dyn SessionValidator>,
        chat_config: ChatConfig,
    ) -> Self {
        Self {
            chat_service,
            presence,
            rate_limiter,
            session_validator,
            chat_config,
        }
    }
}
