use std::sync::Arc;

use crate::PgPool;
use crate::config::Config;
use crate::llm::AiGateway;
use crate::services::conversation_store::ConversationStore;

/// Shared application state. The store and AI gateway are trait objects so
/// tests can swap in mocks without a database or a live AI service.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub store: Arc<dyn ConversationStore>,
    pub ai_client: Arc<dyn AiGateway>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: Arc<Config>,
        store: Arc<dyn ConversationStore>,
        ai_client: Arc<dyn AiGateway>,
    ) -> Self {
        Self {
            pool,
            config,
            store,
            ai_client,
        }
    }
}
