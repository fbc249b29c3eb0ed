use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{AiGateway, ApiChatMessage};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::chats::Persona;

/// Outbound request body for `POST {base}/chat`.
#[derive(Serialize, Debug)]
struct ConverseRequest<'a> {
    messages: &'a [ApiChatMessage],
    persona: Persona,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct ConverseReply {
    content: String,
}

/// AI gateway over a single long-lived, connection-pooled HTTP client.
///
/// Constructed once at process start and shared via `Arc`; reqwest's client
/// is internally reference-counted and safe for concurrent use across
/// requests. The request timeout bounds every `converse` call.
pub struct HttpAiGateway {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAiGateway {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ai_request_timeout_secs))
            .pool_max_idle_per_host(config.ai_max_idle_connections)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build AI HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.ai_service_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AiGateway for HttpAiGateway {
    #[instrument(skip(self, history), fields(turns = history.len(), %persona), err)]
    async fn converse(
        &self,
        history: &[ApiChatMessage],
        persona: Persona,
    ) -> Result<String, AppError> {
        let url = format!("{}/chat", self.base_url);
        let body = ConverseRequest {
            messages: history,
            persona,
            // Buffered mode; the wire contract also supports streaming.
            stream: false,
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::AiUpstream(format!("AI service request timed out: {e}"))
                } else {
                    AppError::AiUpstream(format!("AI service request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::AiUpstream(format!(
                "AI service returned status {status}"
            )));
        }

        let reply: ConverseReply = response
            .json()
            .await
            .map_err(|e| AppError::AiUpstream(format!("Malformed AI service response: {e}")))?;

        debug!(reply_len = reply.content.len(), "AI gateway reply received");
        Ok(reply.content)
    }
}

/// Builds the shared gateway instance injected into the pipeline.
pub fn build_ai_gateway(config: &Config) -> Result<Arc<HttpAiGateway>, AppError> {
    Ok(Arc::new(HttpAiGateway::new(config)?))
}
