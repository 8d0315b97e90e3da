// HTTP client for the external adventure AI service.
//
// Retry policy: network and timeout failures, 5xx and 429 responses retry
// with exponential backoff (retry_delay * 2^attempt); anything else is
// surfaced as-is. Exhausting the attempts yields `ServiceUnavailable` so the
// caller can tell a flaky AI from a bad request. The per-request timeout on
// the reqwest client bounds each attempt; dropping the returned future
// (client disconnect) cancels both the in-flight call and the backoff sleep.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::config::AiSettings;
use crate::core::adventure::{
    AdventureAi, ChoiceEvaluation, EvaluateChoiceRequest, GenerateAdventureRequest,
    GeneratedAdventure,
};
use crate::core::error::GameError;

pub struct AdventureApiClient {
    client: Client,
    settings: AiSettings,
}

impl AdventureApiClient {
    pub fn new(settings: AiSettings) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    async fn post_json<T: Serialize, R: DeserializeOwned>(
        &self,
        operation: &str,
        body: &T,
    ) -> Result<R, GameError> {
        let url = format!(
            "{}/api/adventure/{}",
            self.settings.base_url.trim_end_matches('/'),
            operation
        );

        let mut attempt: u32 = 0;
        loop {
            match self.client.post(&url).json(body).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json().await.map_err(|err| {
                            GameError::ServiceUnavailable(format!(
                                "adventure service returned an unreadable body: {}",
                                err
                            ))
                        });
                    }
                    if !retryable_status(status) {
                        let body = response.text().await.unwrap_or_default();
                        return Err(GameError::Internal(format!(
                            "adventure service rejected {}: {} {}",
                            operation, status, body
                        )));
                    }
                    tracing::warn!(
                        operation,
                        attempt,
                        status = status.as_u16(),
                        "retryable adventure service response"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        operation,
                        attempt,
                        error = %err,
                        "adventure service request failed"
                    );
                }
            }

            attempt += 1;
            if attempt >= self.settings.max_retries {
                return Err(GameError::ServiceUnavailable(format!(
                    "adventure service unavailable after {} attempts",
                    attempt
                )));
            }
            tokio::time::sleep(backoff_delay(self.settings.retry_delay, attempt - 1)).await;
        }
    }
}

fn retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt)
}

#[async_trait]
impl AdventureAi for AdventureApiClient {
    async fn generate(
        &self,
        request: &GenerateAdventureRequest,
    ) -> Result<GeneratedAdventure, GameError> {
        self.post_json("generate", request).await
    }

    async fn evaluate(
        &self,
        request: &EvaluateChoiceRequest,
    ) -> Result<ChoiceEvaluation, GameError> {
        self.post_json("evaluate", request).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
