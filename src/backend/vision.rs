//! Vision-language-model table backend.
//!
//! Renders a page to a bitmap, ships it to an OpenAI-compatible
//! chat-completions endpoint, and feeds the model's markup answer through
//! the format normalizer. The model itself is a black box; this adapter
//! owns only the transport, the bounded retry schedule, and normalization.
//!
//! Retry ladder: timeouts and generic transient errors back off at
//! `2^attempt` seconds, rate limits at `2^(attempt+1)` seconds, and
//! authentication failures surface immediately — a bad key never gets
//! better by waiting.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::VisionConfig;
use crate::error::{Error, Result};
use crate::model::TableCandidate;
use crate::normalize;

use super::{ExtractRequest, TableBackend};

/// Registry name of this backend.
pub const METHOD: &str = "vision";

const TABLE_PROMPT: &str = "Extract all tables from this page in markdown format. \
Preserve table structure and content accurately. Include table titles if present.";

/// Why a single vision request failed, as seen by the retry loop.
#[derive(Debug, Clone)]
pub enum VisionFailure {
    /// Request or connection timed out
    Timeout,
    /// Provider signalled rate limiting (HTTP 429)
    RateLimited,
    /// Authentication rejected (HTTP 401/403)
    Auth,
    /// Anything else
    Other(String),
}

/// Transport carrying one vision request.
///
/// Split out so the retry schedule is testable without a network.
#[async_trait]
pub trait VisionTransport: Send + Sync {
    /// Send one page image and prompt; return the model's text answer.
    async fn complete(
        &self,
        image_base64: &str,
        prompt: &str,
    ) -> std::result::Result<String, VisionFailure>;
}

// --- OpenAI-compatible wire types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    ImageUrl { image_url: ImageUrl },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// reqwest-backed transport speaking the chat-completions shape.
pub struct HttpVisionTransport {
    client: reqwest::Client,
    config: VisionConfig,
}

impl HttpVisionTransport {
    /// Build a transport for a vision config.
    pub fn new(config: VisionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::VisionRequest(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl VisionTransport for HttpVisionTransport {
    async fn complete(
        &self,
        image_base64: &str,
        prompt: &str,
    ) -> std::result::Result<String, VisionFailure> {
        let payload = ChatRequest {
            model: self.config.provider.model(),
            max_tokens: self.config.max_tokens,
            temperature: 0.0,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/png;base64,{image_base64}"),
                        },
                    },
                    ContentPart::Text { text: prompt },
                ],
            }],
        };

        let response = self
            .client
            .post(self.config.provider.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VisionFailure::Timeout
                } else {
                    VisionFailure::Other(e.to_string())
                }
            })?;

        let status = response.status();
        match status.as_u16() {
            429 => Err(VisionFailure::RateLimited),
            401 | 403 => Err(VisionFailure::Auth),
            _ if !status.is_success() => {
                Err(VisionFailure::Other(format!("HTTP {status}")))
            }
            _ => {
                let body: ChatResponse = response
                    .json()
                    .await
                    .map_err(|e| VisionFailure::Other(e.to_string()))?;
                Ok(body
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .unwrap_or_default())
            }
        }
    }
}

/// Table backend driving a vision-language model.
pub struct VisionTableBackend {
    transport: Arc<dyn VisionTransport>,
    config: VisionConfig,
}

impl VisionTableBackend {
    /// Create a backend with the standard HTTP transport.
    pub fn new(config: VisionConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::BackendUnavailable(
                "vision backend requires an API key".to_string(),
            ));
        }
        let transport = Arc::new(HttpVisionTransport::new(config.clone())?);
        Ok(Self { transport, config })
    }

    /// Create a backend over a custom transport.
    pub fn with_transport(config: VisionConfig, transport: Arc<dyn VisionTransport>) -> Self {
        Self { transport, config }
    }

    /// Drive one request through the bounded retry schedule.
    async fn complete_with_retry(&self, image_base64: &str) -> Result<String> {
        let retry = self.config.retry;

        for attempt in 0..=retry.max_retries {
            match self.transport.complete(image_base64, TABLE_PROMPT).await {
                Ok(text) => return Ok(text),
                Err(VisionFailure::Auth) => {
                    return Err(Error::BackendAuthFailed(
                        "vision provider rejected the API key".to_string(),
                    ));
                }
                Err(VisionFailure::Timeout) => {
                    if attempt == retry.max_retries {
                        return Err(Error::BackendTimeout(format!(
                            "vision request timed out after {} attempt(s)",
                            retry.max_retries + 1
                        )));
                    }
                    let delay = retry.backoff_delay(attempt);
                    log::warn!(
                        "vision timeout (attempt {}), retrying in {:?}",
                        attempt + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(VisionFailure::RateLimited) => {
                    if attempt == retry.max_retries {
                        return Err(Error::BackendRateLimited(
                            "vision provider rate limit exceeded".to_string(),
                        ));
                    }
                    let delay = retry.rate_limit_delay(attempt);
                    log::warn!(
                        "vision rate limited (attempt {}), waiting {:?}",
                        attempt + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(VisionFailure::Other(msg)) => {
                    if attempt == retry.max_retries {
                        return Err(Error::VisionRequest(msg));
                    }
                    let delay = retry.backoff_delay(attempt);
                    log::warn!(
                        "vision request error (attempt {}): {msg}; retrying in {:?}",
                        attempt + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        unreachable!("retry loop always returns")
    }
}

#[async_trait]
impl TableBackend for VisionTableBackend {
    fn name(&self) -> &'static str {
        METHOD
    }

    async fn extract(&self, request: &ExtractRequest) -> Result<Vec<TableCandidate>> {
        let rasterizer = request.rasterizer.clone().ok_or_else(|| {
            Error::BackendUnavailable("vision backend requires a page rasterizer".to_string())
        })?;

        let indices = request.page_indices();
        let single_page = indices.len() == 1;
        let dpi = self.config.render_dpi;

        let mut candidates = Vec::new();

        for index in indices {
            let document = Arc::clone(&request.document);
            let raster = Arc::clone(&rasterizer);

            // Rasterization is CPU-bound collaborator work
            let rendered = tokio::task::spawn_blocking(move || {
                raster.render(&document, index, None, dpi)
            })
            .await
            .map_err(|e| Error::Backend(format!("raster task failed: {e}")))??;

            let image_base64 = STANDARD.encode(&rendered.data);

            match self.complete_with_retry(&image_base64).await {
                Ok(markup) => {
                    let tables = normalize::normalize(&markup, index, METHOD);
                    log::info!("vision: {} table(s) on page {}", tables.len(), index);
                    candidates.extend(tables);
                }
                Err(e) if single_page => return Err(e),
                Err(e) => {
                    // Document-wide run: keep going, other pages may work
                    log::warn!("vision failed on page {}: {}", index, e);
                }
            }
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::config::{RetryPolicy, VisionProvider};

    fn fast_config() -> VisionConfig {
        VisionConfig::new(VisionProvider::DeepInfra, "test-key").with_retry(RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        })
    }

    /// Transport that fails `failures` times, then answers.
    struct Flaky {
        failures: u32,
        kind: fn() -> VisionFailure,
        calls: AtomicU32,
    }

    #[async_trait]
    impl VisionTransport for Flaky {
        async fn complete(
            &self,
            _image: &str,
            _prompt: &str,
        ) -> std::result::Result<String, VisionFailure> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err((self.kind)())
            } else {
                Ok("| a | b |\n| 1 | 2 |".to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_auth_failure_is_terminal() {
        let transport = Arc::new(Flaky {
            failures: u32::MAX,
            kind: || VisionFailure::Auth,
            calls: AtomicU32::new(0),
        });
        let backend = VisionTableBackend::with_transport(fast_config(), transport.clone());

        let err = backend.complete_with_retry("img").await.unwrap_err();
        assert!(matches!(err, Error::BackendAuthFailed(_)));
        // No retry after an auth failure
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_retries_then_succeeds() {
        let transport = Arc::new(Flaky {
            failures: 2,
            kind: || VisionFailure::Timeout,
            calls: AtomicU32::new(0),
        });
        let backend = VisionTableBackend::with_transport(fast_config(), transport.clone());

        let text = backend.complete_with_retry("img").await.unwrap();
        assert!(text.contains('|'));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_ceiling() {
        let transport = Arc::new(Flaky {
            failures: u32::MAX,
            kind: || VisionFailure::RateLimited,
            calls: AtomicU32::new(0),
        });
        let backend = VisionTableBackend::with_transport(fast_config(), transport.clone());

        let err = backend.complete_with_retry("img").await.unwrap_err();
        assert!(matches!(err, Error::BackendRateLimited(_)));
        // Initial attempt plus max_retries
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_generic_error_propagates_after_ceiling() {
        let transport = Arc::new(Flaky {
            failures: u32::MAX,
            kind: || VisionFailure::Other("boom".to_string()),
            calls: AtomicU32::new(0),
        });
        let backend = VisionTableBackend::with_transport(fast_config(), transport);

        let err = backend.complete_with_retry("img").await.unwrap_err();
        assert!(matches!(err, Error::VisionRequest(_)));
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let config = VisionConfig::new(VisionProvider::DeepInfra, "");
        assert!(matches!(
            VisionTableBackend::new(config),
            Err(Error::BackendUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_rasterizer() {
        let transport = Arc::new(Flaky {
            failures: 0,
            kind: || VisionFailure::Other(String::new()),
            calls: AtomicU32::new(0),
        });
        let backend = VisionTableBackend::with_transport(fast_config(), transport);

        let mut doc = crate::model::Document::new();
        doc.add_page(crate::model::Page::new(0, 612.0, 792.0));
        let request = ExtractRequest::new(Arc::new(doc), crate::model::PageSelection::All);

        let err = backend.extract(&request).await.unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }
}
