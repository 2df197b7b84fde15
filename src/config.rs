//! Configuration for network-backed extraction backends.
//!
//! All configuration is explicit: adapters receive these structs at
//! construction and never read process environment mid-call. The CLI is the
//! only place environment variables are mapped into config values.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded-retry schedule for network-backed backends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt
    pub max_retries: u32,

    /// Backoff unit; timeout retries wait `base_delay * 2^attempt`
    #[serde(with = "duration_secs")]
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after a timeout or generic transient error:
    /// `base * 2^attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }

    /// Delay before retrying after a rate-limit signal: `base * 2^(attempt+1)`.
    /// Rate limits get the longer wait since the server told us to back off.
    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt + 1)
    }
}

/// Inference provider for the vision-language-model backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisionProvider {
    /// DeepInfra-hosted olmOCR
    DeepInfra,
    /// Parasail-hosted olmOCR
    Parasail,
    /// Cirrascale (Ai2 endpoints)
    Cirrascale,
    /// Any OpenAI-compatible chat-completions endpoint
    Custom {
        /// Full chat-completions URL
        endpoint: String,
        /// Model identifier sent in the request body
        model: String,
    },
}

impl VisionProvider {
    /// Chat-completions endpoint URL for this provider.
    pub fn endpoint(&self) -> &str {
        match self {
            VisionProvider::DeepInfra => "https://api.deepinfra.com/v1/openai/chat/completions",
            VisionProvider::Parasail => "https://api.parasail.io/v1/chat/completions",
            VisionProvider::Cirrascale => "https://ai2endpoints.cirrascale.ai/api/chat/completions",
            VisionProvider::Custom { endpoint, .. } => endpoint,
        }
    }

    /// Model identifier for this provider.
    pub fn model(&self) -> &str {
        match self {
            VisionProvider::DeepInfra | VisionProvider::Parasail => "allenai/olmOCR-2-7B-1025",
            VisionProvider::Cirrascale => "olmOCR-2-7B-1025",
            VisionProvider::Custom { model, .. } => model,
        }
    }
}

/// Configuration for the vision-language-model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Inference provider (endpoint + model)
    pub provider: VisionProvider,

    /// API key for the provider
    pub api_key: String,

    /// Per-request timeout
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// Retry schedule for transient failures
    pub retry: RetryPolicy,

    /// Resolution for rendering pages before upload
    pub render_dpi: u32,

    /// Completion token budget per request
    pub max_tokens: u32,
}

impl VisionConfig {
    /// Create a config for a provider with default timeouts.
    pub fn new(provider: VisionProvider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            render_dpi: 150,
            max_tokens: 4096,
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the retry schedule.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the page render resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.render_dpi = dpi;
        self
    }
}

/// Serde adapter: `Duration` as whole seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
