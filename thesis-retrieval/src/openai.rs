//! Query and chunk embeddings from the OpenAI embeddings API.
//!
//! Available with the `openai` feature. Failures are split into two kinds so
//! the orchestrator's degradation logs say what went wrong:
//!
//! - [`RetrievalError::ProviderUnavailable`]: the service could not answer
//!   (connection refused, timeout, HTTP 429, any 5xx).
//! - [`RetrievalError::EmbeddingError`]: the service answered but the
//!   exchange is unusable (bad key, bad request, malformed or short payload).
//!
//! Both are recoverable, so either one sends retrieval down the fallback path.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::embedding::EmbeddingProvider;
use crate::error::{Result, RetrievalError};

const PROVIDER: &str = "OpenAI";

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Output size of `text-embedding-3-small`.
const DEFAULT_DIMENSIONS: usize = 1536;

/// Per-request budget before the service counts as unavailable.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Inputs per request accepted by the embeddings endpoint.
const MAX_INPUTS_PER_REQUEST: usize = 2048;

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// Large batches (for example `--embed-missing` over a whole project) are
/// split into requests of at most 2048 inputs. Every request carries its own
/// timeout, 30 seconds unless changed with [`with_timeout`](Self::with_timeout).
///
/// ```rust,ignore
/// let provider = OpenAIEmbeddingProvider::from_env()?
///     .with_dimensions(512)
///     .with_timeout(Duration::from_secs(5));
/// let vector = provider.embed("bias in hiring").await?;
/// assert_eq!(vector.len(), 512);
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
    /// Sent as `dimensions` so the service truncates vectors server-side.
    requested_dimensions: Option<usize>,
    endpoint: String,
    timeout: Duration,
}

impl OpenAIEmbeddingProvider {
    /// Provider for `text-embedding-3-small` with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(embedding_error("API key must not be empty"));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            requested_dimensions: None,
            endpoint: OPENAI_EMBEDDINGS_URL.into(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Provider keyed from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| embedding_error("OPENAI_API_KEY environment variable not set"))?;
        Self::new(api_key)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Send requests to an OpenAI-compatible gateway instead.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Ask the service for vectors of `dims` entries.
    ///
    /// Responses are then checked against this size, and it becomes the value
    /// reported by [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.requested_dimensions = Some(dims);
        self
    }

    /// Per-request timeout. Expiry is reported as the provider being unavailable.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn request(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: self.requested_dimensions,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let payload: EmbeddingResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                transport_error(e)
            } else {
                embedding_error(format!("unreadable response: {e}"))
            }
        })?;
        decode_vectors(inputs.len(), payload, self.requested_dimensions)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn embedding_error(message: impl Into<String>) -> RetrievalError {
    RetrievalError::EmbeddingError { provider: PROVIDER.into(), message: message.into() }
}

fn unavailable(message: impl Into<String>) -> RetrievalError {
    RetrievalError::ProviderUnavailable { provider: PROVIDER.into(), message: message.into() }
}

fn transport_error(e: reqwest::Error) -> RetrievalError {
    if e.is_timeout() {
        unavailable(format!("request timed out: {e}"))
    } else if e.is_connect() {
        unavailable(format!("could not connect: {e}"))
    } else {
        embedding_error(format!("request failed: {e}"))
    }
}

/// Rate limiting and server faults are outages; anything else is a problem
/// with the request itself.
fn status_error(status: StatusCode, body: &str) -> RetrievalError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    let message = if detail.is_empty() {
        format!("service returned {status}")
    } else {
        format!("service returned {status}: {detail}")
    };

    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        unavailable(message)
    } else {
        embedding_error(message)
    }
}

/// Order vectors by their input index and check they can be scored.
fn decode_vectors(
    expected: usize,
    payload: EmbeddingResponse,
    dimensions: Option<usize>,
) -> Result<Vec<Vec<f32>>> {
    let mut data = payload.data;
    if data.len() != expected {
        return Err(embedding_error(format!(
            "expected {expected} embeddings, received {}",
            data.len()
        )));
    }
    data.sort_by_key(|d| d.index);

    let mut vectors = Vec::with_capacity(expected);
    for (position, item) in data.into_iter().enumerate() {
        if item.index != position {
            return Err(embedding_error(format!("missing embedding for input {position}")));
        }
        if item.embedding.is_empty() {
            return Err(embedding_error(format!("empty embedding for input {position}")));
        }
        if let Some(dims) = dimensions.filter(|&d| d != item.embedding.len()) {
            return Err(embedding_error(format!(
                "embedding for input {position} has {} dimensions, expected {dims}",
                item.embedding.len()
            )));
        }
        vectors.push(item.embedding);
    }
    Ok(vectors)
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for inputs in texts.chunks(MAX_INPUTS_PER_REQUEST) {
            debug!(provider = PROVIDER, model = %self.model, inputs = inputs.len(), "embedding request");
            match self.request(inputs).await {
                Ok(batch) => vectors.extend(batch),
                Err(e) => {
                    warn!(provider = PROVIDER, cause = e.kind(), error = %e, "embedding request failed");
                    return Err(e);
                }
            }
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(items: &[(usize, &[f32])]) -> EmbeddingResponse {
        EmbeddingResponse {
            data: items
                .iter()
                .map(|(index, v)| EmbeddingData { index: *index, embedding: v.to_vec() })
                .collect(),
        }
    }

    #[test]
    fn blank_api_key_rejected() {
        assert!(matches!(
            OpenAIEmbeddingProvider::new("  "),
            Err(RetrievalError::EmbeddingError { .. })
        ));
    }

    #[test]
    fn dimensions_override_is_reported() {
        let provider = OpenAIEmbeddingProvider::new("sk-test").unwrap().with_dimensions(256);
        assert_eq!(provider.dimensions(), 256);
        assert_eq!(provider.name(), "OpenAI");
    }

    #[test]
    fn throttling_and_server_faults_mean_unavailable() {
        for status in [StatusCode::TOO_MANY_REQUESTS, StatusCode::SERVICE_UNAVAILABLE] {
            let err = status_error(status, "");
            assert!(matches!(err, RetrievalError::ProviderUnavailable { .. }), "{status}");
            assert!(err.is_recoverable());
        }
    }

    #[test]
    fn client_errors_carry_the_service_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        let err = status_error(StatusCode::UNAUTHORIZED, body);

        assert_eq!(err.kind(), "embedding");
        assert!(err.to_string().contains("401 Unauthorized: Incorrect API key provided"));
    }

    #[test]
    fn unparsed_error_body_is_kept_verbatim() {
        let err = status_error(StatusCode::BAD_REQUEST, " upstream said no \n");
        assert!(err.to_string().ends_with("400 Bad Request: upstream said no"));
    }

    #[test]
    fn vectors_follow_input_order() {
        let vectors =
            decode_vectors(2, payload(&[(1, &[0.0, 1.0]), (0, &[1.0, 0.0])]), Some(2)).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn short_or_malformed_payloads_rejected() {
        let short = decode_vectors(2, payload(&[(0, &[1.0])]), None).unwrap_err();
        assert!(short.to_string().contains("expected 2 embeddings, received 1"));

        let duplicate = decode_vectors(2, payload(&[(0, &[1.0]), (0, &[1.0])]), None).unwrap_err();
        assert!(duplicate.to_string().contains("missing embedding for input 1"));

        let empty = decode_vectors(1, payload(&[(0, &[])]), None).unwrap_err();
        assert!(empty.to_string().contains("empty embedding"));

        let wrong_size = decode_vectors(1, payload(&[(0, &[1.0, 2.0, 3.0])]), Some(2)).unwrap_err();
        assert!(wrong_size.to_string().contains("has 3 dimensions, expected 2"));
        assert_eq!(wrong_size.kind(), "embedding");
    }

    #[tokio::test]
    async fn empty_batch_makes_no_request() {
        let provider =
            OpenAIEmbeddingProvider::new("sk-test").unwrap().with_endpoint("http://127.0.0.1:9");
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreachable_endpoint_means_unavailable() {
        let provider = OpenAIEmbeddingProvider::new("sk-test")
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/v1/embeddings")
            .with_timeout(Duration::from_secs(2));

        let err = provider.embed("bias in hiring").await.unwrap_err();
        assert!(matches!(err, RetrievalError::ProviderUnavailable { ref provider, .. } if provider == "OpenAI"));
    }
}
