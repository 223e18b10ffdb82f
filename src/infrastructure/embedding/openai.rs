//! OpenAI-compatible embedding provider implementation

use async_trait::async_trait;
use serde::Deserialize;

use super::HttpClientTrait;
use crate::domain::{DomainError, EmbeddingProvider};

const PROVIDER_NAME: &str = "openai";

/// Embedding provider for any server exposing `POST /v1/embeddings`
/// (OpenAI, Ollama, text-embeddings-inference, ...)
#[derive(Debug)]
pub struct OpenAiEmbeddingProvider<C: HttpClientTrait> {
    client: C,
    auth_header: Option<String>,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl<C: HttpClientTrait> OpenAiEmbeddingProvider<C> {
    pub fn new(
        client: C,
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            auth_header: None,
            base_url,
            model: model.into(),
            dimensions,
        }
    }

    /// Send `Authorization: Bearer <api_key>`; an empty key sends nothing
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.auth_header = api_key
            .filter(|key| !key.trim().is_empty())
            .map(|key| format!("Bearer {}", key.trim()));
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        let mut headers = vec![("Content-Type", "application/json")];

        if let Some(ref auth) = self.auth_header {
            headers.push(("Authorization", auth.as_str()));
        }

        headers
    }

    fn build_request(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "input": text,
        })
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<Vec<f32>, DomainError> {
        let response: EmbeddingApiResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider_failed(
                PROVIDER_NAME,
                format!("Failed to parse embedding response: {}", e),
            )
        })?;

        let vector = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                DomainError::provider_failed(PROVIDER_NAME, "Response contained no embeddings")
            })?;

        if vector.is_empty() {
            return Err(DomainError::provider_failed(
                PROVIDER_NAME,
                "Response contained an empty embedding",
            ));
        }

        Ok(vector)
    }
}

#[async_trait]
impl<C: HttpClientTrait> EmbeddingProvider for OpenAiEmbeddingProvider<C> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let url = self.embeddings_url();
        let body = self.build_request(text);

        let response = self.client.post_json(&url, self.headers(), &body).await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingApiData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::infrastructure::embedding::http_client::mock::MockHttpClient;
    use crate::infrastructure::embedding::HttpClient;

    const TEST_URL: &str = "http://localhost:11434/v1/embeddings";

    fn response_with(vector: Vec<f32>) -> serde_json::Value {
        json!({
            "object": "list",
            "model": "gte-small",
            "data": [{"object": "embedding", "index": 0, "embedding": vector}],
            "usage": {"prompt_tokens": 3, "total_tokens": 3}
        })
    }

    #[tokio::test]
    async fn test_embed_returns_first_vector() {
        let client = MockHttpClient::new().with_response(TEST_URL, response_with(vec![0.1, 0.2, 0.3]));
        let provider = OpenAiEmbeddingProvider::new(client, "http://localhost:11434/", "gte-small", 3);

        let vector = provider.embed("Hello world").await.unwrap();

        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
        assert_eq!(
            provider.client.last_body().unwrap(),
            json!({"model": "gte-small", "input": "Hello world"})
        );
    }

    #[tokio::test]
    async fn test_empty_data_is_provider_failure() {
        let client = MockHttpClient::new().with_response(TEST_URL, json!({"data": []}));
        let provider = OpenAiEmbeddingProvider::new(client, "http://localhost:11434", "gte-small", 3);

        let result = provider.embed("Hello").await;

        assert!(matches!(result, Err(DomainError::ProviderFailed { .. })));
    }

    #[tokio::test]
    async fn test_malformed_response_is_provider_failure() {
        let client = MockHttpClient::new().with_response(TEST_URL, json!({"error": "oops"}));
        let provider = OpenAiEmbeddingProvider::new(client, "http://localhost:11434", "gte-small", 3);

        let result = provider.embed("Hello").await;

        assert!(matches!(result, Err(DomainError::ProviderFailed { .. })));
    }

    #[tokio::test]
    async fn test_client_error_propagates_unchanged() {
        let client = MockHttpClient::new()
            .with_error(TEST_URL, DomainError::provider_unavailable("connection refused"));
        let provider = OpenAiEmbeddingProvider::new(client, "http://localhost:11434", "gte-small", 3);

        let result = provider.embed("Hello").await;

        assert!(matches!(result, Err(DomainError::ProviderUnavailable { .. })));
    }

    #[test]
    fn test_headers_include_bearer_only_with_key() {
        let provider = OpenAiEmbeddingProvider::new(MockHttpClient::new(), "http://x", "m", 3);
        assert!(provider.headers().iter().all(|(k, _)| *k != "Authorization"));

        let provider = provider.with_api_key(Some("sk-test".to_string()));
        assert!(provider
            .headers()
            .contains(&("Authorization", "Bearer sk-test")));

        let provider = provider.with_api_key(Some("  ".to_string()));
        assert!(provider.headers().iter().all(|(k, _)| *k != "Authorization"));
    }

    #[tokio::test]
    async fn test_against_http_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(json!({"model": "gte-small", "input": "seed text"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_with(vec![0.5, -0.5])))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiEmbeddingProvider::new(HttpClient::new(), server.uri(), "gte-small", 2)
            .with_api_key(Some("sk-test".to_string()));

        let vector = provider.embed("seed text").await.unwrap();

        assert_eq!(vector, vec![0.5, -0.5]);
        assert_eq!(provider.provider_name(), "openai");
        assert_eq!(provider.dimensions(), 2);
    }
}
