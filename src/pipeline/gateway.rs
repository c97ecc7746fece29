//! Extraction gateway: send the payload to a vision model, parse its JSON.
//!
//! [`ExtractionGateway`] is the seam to the remote capability. The
//! production [`VisionGateway`] drives any `edgequake-llm` provider; tests use
//! fakes that return canned text.
//!
//! Two failure classes are kept apart:
//!
//! * the call itself failed → [`ExtractError::ServiceError`] /
//!   [`ExtractError::ServiceTimeout`];
//! * the call returned text that is not JSON →
//!   [`ExtractError::MalformedResponse`], carrying the raw text.
//!
//! The request runs in the provider's JSON mode (`response_format:
//! json_object`) so the answer is constrained to a JSON object. Nothing is
//! retried at this layer. The parsed value is not checked against the
//! troubleshooting schema; that contract belongs to the system prompt.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::pipeline::assemble::ExtractionPayload;
use crate::prompts::page_listing;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Text returned by the remote capability, with token accounting.
#[derive(Debug, Clone, Default)]
pub struct GatewayResponse {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Black-box structured extraction: `(system prompt, images) → JSON text`.
#[async_trait]
pub trait ExtractionGateway: Send + Sync {
    async fn extract(
        &self,
        system_prompt: &str,
        payload: &ExtractionPayload,
    ) -> Result<GatewayResponse, ExtractError>;
}

/// Parse the model's answer as JSON.
///
/// # Errors
/// [`ExtractError::MalformedResponse`] with the untouched text in `raw`.
pub fn parse_response(text: &str) -> Result<serde_json::Value, ExtractError> {
    serde_json::from_str(text).map_err(|e| ExtractError::MalformedResponse {
        detail: e.to_string(),
        raw: text.to_string(),
    })
}

/// [`ExtractionGateway`] over an `edgequake-llm` vision provider.
pub struct VisionGateway {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    timeout: Option<Duration>,
}

impl VisionGateway {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.api_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Resolve the provider described by `config` and wrap it.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }

    /// JSON mode plus the configured sampling settings.
    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..CompletionOptions::json_mode()
        }
    }
}

#[async_trait]
impl ExtractionGateway for VisionGateway {
    async fn extract(
        &self,
        system_prompt: &str,
        payload: &ExtractionPayload,
    ) -> Result<GatewayResponse, ExtractError> {
        let images: Vec<_> = payload
            .entries
            .iter()
            .map(|entry| entry.to_image_data())
            .collect();
        let listing = page_listing(&payload.pages);
        let messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user_with_images(&listing, images),
        ];
        let options = self.build_options();

        info!(
            "Sending {} images ({} pages) to the extraction model",
            payload.len(),
            payload.pages.len()
        );
        let start = Instant::now();

        let call = self.provider.chat(&messages, Some(&options));
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ExtractError::ServiceTimeout {
                    secs: limit.as_secs(),
                })?,
            None => call.await,
        };

        let response = result.map_err(|e| ExtractError::ServiceError {
            message: e.to_string(),
        })?;

        debug!(
            "Extraction call: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(GatewayResponse {
            text: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. pre-built `config.provider`;
/// 2. `config.provider_name` with the configured (or default) model;
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set;
/// 4. OpenAI when `OPENAI_API_KEY` is set;
/// 5. `ProviderFactory::from_env()` auto-detection.
pub fn resolve_provider(config: &ExtractionConfig) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, config.model_or_default());
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_vision_provider("openai", config.model_or_default());
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use edgequake_llm::traits::LLMResponse;
    use edgequake_llm::MockProvider;

    #[test]
    fn parses_json_object() {
        let v = parse_response(r#"{"TroubleShooting": []}"#).unwrap();
        assert!(v["TroubleShooting"].as_array().unwrap().is_empty());
    }

    #[test]
    fn non_json_is_malformed_and_keeps_raw_text() {
        let text = "I'm sorry, I cannot read these images.";
        let err = parse_response(text).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRemoteResponse);
        assert_eq!(err.raw_response(), Some(text));
    }

    #[test]
    fn truncated_json_is_not_partially_parsed() {
        let text = r#"{"TroubleShooting": [{"Problem": "No power""#;
        let err = parse_response(text).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedResponse { .. }));
    }

    #[test]
    fn fenced_json_is_malformed() {
        let text = "```json\n{\"TroubleShooting\": []}\n```";
        assert!(parse_response(text).is_err());
    }

    fn empty_payload() -> ExtractionPayload {
        ExtractionPayload::from_views(Vec::new())
    }

    /// Never answers; stands in for a hung upstream.
    struct StalledProvider;

    #[async_trait]
    impl LLMProvider for StalledProvider {
        fn name(&self) -> &str {
            "stalled"
        }

        fn model(&self) -> &str {
            "stalled-model"
        }

        fn max_context_length(&self) -> usize {
            4096
        }

        async fn complete(&self, _prompt: &str) -> edgequake_llm::Result<LLMResponse> {
            std::future::pending().await
        }

        async fn complete_with_options(
            &self,
            _prompt: &str,
            _options: &CompletionOptions,
        ) -> edgequake_llm::Result<LLMResponse> {
            std::future::pending().await
        }

        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _options: Option<&CompletionOptions>,
        ) -> edgequake_llm::Result<LLMResponse> {
            std::future::pending().await
        }
    }

    #[test]
    fn requests_json_mode() {
        let gateway = VisionGateway::new(Arc::new(MockProvider::new()), &ExtractionConfig::default());
        let options = gateway.build_options();
        assert_eq!(options.response_format.as_deref(), Some("json_object"));
        assert_eq!(options.temperature, Some(0.0));
        assert_eq!(options.max_tokens, Some(2000));
    }

    #[tokio::test]
    async fn returns_provider_text_unparsed() {
        let provider = MockProvider::new();
        provider.add_response(r#"{"TroubleShooting": []}"#).await;
        let gateway = VisionGateway::new(Arc::new(provider), &ExtractionConfig::default());

        let response = gateway
            .extract("system", &empty_payload())
            .await
            .unwrap();
        assert_eq!(response.text, r#"{"TroubleShooting": []}"#);
    }

    #[tokio::test]
    async fn stalled_call_times_out_as_service_failure() {
        let config = ExtractionConfig::builder().api_timeout_secs(1).build().unwrap();
        let gateway = VisionGateway::new(Arc::new(StalledProvider), &config);

        let err = gateway
            .extract("system", &empty_payload())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::ServiceTimeout { secs: 1 }));
        assert_eq!(err.kind(), ErrorKind::RemoteServiceFailure);
        assert!(err.raw_response().is_none());
    }
}
