use crate::error::InferenceError;
use crate::prompt::Prompt;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/";
pub const DEFAULT_MODEL_ID: &str = "mistralai/Mixtral-8x7B-Instruct-v0.1";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 300;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceConfig {
    pub model_id: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl InferenceConfig {
    pub fn validate(&self) -> Result<(), InferenceError> {
        if self.model_id.trim().is_empty() {
            return Err(InferenceError::InvalidConfig("model id is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(InferenceError::InvalidConfig(format!(
                "temperature {} is outside [0, 1]",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(InferenceError::InvalidConfig(
                "max_tokens must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Text-generation backend: one prompt in, generated text out.
#[async_trait]
pub trait InferenceService {
    async fn generate(&self, prompt: &str, config: &InferenceConfig)
        -> Result<String, InferenceError>;
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    temperature: f32,
    max_new_tokens: u32,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct Generation {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    Batch(Vec<Generation>),
    Single(Generation),
    Failure { error: String },
}

fn parse_generation(body: &str) -> Result<String, InferenceError> {
    let response: GenerationResponse = serde_json::from_str(body)
        .map_err(|error| InferenceError::MalformedResponse(error.to_string()))?;

    match response {
        GenerationResponse::Batch(generations) => generations
            .into_iter()
            .next()
            .map(|generation| generation.generated_text)
            .ok_or_else(|| InferenceError::MalformedResponse("empty generation list".to_string())),
        GenerationResponse::Single(generation) => Ok(generation.generated_text),
        GenerationResponse::Failure { error } => Err(InferenceError::MalformedResponse(error)),
    }
}

/// Hugging Face text-generation inference endpoint.
pub struct HuggingFaceEndpoint {
    base_url: Url,
    api_token: Option<String>,
    client: Client,
}

impl HuggingFaceEndpoint {
    pub fn new(base_url: &str, api_token: Option<String>) -> Result<Self, InferenceError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let api_token = api_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        Ok(Self {
            base_url,
            api_token,
            client: Client::new(),
        })
    }

    pub fn model_url(&self, model_id: &str) -> Result<Url, InferenceError> {
        Ok(self.base_url.join(&format!("models/{model_id}"))?)
    }
}

#[async_trait]
impl InferenceService for HuggingFaceEndpoint {
    async fn generate(
        &self,
        prompt: &str,
        config: &InferenceConfig,
    ) -> Result<String, InferenceError> {
        let url = self.model_url(&config.model_id)?;
        let payload = GenerationRequest {
            inputs: prompt,
            parameters: GenerationParameters {
                temperature: config.temperature,
                max_new_tokens: config.max_tokens,
                return_full_text: false,
            },
        };

        let mut request = self.client.post(url).json(&payload);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_generation(&body)
    }
}

/// Sends one rendered prompt per question to the inference service. No retries.
pub struct QaGateway<I> {
    service: I,
    config: InferenceConfig,
}

impl<I> QaGateway<I>
where
    I: InferenceService + Send + Sync,
{
    pub fn new(service: I, config: InferenceConfig) -> Result<Self, InferenceError> {
        config.validate()?;
        Ok(Self { service, config })
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub async fn ask(&self, prompt: &Prompt) -> Result<String, InferenceError> {
        let rendered = prompt.render();
        debug!(prompt_chars = rendered.len(), model = %self.config.model_id, "calling inference service");

        let answer = self.service.generate(&rendered, &self.config).await?;

        info!(answer_chars = answer.len(), "inference answered");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{build_prompt, ANSWER_NOT_FOUND};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingService {
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        reply: Option<String>,
    }

    #[async_trait]
    impl InferenceService for RecordingService {
        async fn generate(
            &self,
            prompt: &str,
            _config: &InferenceConfig,
        ) -> Result<String, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts
                .lock()
                .expect("prompt log")
                .push(prompt.to_string());
            self.reply.clone().ok_or(InferenceError::Status {
                status: 503,
                body: "model is loading".to_string(),
            })
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(InferenceConfig::default().validate().is_ok());
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let hot = InferenceConfig {
            temperature: 1.5,
            ..InferenceConfig::default()
        };
        let mute = InferenceConfig {
            max_tokens: 0,
            ..InferenceConfig::default()
        };
        let anonymous = InferenceConfig {
            model_id: " ".to_string(),
            ..InferenceConfig::default()
        };

        for config in [hot, mute, anonymous] {
            assert!(matches!(
                config.validate(),
                Err(InferenceError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn generation_payloads_are_parsed() {
        assert_eq!(
            parse_generation(r#"[{"generated_text":" Blue."}]"#).expect("batch"),
            " Blue."
        );
        assert_eq!(
            parse_generation(r#"{"generated_text":"Blue."}"#).expect("single"),
            "Blue."
        );
        assert!(matches!(
            parse_generation(r#"{"error":"Model is overloaded"}"#),
            Err(InferenceError::MalformedResponse(message)) if message == "Model is overloaded"
        ));
        assert!(parse_generation("[]").is_err());
        assert!(parse_generation("<html>").is_err());
    }

    #[test]
    fn model_url_keeps_namespaced_ids() {
        let endpoint = HuggingFaceEndpoint::new("https://example.test/api", None)
            .expect("valid url");
        let url = endpoint.model_url(DEFAULT_MODEL_ID).expect("joined url");
        assert_eq!(
            url.as_str(),
            "https://example.test/api/models/mistralai/Mixtral-8x7B-Instruct-v0.1"
        );
    }

    #[test]
    fn request_body_matches_text_generation_api() {
        let payload = GenerationRequest {
            inputs: "prompt",
            parameters: GenerationParameters {
                temperature: 0.5,
                max_new_tokens: 300,
                return_full_text: false,
            },
        };
        let value = serde_json::to_value(&payload).expect("serializable");
        assert_eq!(value["inputs"], "prompt");
        assert_eq!(value["parameters"]["max_new_tokens"], 300);
        assert_eq!(value["parameters"]["return_full_text"], false);
    }

    #[tokio::test]
    async fn gateway_calls_service_once_and_passes_sentinel_through() {
        let service = RecordingService {
            reply: Some(ANSWER_NOT_FOUND.to_string()),
            ..RecordingService::default()
        };
        let gateway = QaGateway::new(service, InferenceConfig::default()).expect("valid config");

        let answer = gateway
            .ask(&build_prompt("unrelated", "Who won?"))
            .await
            .expect("answer");

        assert_eq!(answer, ANSWER_NOT_FOUND);
        assert_eq!(gateway.service.calls.load(Ordering::SeqCst), 1);
        let prompts = gateway.service.prompts.lock().expect("prompt log");
        assert!(prompts[0].contains("Question: Who won?"));
    }

    #[tokio::test]
    async fn gateway_surfaces_service_faults_without_retry() {
        let gateway = QaGateway::new(RecordingService::default(), InferenceConfig::default())
            .expect("valid config");

        let error = gateway
            .ask(&build_prompt("ctx", "q"))
            .await
            .expect_err("service is down");

        assert!(matches!(error, InferenceError::Status { status: 503, .. }));
        assert_eq!(gateway.service.calls.load(Ordering::SeqCst), 1);
    }
}
