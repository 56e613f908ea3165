use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, warn};

use crate::error::{AssistantError, AssistantResult};

const MAX_NEW_TOKENS: u32 = 200;

// --- Recommender trait ---

/// Turns a one-line profile summary into free-text advice.
pub trait Recommender {
    fn recommend(&self, summary: &str) -> AssistantResult<String>;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    HuggingFace,
    OpenAI,
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    pub model_id: String,
    pub short_name: String,
}

/// Maps a `--model` name to a provider. `none` disables recommendations.
pub fn resolve_model(name: &str) -> Result<Option<ModelSpec>> {
    let spec = |provider, model_id: &str, short_name: &str| ModelSpec {
        provider,
        model_id: model_id.to_string(),
        short_name: short_name.to_string(),
    };
    match name {
        "none" | "off" => Ok(None),
        // Hugging Face text-generation models (requires HF_API_TOKEN)
        "gpt2" => Ok(Some(spec(ProviderKind::HuggingFace, "openai-community/gpt2", "gpt2"))),
        "gpt2-medium" => Ok(Some(spec(
            ProviderKind::HuggingFace,
            "openai-community/gpt2-medium",
            "gpt2-medium",
        ))),
        "distilgpt2" => Ok(Some(spec(
            ProviderKind::HuggingFace,
            "distilbert/distilgpt2",
            "distilgpt2",
        ))),
        // OpenAI (requires OPENAI_API_KEY)
        "gpt-4o-mini" => Ok(Some(spec(ProviderKind::OpenAI, "gpt-4o-mini", "gpt-4o-mini"))),
        "gpt-4o" => Ok(Some(spec(ProviderKind::OpenAI, "gpt-4o", "gpt-4o"))),
        _ => Err(anyhow!(
            "Unknown model '{}'. Available: gpt2 (default), gpt2-medium, distilgpt2, \
             gpt-4o-mini, gpt-4o, none",
            name
        )),
    }
}

pub fn create_provider(
    spec: &ModelSpec,
    inference_url: &str,
) -> AssistantResult<Box<dyn Recommender>> {
    match spec.provider {
        ProviderKind::HuggingFace => {
            let provider = HuggingFaceProvider::new(spec.model_id.clone(), inference_url)?;
            Ok(Box::new(provider))
        }
        ProviderKind::OpenAI => {
            let provider = OpenAIProvider::new(spec.model_id.clone())?;
            Ok(Box::new(provider))
        }
    }
}

pub fn build_prompt(summary: &str) -> String {
    format!(
        "Based on the following profile, recommend suitable fields of study and career paths.\n\n\
        Profile: {}\n\n\
        Recommendation:",
        summary
    )
}

fn unavailable(msg: impl Into<String>) -> AssistantError {
    let msg = msg.into();
    warn!("{}", msg);
    AssistantError::RecommendationUnavailable(msg)
}

fn require_env(key: &str) -> AssistantResult<String> {
    env::var(key).map_err(|_| {
        AssistantError::RecommendationUnavailable(format!(
            "{key} environment variable not set. Set it with: export {key}=your-key-here"
        ))
    })
}

fn clean_output(text: &str) -> AssistantResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(unavailable("model returned no text"));
    }
    Ok(text.to_string())
}

// --- Hugging Face text-generation provider ---

pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    return_full_text: bool,
}

#[derive(Debug, Serialize)]
struct GenerationRequest {
    inputs: String,
    parameters: GenerationParameters,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug)]
pub struct HuggingFaceProvider {
    api_token: String,
    model_id: String,
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HuggingFaceProvider {
    pub fn new(model_id: String, inference_url: &str) -> AssistantResult<Self> {
        let api_token = require_env("HF_API_TOKEN")?;
        Ok(Self::with_token(model_id, inference_url, api_token))
    }

    pub fn with_token(model_id: String, inference_url: &str, api_token: String) -> Self {
        let endpoint = format!("{}/{}", inference_url.trim_end_matches('/'), model_id);
        let client = reqwest::blocking::Client::new();
        Self {
            api_token,
            model_id,
            endpoint,
            client,
        }
    }
}

impl Recommender for HuggingFaceProvider {
    fn recommend(&self, summary: &str) -> AssistantResult<String> {
        let request = GenerationRequest {
            inputs: build_prompt(summary),
            parameters: GenerationParameters {
                max_new_tokens: MAX_NEW_TOKENS,
                return_full_text: false,
            },
        };

        debug!(model = %self.model_id, "requesting recommendation");
        let generated: Vec<GeneratedText> =
            post_json(&self.client, &self.endpoint, &self.api_token, &request)?;

        match generated.first() {
            Some(g) => clean_output(&g.generated_text),
            None => Err(unavailable("no generations in inference response")),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- OpenAI chat provider ---

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug)]
pub struct OpenAIProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl OpenAIProvider {
    pub fn new(model_id: String) -> AssistantResult<Self> {
        let api_key = require_env("OPENAI_API_KEY")?;
        let client = reqwest::blocking::Client::new();
        Ok(Self {
            api_key,
            model_id,
            client,
        })
    }
}

impl Recommender for OpenAIProvider {
    fn recommend(&self, summary: &str) -> AssistantResult<String> {
        let request = ChatRequest {
            model: &self.model_id,
            max_tokens: MAX_NEW_TOKENS,
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(summary),
            }],
        };

        debug!(model = %self.model_id, "requesting recommendation");
        let reply: ChatResponse = post_json(&self.client, OPENAI_API_URL, &self.api_key, &request)?;

        match reply.choices.first() {
            Some(choice) => clean_output(&choice.message.content),
            None => Err(unavailable("no choices in chat completion response")),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

/// Sends an authenticated JSON request and decodes the JSON reply. Transport
/// errors, non-success statuses and undecodable bodies all mean the model is
/// unavailable.
fn post_json<Req, Resp>(
    client: &reqwest::blocking::Client,
    url: &str,
    token: &str,
    body: &Req,
) -> AssistantResult<Resp>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let response = client
        .post(url)
        .bearer_auth(token)
        .json(body)
        .send()
        .map_err(|e| unavailable(format!("failed to reach {}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().unwrap_or_default();
        return Err(unavailable(format!(
            "request to {} failed with status {}: {}",
            url, status, error_text
        )));
    }

    response
        .json()
        .map_err(|e| unavailable(format!("failed to parse response from {}: {}", url, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_huggingface() {
        let spec = resolve_model("gpt2").unwrap().unwrap();
        assert_eq!(spec.model_id, "openai-community/gpt2");
        assert_eq!(spec.provider, ProviderKind::HuggingFace);

        let spec = resolve_model("distilgpt2").unwrap().unwrap();
        assert_eq!(spec.short_name, "distilgpt2");
        assert_eq!(spec.provider, ProviderKind::HuggingFace);
    }

    #[test]
    fn test_resolve_model_openai() {
        let spec = resolve_model("gpt-4o-mini").unwrap().unwrap();
        assert_eq!(spec.model_id, "gpt-4o-mini");
        assert_eq!(spec.provider, ProviderKind::OpenAI);
    }

    #[test]
    fn test_resolve_model_none_and_unknown() {
        assert!(resolve_model("none").unwrap().is_none());
        assert!(resolve_model("off").unwrap().is_none());
        assert!(resolve_model("gpt-3").is_err());
    }

    #[test]
    fn test_prompt_embeds_summary() {
        let prompt = build_prompt("Age Group: 18 - 22, Career Interests: Technology");
        assert!(prompt.contains("Profile: Age Group: 18 - 22, Career Interests: Technology"));
        assert!(prompt.ends_with("Recommendation:"));
    }

    #[test]
    fn test_clean_output_rejects_blank() {
        assert_eq!(clean_output("  Study IT.\n").unwrap(), "Study IT.");
        assert!(matches!(
            clean_output(" \n "),
            Err(AssistantError::RecommendationUnavailable(_))
        ));
    }

    #[test]
    fn test_huggingface_provider_requires_token() {
        let original = env::var("HF_API_TOKEN").ok();
        unsafe { env::remove_var("HF_API_TOKEN"); }

        let result =
            HuggingFaceProvider::new("openai-community/gpt2".to_string(), DEFAULT_INFERENCE_URL);

        if let Some(val) = original {
            unsafe { env::set_var("HF_API_TOKEN", val); }
        }

        let err = result.unwrap_err();
        assert!(matches!(err, AssistantError::RecommendationUnavailable(_)));
        assert!(err.to_string().contains("HF_API_TOKEN"));
    }

    #[test]
    fn test_huggingface_endpoint_joins_model() {
        let provider = HuggingFaceProvider::with_token(
            "distilbert/distilgpt2".to_string(),
            "http://localhost:8080/models/",
            "test-token".to_string(),
        );
        assert_eq!(provider.endpoint, "http://localhost:8080/models/distilbert/distilgpt2");
        assert_eq!(provider.model_name(), "distilbert/distilgpt2");
    }

    #[test]
    fn test_unreachable_endpoint_is_unavailable() {
        // Nothing listens on port 1, so the connection is refused at once.
        let provider = HuggingFaceProvider::with_token(
            "openai-community/gpt2".to_string(),
            "http://127.0.0.1:1/models",
            "test-token".to_string(),
        );
        let err = provider.recommend("Age Group: 18 - 22").unwrap_err();
        assert!(matches!(err, AssistantError::RecommendationUnavailable(_)));
        assert!(err.to_string().contains("http://127.0.0.1:1/models/openai-community/gpt2"));
    }

    #[test]
    fn test_chat_request_body() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            max_tokens: MAX_NEW_TOKENS,
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt("Age Group: 65+"),
            }],
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 200);
        assert_eq!(body["messages"][0]["role"], "user");

        let reply: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": " Study nursing. "}}]}"#,
        )
        .unwrap();
        assert_eq!(clean_output(&reply.choices[0].message.content).unwrap(), "Study nursing.");
    }

    #[test]
    fn test_openai_provider_requires_api_key() {
        let original = env::var("OPENAI_API_KEY").ok();
        unsafe { env::remove_var("OPENAI_API_KEY"); }

        let result = OpenAIProvider::new("gpt-4o".to_string());

        if let Some(val) = original {
            unsafe { env::set_var("OPENAI_API_KEY", val); }
        }

        assert!(result.unwrap_err().to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    #[ignore] // Needs network access and HF_API_TOKEN
    fn test_huggingface_live() {
        let provider =
            HuggingFaceProvider::new("openai-community/gpt2".to_string(), DEFAULT_INFERENCE_URL)
                .unwrap();
        let text = provider
            .recommend(
                "Age Group: 18 - 22, Marital Status: Single, Education: Undergraduate, \
                 Employment: Student, Career Interests: Technology",
            )
            .unwrap();
        assert!(!text.is_empty());
    }
}
