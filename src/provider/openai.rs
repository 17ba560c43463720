use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Client,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{
    schema::{meal_function_parameters, MEAL_FUNCTION_NAME},
    Completion, CompletionRequest, GeneratedImage, ImageProvider, MealProvider, ProviderError,
};
use crate::config::OpenAiConfig;

const PROVIDER: &str = "openai";
pub const IMAGE_SIZE: &str = "1024x1024";

/// OpenAI-compatible client for chat completions and image generations.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    image_model: String,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: &OpenAiConfig, client: Client) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            image_model: config.image_model.clone(),
        }
    }

    fn headers(&self) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|e| {
            ProviderError::Invariant(PROVIDER, format!("invalid API key header value: {e}"))
        })?;
        headers.insert(header::AUTHORIZATION, auth);
        Ok(headers)
    }

    async fn send_json<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::StatusCode(
                status,
                response.text().await.unwrap_or_default(),
            ));
        }
        Ok(response.json::<R>().await?)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessageParam<'a>; 2],
    tools: [ToolParam; 1],
    tool_choice: Value,
}

#[derive(Debug, Serialize)]
struct ChatMessageParam<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ToolParam {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionParam,
}

#[derive(Debug, Serialize)]
struct FunctionParam {
    name: &'static str,
    description: &'static str,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
    // legacy `functions` API
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'static str,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

fn build_chat_request<'a>(model: &'a str, req: &'a CompletionRequest) -> ChatCompletionRequest<'a> {
    let tool_choice = if req.force_function {
        json!({ "type": "function", "function": { "name": MEAL_FUNCTION_NAME } })
    } else {
        json!("auto")
    };
    ChatCompletionRequest {
        model,
        messages: [
            ChatMessageParam {
                role: "system",
                content: &req.system,
            },
            ChatMessageParam {
                role: "user",
                content: &req.user,
            },
        ],
        tools: [ToolParam {
            kind: "function",
            function: FunctionParam {
                name: MEAL_FUNCTION_NAME,
                description: "Create exactly one meal",
                parameters: meal_function_parameters(&req.meal_types),
            },
        }],
        tool_choice,
    }
}

fn completion_from_response(resp: ChatCompletionResponse) -> Result<Completion, ProviderError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Invariant(PROVIDER, "no choices in response".into()))?;
    let AssistantMessage {
        content,
        tool_calls,
        function_call,
    } = choice.message;

    let call = tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|c| c.function)
        .chain(function_call)
        .find(|f| f.name.is_empty() || f.name == MEAL_FUNCTION_NAME);

    Ok(Completion {
        arguments: call.map(|f| f.arguments),
        content: content.filter(|c| !c.trim().is_empty()),
    })
}

#[async_trait]
impl MealProvider for OpenAiProvider {
    #[instrument(skip_all, fields(model = %self.model, forced = request.force_function))]
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let body = build_chat_request(&self.model, request);
        let resp: ChatCompletionResponse = self.send_json("/chat/completions", &body).await?;
        let completion = completion_from_response(resp)?;
        debug!(
            has_call = completion.arguments.is_some(),
            has_text = completion.content.is_some(),
            "chat completion received"
        );
        Ok(completion)
    }
}

#[async_trait]
impl ImageProvider for OpenAiProvider {
    #[instrument(skip_all, fields(model = %self.image_model))]
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        let body = ImageGenerationRequest {
            model: &self.image_model,
            prompt,
            n: 1,
            size: IMAGE_SIZE,
            response_format: "b64_json",
        };
        let resp: ImageGenerationResponse = self.send_json("/images/generations", &body).await?;
        let data = resp
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Invariant(PROVIDER, "no image in response".into()))?;

        match (data.b64_json, data.url) {
            (Some(b64), _) => Ok(GeneratedImage::Encoded {
                bytes: Bytes::from(STANDARD.decode(b64.as_bytes())?),
                content_type: "image/png",
            }),
            (None, Some(url)) => Ok(GeneratedImage::Url(url)),
            (None, None) => Err(ProviderError::Invariant(
                PROVIDER,
                "image entry has neither b64_json nor url".into(),
            )),
        }
    }
}

#[cfg(test)]
mod openai_tests {
    use super::*;
    use crate::meals::model::MealType;

    fn request(force: bool) -> CompletionRequest {
        CompletionRequest {
            system: "sys".into(),
            user: "make lunch".into(),
            meal_types: vec![MealType::Lunch, MealType::Dinner],
            force_function: force,
        }
    }

    #[test]
    fn chat_request_forces_meal_function() {
        let req = request(true);
        let v = serde_json::to_value(build_chat_request("gpt-test", &req)).unwrap();
        assert_eq!(v["model"], "gpt-test");
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["content"], "make lunch");
        assert_eq!(v["tools"][0]["function"]["name"], MEAL_FUNCTION_NAME);
        assert_eq!(v["tool_choice"]["function"]["name"], MEAL_FUNCTION_NAME);

        let auto = request(false);
        let v = serde_json::to_value(build_chat_request("gpt-test", &auto)).unwrap();
        assert_eq!(v["tool_choice"], "auto");
    }

    #[test]
    fn completion_extracts_tool_call_arguments() {
        let resp: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "create_meal", "arguments": "{\"meal\":{}}" }
                    }]
                }
            }]
        }))
        .unwrap();
        let c = completion_from_response(resp).unwrap();
        assert_eq!(c.arguments.as_deref(), Some("{\"meal\":{}}"));
        assert!(c.content.is_none());
    }

    #[test]
    fn completion_falls_back_to_legacy_function_call_and_text() {
        let resp: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": "Here you go",
                    "function_call": { "name": "create_meal", "arguments": "not json" }
                }
            }]
        }))
        .unwrap();
        let c = completion_from_response(resp).unwrap();
        assert_eq!(c.arguments.as_deref(), Some("not json"));
        assert_eq!(c.content.as_deref(), Some("Here you go"));
    }

    #[test]
    fn completion_without_choices_is_invariant_error() {
        let resp: ChatCompletionResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(matches!(
            completion_from_response(resp),
            Err(ProviderError::Invariant(PROVIDER, _))
        ));
    }
}
