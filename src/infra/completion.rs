//! OpenAI-compatible chat completion client.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    application::answers::{CompletionError, CompletionRequest, CompletionService},
    config::CompletionSettings,
};

use super::error::InfraError;

const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// [`CompletionService`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpCompletionService {
    client: Client,
    url: Url,
    api_key: Option<String>,
}

impl HttpCompletionService {
    pub fn new(settings: &CompletionSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .build()
            .map_err(|err| InfraError::configuration(format!("http client: {err}")))?;
        let url = chat_url(&settings.endpoint)?;
        Ok(Self {
            client,
            url,
            api_key: settings.api_key.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("piazza/", env!("CARGO_PKG_VERSION"))
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &request.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let mut builder = self.client.post(self.url.clone()).json(&body);
        if let Some(key) = self.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| CompletionError::transport(err.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| CompletionError::transport(err.to_string()))?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            return Err(CompletionError::transport(format!(
                "status {status} body {text}"
            )));
        }

        extract_content(&bytes)
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    async fn invoke(
        &self,
        request: &CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<String, CompletionError> {
        debug!(
            target = "infra::completion",
            model = %request.model,
            max_tokens = request.max_tokens,
            "Sending completion request"
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CompletionError::Cancelled),
            result = self.send(request) => result,
        }
    }
}

fn chat_url(endpoint: &Url) -> Result<Url, InfraError> {
    let mut base = endpoint.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(CHAT_COMPLETIONS_PATH)
        .map_err(|err| InfraError::configuration(format!("completion endpoint: {err}")))
}

fn extract_content(bytes: &[u8]) -> Result<String, CompletionError> {
    let response: ChatResponse = serde_json::from_slice(bytes)
        .map_err(|err| CompletionError::transport(format!("failed to parse body: {err}")))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();
    if content.trim().is_empty() {
        return Err(CompletionError::EmptyResponse);
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_url_keeps_base_path() {
        let url = chat_url(&Url::parse("https://api.example.com/v1").unwrap()).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/chat/completions");

        let url = chat_url(&Url::parse("http://localhost:8080/").unwrap()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/chat/completions");
    }

    #[test]
    fn extracts_first_choice() {
        let body = br#"{"choices":[{"message":{"role":"assistant","content":"Hello"}},{"message":{"content":"ignored"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "Hello");
    }

    #[test]
    fn blank_or_missing_content_is_empty_response() {
        assert_eq!(
            extract_content(br#"{"choices":[{"message":{"content":"  \n"}}]}"#),
            Err(CompletionError::EmptyResponse)
        );
        assert_eq!(
            extract_content(br#"{"choices":[]}"#),
            Err(CompletionError::EmptyResponse)
        );
        assert_eq!(
            extract_content(br#"{"choices":[{"message":{"content":null}}]}"#),
            Err(CompletionError::EmptyResponse)
        );
    }

    #[test]
    fn malformed_body_is_transport_error() {
        assert!(matches!(
            extract_content(b"<html>bad gateway</html>"),
            Err(CompletionError::Transport { .. })
        ));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let settings = crate::config::CompletionSettings {
            endpoint: Url::parse("http://127.0.0.1:9").unwrap(),
            api_key: None,
            primary_model: "m".into(),
            secondary_model: "n".into(),
            timeout: std::time::Duration::from_secs(1),
            max_tokens: std::num::NonZeroU32::MIN,
            temperature: 0.0,
        };
        let service = HttpCompletionService::new(&settings).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = CompletionRequest {
            model: "m".into(),
            system_prompt: "s".into(),
            user_prompt: "u".into(),
            max_tokens: 1,
            temperature: 0.0,
        };
        assert_eq!(
            service.invoke(&request, cancel).await,
            Err(CompletionError::Cancelled)
        );
    }
}
