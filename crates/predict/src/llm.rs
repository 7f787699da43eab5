use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::schema::ChatMessage;

#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerationOptions {
    num_predict: usize,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    raw: bool, // plain completion, no chat template
    options: GenerationOptions,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: String,
    messages: &'a [ChatMessage],
    stream: bool,
    options: GenerationOptions,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
        }
    }

    /// Complete a raw prompt.
    pub async fn generate(&self, prompt: &str, max_new_tokens: usize) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            raw: true,
            options: GenerationOptions { num_predict: max_new_tokens },
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            anyhow::bail!("Ollama request failed: {}", response.status());
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(ollama_response.response)
    }

    /// Run a chat turn; the server applies the model's chat template and
    /// stop tokens.
    pub async fn chat(&self, messages: &[ChatMessage], max_new_tokens: usize) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            options: GenerationOptions { num_predict: max_new_tokens },
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send chat request to Ollama")?;

        if !response.status().is_success() {
            anyhow::bail!("Ollama chat request failed: {}", response.status());
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama chat response")?;

        Ok(chat_response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_sends_raw_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3",
                "prompt": "Capital of France?",
                "raw": true,
                "options": {"num_predict": 16}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": " Paris", "done": true
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri(), "llama3".to_string());
        assert_eq!(client.generate("Capital of France?", 16).await.unwrap(), " Paris");
    }

    #[tokio::test]
    async fn test_chat_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": "Spain, Andorra"},
                "done": true
            })))
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri(), "llama3".to_string());
        let reply = client.chat(&[ChatMessage::user("Neighbours of France?")], 16).await.unwrap();
        assert_eq!(reply, "Spain, Andorra");
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = OllamaClient::new(server.uri(), "llama3".to_string());
        assert!(client.generate("x", 4).await.is_err());
    }
}
