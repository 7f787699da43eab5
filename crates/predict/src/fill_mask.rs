use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::schema::FillMaskCandidate;

/// Client for a fill-mask inference endpoint speaking the Hugging Face
/// inference API shape (`POST {base_url}/models/{model}`).
#[derive(Clone)]
pub struct FillMaskClient {
    base_url: String,
    model: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct FillMaskParameters {
    top_k: usize,
}

#[derive(Serialize)]
struct FillMaskRequest<'a> {
    inputs: &'a [String],
    parameters: FillMaskParameters,
}

/// A single input comes back as a flat list, several inputs as a list of lists.
#[derive(Deserialize)]
#[serde(untagged)]
enum FillMaskResponse {
    Batch(Vec<Vec<FillMaskCandidate>>),
    Single(Vec<FillMaskCandidate>),
}

impl FillMaskClient {
    pub fn new(base_url: String, model: String, api_token: Option<String>) -> Self {
        Self {
            base_url,
            model,
            api_token,
            client: reqwest::Client::new(),
        }
    }

    /// Ranked candidates for each prompt, in input order.
    pub async fn fill_mask(&self, prompts: &[String], top_k: usize) -> Result<Vec<Vec<FillMaskCandidate>>> {
        if prompts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/models/{}", self.base_url, self.model);

        let request = FillMaskRequest {
            inputs: prompts,
            parameters: FillMaskParameters { top_k },
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .context("Failed to send fill-mask request")?;

        if !response.status().is_success() {
            anyhow::bail!("Fill-mask request failed: {}", response.status());
        }

        let parsed: FillMaskResponse = response
            .json()
            .await
            .context("Failed to parse fill-mask response")?;

        let outputs = match parsed {
            FillMaskResponse::Batch(outputs) => outputs,
            FillMaskResponse::Single(candidates) => vec![candidates],
        };

        if outputs.len() != prompts.len() {
            anyhow::bail!(
                "Fill-mask endpoint returned {} results for {} prompts",
                outputs.len(),
                prompts.len()
            );
        }

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_batch_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/bert-base-cased"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({"parameters": {"top_k": 2}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                [{"token_str": "Paris", "score": 0.8}, {"token_str": "Lyon", "score": 0.05}],
                [{"token_str": "Berlin", "score": 0.6}, {"token_str": "Bonn", "score": 0.2}]
            ])))
            .mount(&server)
            .await;

        let client = FillMaskClient::new(server.uri(), "bert-base-cased".to_string(), Some("secret".to_string()));
        let prompts = vec!["a [MASK]".to_string(), "b [MASK]".to_string()];
        let outputs = client.fill_mask(&prompts, 2).await.unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[1][0].token_str, "Berlin");
    }

    #[tokio::test]
    async fn test_single_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"token_str": "Paris", "score": 0.8, "sequence": "a Paris"}
            ])))
            .mount(&server)
            .await;

        let client = FillMaskClient::new(server.uri(), "bert-base-cased".to_string(), None);
        let outputs = client.fill_mask(&["a [MASK]".to_string()], 1).await.unwrap();
        assert_eq!(outputs[0][0].sequence.as_deref(), Some("a Paris"));
    }

    #[tokio::test]
    async fn test_count_mismatch_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                [{"token_str": "Paris", "score": 0.8}]
            ])))
            .mount(&server)
            .await;

        let client = FillMaskClient::new(server.uri(), "m".to_string(), None);
        let prompts = vec!["a".to_string(), "b".to_string()];
        assert!(client.fill_mask(&prompts, 1).await.is_err());
    }
}
