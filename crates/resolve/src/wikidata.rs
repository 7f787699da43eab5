use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://www.wikidata.org/w/api.php";

#[derive(Clone)]
pub struct WikidataClient {
    api_url: String,
    language: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    id: String,
}

impl WikidataClient {
    pub fn new(api_url: String, language: String, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("lm-kbc-baseline/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build Wikidata HTTP client")?;

        Ok(Self {
            api_url,
            language,
            client,
        })
    }

    /// Run `wbsearchentities` for a label and return the top hit's ID, if any.
    pub async fn search(&self, label: &str) -> Result<Option<String>> {
        let response = self.client
            .get(&self.api_url)
            .query(&[
                ("action", "wbsearchentities"),
                ("search", label),
                ("language", self.language.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .context("Failed to send request to Wikidata")?;

        if !response.status().is_success() {
            anyhow::bail!("Wikidata request failed: {}", response.status());
        }

        let search_response: SearchResponse = response
            .json()
            .await
            .context("Failed to parse Wikidata response")?;

        // First hit only
        Ok(search_response.search.into_iter().next().map(|hit| hit.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_search_returns_first_hit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "wbsearchentities"))
            .and(query_param("search", "Paris"))
            .and(query_param("language", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "search": [{"id": "Q90", "label": "Paris"}, {"id": "Q167646", "label": "Paris"}]
            })))
            .mount(&server)
            .await;

        let client = WikidataClient::new(server.uri(), "en".to_string(), 5).unwrap();
        assert_eq!(client.search("Paris").await.unwrap(), Some("Q90".to_string()));
    }

    #[tokio::test]
    async fn test_search_without_hits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"search": []})))
            .mount(&server)
            .await;

        let client = WikidataClient::new(server.uri(), "en".to_string(), 5).unwrap();
        assert_eq!(client.search("zzzz").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_search_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = WikidataClient::new(server.uri(), "en".to_string(), 5).unwrap();
        assert!(client.search("Paris").await.is_err());
    }
}
