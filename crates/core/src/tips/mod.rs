//! Client for the AI care-tips endpoint.
//!
//! Tips are decoration: every failure degrades to an empty string and never
//! blocks placement.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{config::TipsConfig, Result};

/// Text shown in the tips panel while a request is in flight.
pub const TIPS_LOADING: &str = "AI tips loading...";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipsRequest {
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TipsResponse {
    #[serde(default)]
    pub assistant: Option<String>,
}

impl TipsResponse {
    pub fn into_text(self) -> String {
        self.assistant.unwrap_or_default()
    }
}

/// Prompt asking for short placement and care bullets for `plant`.
pub fn tips_prompt(plant: &str) -> String {
    format!("In AR, give short bullet tips to place and care for {plant}. Keep it 4-6 bullets, concise.")
}

/// Handle for a tips request tied to a selection generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipsTicket {
    pub generation: u64,
    pub plant: String,
}

impl TipsTicket {
    pub fn request(&self) -> TipsRequest {
        TipsRequest {
            message: tips_prompt(&self.plant),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TipsClient {
    http: reqwest::Client,
    url: String,
}

impl TipsClient {
    pub fn new(config: &TipsConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            http,
            url: config.url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self, request: &TipsRequest) -> Result<String> {
        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        let body: TipsResponse = response.json().await?;
        Ok(body.into_text())
    }

    /// Like [`TipsClient::fetch`] but maps every failure to an empty string.
    pub async fn fetch_or_empty(&self, request: &TipsRequest) -> String {
        match self.fetch(request).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(url = %self.url, error = %err, "AI tips request failed");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_the_plant() {
        let ticket = TipsTicket {
            generation: 3,
            plant: "Basil".to_string(),
        };
        assert_eq!(
            ticket.request().message,
            "In AR, give short bullet tips to place and care for Basil. Keep it 4-6 bullets, concise."
        );
    }

    #[test]
    fn response_without_assistant_is_empty() {
        let parsed: TipsResponse = serde_json::from_str(r#"{ "error": "quota" }"#).unwrap();
        assert_eq!(parsed.into_text(), "");
        let parsed: TipsResponse = serde_json::from_str(r#"{ "assistant": "- water daily" }"#).unwrap();
        assert_eq!(parsed.into_text(), "- water daily");
    }

    #[test]
    fn request_serialises_as_message_object() {
        let json = serde_json::to_value(TipsRequest {
            message: "hi".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "message": "hi" }));
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades_to_empty() {
        let client = TipsClient::new(&TipsConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();
        let text = client
            .fetch_or_empty(&TipsRequest {
                message: tips_prompt("Mint"),
            })
            .await;
        assert!(text.is_empty());
    }
}
