//! Gemini-backed implementation of the advisory service.
//!
//! Each flow sends a single prompt to the `generateContent` endpoint and
//! asks for a JSON response matching the flow's output schema. Calls carry
//! a hard client-side timeout; there are no automatic retries.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use super::{
    analysis_prompt, help_prompt, steps_prompt, AdvisorError, AdvisoryService, AnalyzeLogRequest,
    HelpAnswer, HelpRequest, LogAnalysis, StepsRequest, TroubleshootingGuide,
};
use crate::config::AdvisorConfig;

pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Build a client from config. Returns `NotConfigured` if no API key
    /// was supplied.
    pub fn from_config(config: &AdvisorConfig) -> Result<Self, AdvisorError> {
        let api_key = config.api_key.clone().ok_or(AdvisorError::NotConfigured)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Send a prompt and parse the model's JSON reply into `T`.
    async fn generate<T: DeserializeOwned>(
        &self,
        prompt: String,
        response_schema: serde_json::Value,
    ) -> Result<T, AdvisorError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema,
            },
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Advisory provider returned an error");
            return Err(AdvisorError::Provider { status, body });
        }

        let reply: GenerateContentResponse = response.json().await?;
        let text = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| AdvisorError::Malformed("response contained no candidates".into()))?;

        serde_json::from_str(&text)
            .map_err(|e| AdvisorError::Malformed(format!("candidate text is not valid JSON: {e}")))
    }
}

#[async_trait]
impl AdvisoryService for GeminiClient {
    async fn analyze_error_log(
        &self,
        input: AnalyzeLogRequest,
    ) -> Result<LogAnalysis, AdvisorError> {
        let schema = json!({
            "type": "object",
            "properties": {
                "rootCause": { "type": "string" },
                "potentialSolutions": { "type": "string" },
            },
            "required": ["rootCause", "potentialSolutions"],
        });
        self.generate(analysis_prompt(&input), schema).await
    }

    async fn troubleshooting_steps(
        &self,
        input: StepsRequest,
    ) -> Result<TroubleshootingGuide, AdvisorError> {
        let schema = json!({
            "type": "object",
            "properties": { "steps": { "type": "string" } },
            "required": ["steps"],
        });
        self.generate(steps_prompt(&input), schema).await
    }

    async fn general_help(&self, input: HelpRequest) -> Result<HelpAnswer, AdvisorError> {
        let schema = json!({
            "type": "object",
            "properties": { "answer": { "type": "string" } },
            "required": ["answer"],
        });
        self.generate(help_prompt(&input), schema).await
    }
}

#[derive(Debug, serde::Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, serde::Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, serde::Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, serde::Deserialize)]
struct Part {
    text: String,
}
