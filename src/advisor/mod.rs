//! AI advisory service boundary.
//!
//! The service is an external collaborator: callers hand it a structured
//! troubleshooting request, it returns structured text. It holds no state
//! across calls; conversation history is supplied by the caller each time.

mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("advisory service is not configured")]
    NotConfigured,
    #[error("advisory request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("advisory service returned {status}: {body}")]
    Provider {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("malformed advisory response: {0}")]
    Malformed(String),
}

/// The closed set of modloaders the prompts know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modloader {
    Forge,
    Fabric,
    Quilt,
    Vanilla,
    NeoForge,
}

impl std::fmt::Display for Modloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Modloader::Forge => "Forge",
            Modloader::Fabric => "Fabric",
            Modloader::Quilt => "Quilt",
            Modloader::Vanilla => "Vanilla",
            Modloader::NeoForge => "NeoForge",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeLogRequest {
    pub error_log: String,
    pub minecraft_version: String,
    pub modloader: Modloader,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogAnalysis {
    pub root_cause: String,
    pub potential_solutions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepsRequest {
    pub analysis: String,
    pub minecraft_version: String,
    pub modloader: Modloader,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TroubleshootingGuide {
    pub steps: String,
}

/// One prior question/answer exchange, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpExchange {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpRequest {
    pub question: String,
    #[serde(default)]
    pub history: Vec<HelpExchange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpAnswer {
    pub answer: String,
}

#[async_trait]
pub trait AdvisoryService: Send + Sync {
    async fn analyze_error_log(
        &self,
        input: AnalyzeLogRequest,
    ) -> Result<LogAnalysis, AdvisorError>;

    async fn troubleshooting_steps(
        &self,
        input: StepsRequest,
    ) -> Result<TroubleshootingGuide, AdvisorError>;

    async fn general_help(&self, input: HelpRequest) -> Result<HelpAnswer, AdvisorError>;
}

/// Stand-in used when no provider credentials are configured. Every call
/// fails with `NotConfigured`, which callers surface as the usual generic
/// service failure.
pub struct UnconfiguredAdvisor;

#[async_trait]
impl AdvisoryService for UnconfiguredAdvisor {
    async fn analyze_error_log(
        &self,
        _input: AnalyzeLogRequest,
    ) -> Result<LogAnalysis, AdvisorError> {
        Err(AdvisorError::NotConfigured)
    }

    async fn troubleshooting_steps(
        &self,
        _input: StepsRequest,
    ) -> Result<TroubleshootingGuide, AdvisorError> {
        Err(AdvisorError::NotConfigured)
    }

    async fn general_help(&self, _input: HelpRequest) -> Result<HelpAnswer, AdvisorError> {
        Err(AdvisorError::NotConfigured)
    }
}

pub(crate) fn analysis_prompt(input: &AnalyzeLogRequest) -> String {
    format!(
        "You are a Minecraft expert specializing in analyzing error logs.\n\
         \n\
         You will use the provided error log, Minecraft version, and modloader to identify \
         the root cause of the issue and suggest potential solutions.\n\
         \n\
         Error Log:\n{}\n\
         \n\
         Minecraft Version: {}\n\
         Modloader: {}\n\
         \n\
         Identify the root cause of the issue and suggest potential solutions.",
        input.error_log, input.minecraft_version, input.modloader
    )
}

pub(crate) fn steps_prompt(input: &StepsRequest) -> String {
    format!(
        "You are an AI expert in Minecraft troubleshooting. Generate a step-by-step guide to \
         resolve the identified issues based on the error analysis, Minecraft version, and \
         modloader type. Include links to download missing dependencies from trusted sources \
         when available.\n\
         \n\
         Error Analysis: {}\n\
         Minecraft Version: {}\n\
         Modloader: {}\n\
         \n\
         Troubleshooting Steps:",
        input.analysis, input.minecraft_version, input.modloader
    )
}

pub(crate) fn help_prompt(input: &HelpRequest) -> String {
    let mut prompt = String::from(
        "You are an AI expert in Minecraft. A user has a general question about fixing an \
         issue or making a change. Provide a clear, step-by-step solution.\n",
    );

    if !input.history.is_empty() {
        prompt.push_str("\nThis is the conversation history, use it for context:\n");
        for exchange in &input.history {
            prompt.push_str(&format!(
                "User: {}\nAI: {}\n",
                exchange.question, exchange.answer
            ));
        }
    }

    prompt.push_str(&format!(
        "\nUser's current question:\n{}\n\nProvide your answer:",
        input.question
    ));
    prompt
}
