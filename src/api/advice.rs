//! Troubleshooting endpoints backed by the advisory service.
//!
//! All three require an authenticated session. Advisory failures surface
//! as one generic retry-suggesting message; raw provider errors stay in
//! the logs.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::advisor::{
    AnalyzeLogRequest, HelpAnswer, HelpRequest, LogAnalysis, StepsRequest, TroubleshootingGuide,
};
use crate::api::auth::CurrentUser;
use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation;
use crate::AppState;

/// Combined response for log analysis: the root-cause analysis plus the
/// step-by-step guide generated from it.
#[derive(Debug, Serialize)]
pub struct AnalyzeLogResponse {
    pub analysis: LogAnalysis,
    pub steps: TroubleshootingGuide,
}

/// Analyze an error log and generate troubleshooting steps for it
///
/// POST /api/advice/analyze-log
pub async fn analyze_log(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeLogRequest>,
) -> Result<Json<AnalyzeLogResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validation::validate_error_log(&request.error_log) {
        errors.add("errorLog", e);
    }
    if let Err(e) = validation::validate_minecraft_version(&request.minecraft_version) {
        errors.add("minecraftVersion", e);
    }
    errors.finish()?;

    tracing::info!(user = %user.email, modloader = %request.modloader, "Analyzing error log");

    let minecraft_version = request.minecraft_version.clone();
    let modloader = request.modloader;
    let analysis = state.advisor.analyze_error_log(request).await?;

    // The step generator consumes the analysis as one text block.
    let steps = state
        .advisor
        .troubleshooting_steps(StepsRequest {
            analysis: format!("{}\n{}", analysis.root_cause, analysis.potential_solutions),
            minecraft_version,
            modloader,
        })
        .await?;

    Ok(Json(AnalyzeLogResponse { analysis, steps }))
}

/// Generate troubleshooting steps from an existing analysis
///
/// POST /api/advice/troubleshooting-steps
pub async fn troubleshooting_steps(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
    Json(request): Json<StepsRequest>,
) -> Result<Json<TroubleshootingGuide>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if request.analysis.trim().is_empty() {
        errors.add("analysis", "Analysis is required");
    }
    if let Err(e) = validation::validate_minecraft_version(&request.minecraft_version) {
        errors.add("minecraftVersion", e);
    }
    errors.finish()?;

    tracing::info!(user = %user.email, "Generating troubleshooting steps");

    let guide = state.advisor.troubleshooting_steps(request).await?;
    Ok(Json(guide))
}

/// Answer a general Minecraft question, with caller-supplied history
///
/// POST /api/advice/general-help
pub async fn general_help(
    CurrentUser(user): CurrentUser,
    State(state): State<Arc<AppState>>,
    Json(request): Json<HelpRequest>,
) -> Result<Json<HelpAnswer>, ApiError> {
    if let Err(e) = validation::validate_question(&request.question) {
        return Err(ApiError::validation_field("question", e));
    }

    tracing::info!(user = %user.email, turns = request.history.len(), "Answering help question");

    let answer = state.advisor.general_help(request).await?;
    Ok(Json(answer))
}
