//! Axum route handlers for the caption workbench API.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::captions::parser::parse_response;
use crate::captions::safety::check_safety;
use crate::captions::scoring::{ScoreInput, ScoreSignal};
use crate::errors::AppError;
use crate::models::persona::PersonaVoiceProfile;
use crate::models::request::GenerationRequest;
use crate::models::variant::{SafetyReport, Variant};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateVariantsRequest {
    pub request: GenerationRequest,
    #[serde(default)]
    pub persona: Option<PersonaVoiceProfile>,
    /// Workbench session. A new batch for the same session cancels the old one.
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateVariantsResponse {
    pub variants: Vec<Variant>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateCaptionRequest {
    pub text: String,
    #[serde(default)]
    pub brief: String,
    #[serde(default)]
    pub target_audience: String,
}

#[derive(Debug, Serialize)]
pub struct EvaluateCaptionResponse {
    pub caption: String,
    pub hashtags: Vec<String>,
    pub score: u8,
    pub score_reasons: Vec<String>,
    pub signals: Vec<ScoreSignal>,
    pub safety: SafetyReport,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/captions/variants
///
/// Generates `requested_variant_count` scored, safety-checked caption variants.
/// Unsafe variants are returned flagged; filtering is the caller's call.
pub async fn handle_generate_variants(
    State(state): State<AppState>,
    Json(body): Json<GenerateVariantsRequest>,
) -> Result<Json<GenerateVariantsResponse>, AppError> {
    if body.request.brief.trim().is_empty() {
        return Err(AppError::Validation("brief cannot be empty".to_string()));
    }

    let max = state.config.max_variants_per_request;
    if body.request.requested_variant_count.get() > max {
        return Err(AppError::Validation(format!(
            "requested_variant_count cannot exceed {max}"
        )));
    }

    let batch = body
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|session_id| state.inflight.begin(session_id));
    let cancel = batch
        .as_ref()
        .map(|guard| guard.token().clone())
        .unwrap_or_default();

    let variants = state
        .orchestrator
        .generate_variants_cancellable(&body.request, body.persona.as_ref(), &cancel)
        .await?;

    Ok(Json(GenerateVariantsResponse {
        variants,
        generated_at: Utc::now(),
    }))
}

/// POST /api/v1/captions/evaluate
///
/// Re-scores and re-checks a caption without calling the provider,
/// e.g. after a human edits a variant before approving it.
pub async fn handle_evaluate_caption(
    State(state): State<AppState>,
    Json(body): Json<EvaluateCaptionRequest>,
) -> Result<Json<EvaluateCaptionResponse>, AppError> {
    let published = body.text.trim();
    if published.is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }

    let parsed = parse_response(published);
    let breakdown = state.scorer.score(&ScoreInput {
        text: published,
        brief: &body.brief,
        target_audience: &body.target_audience,
    });

    Ok(Json(EvaluateCaptionResponse {
        caption: parsed.caption,
        hashtags: parsed.hashtags,
        score: breakdown.score,
        score_reasons: breakdown.reasons,
        signals: breakdown.signals,
        safety: check_safety(published),
    }))
}
