//! Symptom triage endpoints.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::advisory::symptoms::{self, SymptomAssessment};
use crate::api::error::ApiError;
use crate::api::types::{blocking, with_db, ApiContext, ApiJson, ApiPath};
use crate::authorization::CallerContext;
use crate::models::SymptomAnalysis;

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub symptoms: String,
}

#[derive(Serialize)]
pub struct AnalysisPayload {
    pub symptoms: String,
    #[serde(flatten)]
    pub assessment: SymptomAssessment,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub analysis: AnalysisPayload,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub history: Vec<SymptomAnalysis>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct HistoryEntryResponse {
    pub analysis: SymptomAnalysis,
}

#[derive(Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: &'static [&'static str],
}

/// `POST /api/symptoms/analyze` — optional auth. Authenticated analyses are
/// stored; a storage failure is logged and does not fail the request.
pub async fn analyze(
    State(ctx): State<ApiContext>,
    caller: Option<Extension<CallerContext>>,
    ApiJson(req): ApiJson<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let text = symptoms::validate_symptoms(&req.symptoms)?;
    let patient_id = caller.map(|Extension(c)| c.id);
    let core = ctx.core.clone();

    let (text, assessment) = blocking(move || {
        let assessment = symptoms::analyze(core.advisor(), &text);
        if let Some(patient_id) = patient_id {
            let stored = core
                .open_db()
                .map_err(|e| e.to_string())
                .and_then(|conn| {
                    symptoms::record(&conn, &patient_id, &text, &assessment)
                        .map_err(|e| e.to_string())
                });
            if let Err(e) = stored {
                tracing::error!(
                    error = %e,
                    patient_id = %patient_id,
                    "Failed to store symptom analysis"
                );
            }
        }
        Ok((text, assessment))
    })
    .await?;

    Ok(Json(AnalyzeResponse {
        analysis: AnalysisPayload {
            symptoms: text,
            assessment,
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
    }))
}

/// `GET /api/symptoms/history`
pub async fn history(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = with_db(&ctx.core, move |conn| Ok(symptoms::history(conn, &caller.id)?)).await?;
    Ok(Json(HistoryResponse {
        total: history.len(),
        history,
    }))
}

/// `GET /api/symptoms/history/:id` — only the caller's own entries.
pub async fn history_entry(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<HistoryEntryResponse>, ApiError> {
    let analysis = with_db(&ctx.core, move |conn| {
        Ok(symptoms::history_entry(conn, &caller.id, &id)?)
    })
    .await?
    .ok_or_else(|| ApiError::NotFound("Analysis not found".into()))?;
    Ok(Json(HistoryEntryResponse { analysis }))
}

/// `GET /api/symptoms/suggestions`
pub async fn suggestions() -> Json<SuggestionsResponse> {
    Json(SuggestionsResponse {
        suggestions: symptoms::SYMPTOM_SUGGESTIONS,
    })
}
