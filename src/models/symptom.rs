use serde::Serialize;
use uuid::Uuid;

/// Stored result of an AI symptom triage request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomAnalysis {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub patient_id: Uuid,
    pub symptoms: String,
    pub ai_response: String,
    pub recommended_specialties: Vec<String>,
    pub created_at: String,
}
