//! Symptom triage: ask the completion service for a structured assessment,
//! fall back to a canned referral when it cannot answer.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Advisor, ChatMessage, CompletionRequest};
use crate::db::repository::{get_symptom_analysis, insert_symptom_analysis, list_symptom_analyses};
use crate::db::{now_timestamp, DatabaseError};
use crate::models::SymptomAnalysis;
use crate::validation::{self, FieldError};

pub const HISTORY_LIMIT: u32 = 20;

const SYSTEM_PROMPT: &str = "Eres un asistente médico oftalmológico profesional. \
Proporciona análisis útiles pero siempre recomienda consultar con un especialista.";

const FALLBACK_RESPONSE: &str = "Basado en tus síntomas, te recomiendo consultar con un \
oftalmólogo especialista. Los síntomas que describes pueden estar relacionados con varias \
condiciones oculares que requieren evaluación profesional. Por favor, agenda una cita con un \
especialista para un diagnóstico preciso.";

const FALLBACK_SPECIALTIES: &[&str] = &[
    "Oftalmología General",
    "Córnea y Enfermedades Externas",
    "Oftalmología Pediátrica",
];

pub const SYMPTOM_SUGGESTIONS: &[&str] = &[
    "Dolor de cabeza con problemas de visión",
    "Ojos rojos y picazón",
    "Visión borrosa al leer",
    "Sensibilidad a la luz",
    "Lagrimeo excesivo",
    "Dolor al mover los ojos",
    "Visión doble",
    "Ojos secos y ardor",
    "Manchas en la visión",
    "Dificultad para ver de noche",
];

/// Outcome of one triage request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomAssessment {
    pub ai_response: String,
    pub recommended_specialties: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    /// True when the canned response was used instead of the service.
    pub fallback: bool,
}

/// Shape the model is asked to answer in. Extra keys are ignored.
#[derive(Deserialize)]
struct StructuredReply {
    #[serde(default)]
    specialties: Vec<String>,
    recommendation: Option<String>,
    urgency: Option<String>,
}

fn build_prompt(symptoms: &str) -> String {
    format!(
        "Analiza los siguientes síntomas oculares de un paciente y responde ÚNICAMENTE \
con un JSON válido con la estructura:\n\
{{\"conditions\": [\"2-4 posibles condiciones oculares\"], \
\"specialties\": [\"especialidades oftalmológicas relevantes\"], \
\"advice\": \"cuidados inmediatos\", \
\"urgency\": \"bajo|medio|alto|emergencia\", \
\"recommendation\": \"próximos pasos y especialista a consultar\", \
\"warning_signs\": \"señales de alarma\", \
\"home_care\": \"cuidados en casa\"}}\n\n\
SÍNTOMAS DEL PACIENTE: \"{symptoms}\"\n\n\
Enfócate solo en oftalmología y recomienda siempre una consulta presencial."
    )
}

/// Strip a Markdown code fence the model may wrap its JSON in.
fn unfence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Parsed reply → recommendation + specialties. Unparseable replies pass through as text.
fn interpret(raw: String) -> SymptomAssessment {
    match serde_json::from_str::<StructuredReply>(unfence(&raw)) {
        Ok(reply) => SymptomAssessment {
            ai_response: reply.recommendation.unwrap_or(raw),
            recommended_specialties: reply.specialties,
            urgency: reply.urgency,
            fallback: false,
        },
        Err(_) => {
            tracing::debug!("Symptom reply was not JSON, returning raw text");
            SymptomAssessment {
                ai_response: raw,
                recommended_specialties: Vec::new(),
                urgency: None,
                fallback: false,
            }
        }
    }
}

pub fn fallback_assessment() -> SymptomAssessment {
    SymptomAssessment {
        ai_response: FALLBACK_RESPONSE.to_string(),
        recommended_specialties: FALLBACK_SPECIALTIES.iter().map(|s| s.to_string()).collect(),
        urgency: None,
        fallback: true,
    }
}

/// Validated, trimmed symptom description (10–2000 chars).
pub fn validate_symptoms(symptoms: &str) -> Result<String, FieldError> {
    validation::text_in_range("symptoms", symptoms, 10, 2000)
}

/// Ask for an assessment. Never fails; upstream errors produce the fallback.
pub fn analyze(advisor: &Advisor, symptoms: &str) -> SymptomAssessment {
    let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(build_prompt(symptoms))];
    let request = CompletionRequest {
        model: advisor.symptom_model(),
        messages: &messages,
        max_tokens: 500,
        temperature: 0.3,
    };
    match advisor.client().complete(&request) {
        Ok(raw) => interpret(raw),
        Err(e) => {
            tracing::warn!(error = %e, "Symptom analysis unavailable, using fallback");
            fallback_assessment()
        }
    }
}

/// Persist an assessment for an authenticated patient.
pub fn record(
    conn: &Connection,
    patient_id: &Uuid,
    symptoms: &str,
    assessment: &SymptomAssessment,
) -> Result<SymptomAnalysis, DatabaseError> {
    let analysis = SymptomAnalysis {
        id: Uuid::new_v4(),
        patient_id: *patient_id,
        symptoms: symptoms.to_string(),
        ai_response: assessment.ai_response.clone(),
        recommended_specialties: assessment.recommended_specialties.clone(),
        created_at: now_timestamp(),
    };
    insert_symptom_analysis(conn, &analysis)?;
    Ok(analysis)
}

pub fn history(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<SymptomAnalysis>, DatabaseError> {
    list_symptom_analyses(conn, patient_id, HISTORY_LIMIT)
}

pub fn history_entry(
    conn: &Connection,
    patient_id: &Uuid,
    id: &Uuid,
) -> Result<Option<SymptomAnalysis>, DatabaseError> {
    get_symptom_analysis(conn, id, patient_id)
}
