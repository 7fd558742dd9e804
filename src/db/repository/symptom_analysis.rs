use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{string_list_col, string_list_json, uuid_col};
use crate::db::DatabaseError;
use crate::models::SymptomAnalysis;

fn analysis_from_row(row: &Row<'_>) -> rusqlite::Result<SymptomAnalysis> {
    Ok(SymptomAnalysis {
        id: uuid_col(row, 0)?,
        patient_id: uuid_col(row, 1)?,
        symptoms: row.get(2)?,
        ai_response: row.get(3)?,
        recommended_specialties: string_list_col(row, 4)?,
        created_at: row.get(5)?,
    })
}

pub fn insert_symptom_analysis(
    conn: &Connection,
    analysis: &SymptomAnalysis,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO symptom_analyses (id, patient_id, symptoms, ai_response,
             recommended_specialties, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            analysis.id.to_string(),
            analysis.patient_id.to_string(),
            analysis.symptoms,
            analysis.ai_response,
            string_list_json(&analysis.recommended_specialties),
            analysis.created_at,
        ],
    )?;
    Ok(())
}

/// A patient's analyses, newest first.
pub fn list_symptom_analyses(
    conn: &Connection,
    patient_id: &Uuid,
    limit: u32,
) -> Result<Vec<SymptomAnalysis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, symptoms, ai_response, recommended_specialties, created_at
         FROM symptom_analyses
         WHERE patient_id = ?1
         ORDER BY created_at DESC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string(), limit], analysis_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// One analysis, only if it belongs to `patient_id`.
pub fn get_symptom_analysis(
    conn: &Connection,
    id: &Uuid,
    patient_id: &Uuid,
) -> Result<Option<SymptomAnalysis>, DatabaseError> {
    let analysis = conn
        .query_row(
            "SELECT id, patient_id, symptoms, ai_response, recommended_specialties, created_at
             FROM symptom_analyses
             WHERE id = ?1 AND patient_id = ?2",
            params![id.to_string(), patient_id.to_string()],
            analysis_from_row,
        )
        .optional()?;
    Ok(analysis)
}
