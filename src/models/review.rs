use serde::Serialize;

/// Review as shown on a doctor's detail page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithPatient {
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: String,
    pub patient_name: String,
}
