use serde::{Deserialize, Serialize};

/// Directory query. Text filters match case-insensitive substrings;
/// `language` must be one of the doctor's languages exactly.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorFilter {
    pub specialty: Option<String>,
    pub location: Option<String>,
    pub search: Option<String>,
    pub min_rating: Option<f64>,
    pub max_price: Option<f64>,
    pub language: Option<String>,
}
