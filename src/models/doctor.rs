use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Doctor profile extension, one per doctor user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub specialty: String,
    pub experience_years: Option<i64>,
    pub languages: Vec<String>,
    pub consultation_fee: Option<f64>,
    pub availability: Option<String>,
    pub rating: f64,
    pub reviews_count: i64,
    pub image_url: Option<String>,
    pub location: Option<String>,
}

impl DoctorProfile {
    /// Fresh profile with only a specialty; rating and review count start at zero.
    pub fn new(user_id: Uuid, specialty: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            specialty,
            experience_years: None,
            languages: Vec::new(),
            consultation_fee: None,
            availability: None,
            rating: 0.0,
            reviews_count: 0,
            image_url: None,
            location: None,
        }
    }
}

/// Directory row: profile joined with the owning user's contact fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorListing {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub specialty: String,
    pub location: Option<String>,
    #[serde(rename = "image")]
    pub image_url: Option<String>,
    pub rating: f64,
    #[serde(rename = "reviews")]
    pub reviews_count: i64,
    pub experience_years: Option<i64>,
    pub languages: Vec<String>,
    pub consultation_fee: Option<f64>,
    pub availability: Option<String>,
}

/// Editable profile fields. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfileFields {
    pub specialty: Option<String>,
    pub experience_years: Option<i64>,
    pub languages: Option<Vec<String>>,
    pub consultation_fee: Option<f64>,
    pub availability: Option<String>,
    pub image_url: Option<String>,
    pub location: Option<String>,
}
