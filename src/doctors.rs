//! Doctor directory: public listing and detail, owner-only profile edits.

use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::authorization::{require_role, AuthorizationError, CallerContext};
use crate::db::repository::{
    get_doctor, get_doctor_by_user, get_doctor_listing, insert_doctor, list_doctors,
    list_locations, list_specialties, recent_reviews, update_doctor,
};
use crate::db::DatabaseError;
use crate::models::{
    DoctorFilter, DoctorListing, DoctorProfile, DoctorProfileFields, ReviewWithPatient, Role,
};
use crate::validation::{self, FieldError};

/// Reviews shown on a doctor's detail page.
pub const DETAIL_REVIEW_LIMIT: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Invalid field {0}")]
    Validation(#[from] FieldError),
    #[error("Doctor not found")]
    NotFound,
    #[error("A doctor profile already exists for this user")]
    AlreadyExists,
    #[error("Only the owner can modify this profile")]
    NotOwner,
    #[error("{0}")]
    Forbidden(#[from] AuthorizationError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDetail {
    #[serde(flatten)]
    pub doctor: DoctorListing,
    pub reviews_list: Vec<ReviewWithPatient>,
}

fn apply_fields(
    profile: &mut DoctorProfile,
    fields: DoctorProfileFields,
) -> Result<(), FieldError> {
    if let Some(specialty) = fields.specialty {
        profile.specialty = validation::text_in_range("specialty", &specialty, 1, 255)?;
    }
    if let Some(years) = fields.experience_years {
        if years < 0 {
            return Err(FieldError::new("experienceYears", "must not be negative"));
        }
        profile.experience_years = Some(years);
    }
    if let Some(languages) = fields.languages {
        profile.languages = languages
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
    }
    if let Some(fee) = fields.consultation_fee {
        if !fee.is_finite() || fee < 0.0 {
            return Err(FieldError::new("consultationFee", "must be a non-negative amount"));
        }
        profile.consultation_fee = Some(fee);
    }
    if let Some(availability) = fields.availability {
        profile.availability =
            validation::optional_text("availability", Some(&availability), 1000)?;
    }
    if let Some(image_url) = fields.image_url {
        profile.image_url = validation::optional_text("imageUrl", Some(&image_url), 2048)?;
    }
    if let Some(location) = fields.location {
        profile.location = validation::optional_text("location", Some(&location), 255)?;
    }
    Ok(())
}

fn listing(conn: &Connection, id: &Uuid) -> Result<DoctorListing, DirectoryError> {
    get_doctor_listing(conn, id)?.ok_or(DirectoryError::NotFound)
}

/// Create the caller's own profile. Doctors only, one per user.
pub fn create_profile(
    conn: &Connection,
    caller: &CallerContext,
    fields: DoctorProfileFields,
) -> Result<DoctorListing, DirectoryError> {
    require_role(caller, Role::Doctor)?;
    if fields.specialty.as_deref().map_or(true, |s| s.trim().is_empty()) {
        return Err(FieldError::new("specialty", "required").into());
    }
    if get_doctor_by_user(conn, &caller.id)?.is_some() {
        return Err(DirectoryError::AlreadyExists);
    }

    let mut profile = DoctorProfile::new(caller.id, String::new());
    apply_fields(&mut profile, fields)?;
    insert_doctor(conn, &profile).map_err(|e| {
        if e.violates("doctors.user_id") {
            DirectoryError::AlreadyExists
        } else {
            e.into()
        }
    })?;

    tracing::info!(doctor_id = %profile.id, user_id = %caller.id, "Doctor profile created");
    listing(conn, &profile.id)
}

/// Partial update: only provided fields change.
pub fn update_profile(
    conn: &Connection,
    caller: &CallerContext,
    doctor_id: &Uuid,
    fields: DoctorProfileFields,
) -> Result<DoctorListing, DirectoryError> {
    let mut profile = get_doctor(conn, doctor_id)?.ok_or(DirectoryError::NotFound)?;
    if profile.user_id != caller.id {
        return Err(DirectoryError::NotOwner);
    }
    apply_fields(&mut profile, fields)?;
    update_doctor(conn, &profile)?;
    listing(conn, doctor_id)
}

pub fn search(
    conn: &Connection,
    filter: &DoctorFilter,
) -> Result<Vec<DoctorListing>, DirectoryError> {
    Ok(list_doctors(conn, filter)?)
}

pub fn detail(conn: &Connection, doctor_id: &Uuid) -> Result<DoctorDetail, DirectoryError> {
    let doctor = listing(conn, doctor_id)?;
    let reviews_list = recent_reviews(conn, doctor_id, DETAIL_REVIEW_LIMIT)?;
    Ok(DoctorDetail {
        doctor,
        reviews_list,
    })
}

pub fn specialties(conn: &Connection) -> Result<Vec<String>, DirectoryError> {
    Ok(list_specialties(conn)?)
}

pub fn locations(conn: &Connection) -> Result<Vec<String>, DirectoryError> {
    Ok(list_locations(conn)?)
}
