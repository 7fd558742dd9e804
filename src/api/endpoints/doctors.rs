//! Doctor directory endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{with_db, ApiContext, ApiJson, ApiPath, ApiQuery};
use crate::authorization::CallerContext;
use crate::doctors::{self, DoctorDetail};
use crate::models::{DoctorFilter, DoctorListing, DoctorProfileFields};

#[derive(Serialize)]
pub struct DoctorsResponse {
    pub doctors: Vec<DoctorListing>,
    pub total: usize,
    pub filters: DoctorFilter,
}

#[derive(Serialize)]
pub struct DoctorDetailResponse {
    pub doctor: DoctorDetail,
}

#[derive(Serialize)]
pub struct DoctorSavedResponse {
    pub message: &'static str,
    pub doctor: DoctorListing,
}

#[derive(Serialize)]
pub struct SpecialtiesResponse {
    pub specialties: Vec<String>,
}

#[derive(Serialize)]
pub struct LocationsResponse {
    pub locations: Vec<String>,
}

/// `GET /api/doctors`
pub async fn list(
    State(ctx): State<ApiContext>,
    ApiQuery(filter): ApiQuery<DoctorFilter>,
) -> Result<Json<DoctorsResponse>, ApiError> {
    let query = filter.clone();
    let doctors = with_db(&ctx.core, move |conn| Ok(doctors::search(conn, &query)?)).await?;

    Ok(Json(DoctorsResponse {
        total: doctors.len(),
        doctors,
        filters: filter,
    }))
}

/// `GET /api/doctors/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    ApiPath(doctor_id): ApiPath<Uuid>,
) -> Result<Json<DoctorDetailResponse>, ApiError> {
    let doctor = with_db(&ctx.core, move |conn| Ok(doctors::detail(conn, &doctor_id)?)).await?;
    Ok(Json(DoctorDetailResponse { doctor }))
}

/// `GET /api/doctors/specialties/list`
pub async fn specialties(
    State(ctx): State<ApiContext>,
) -> Result<Json<SpecialtiesResponse>, ApiError> {
    let specialties = with_db(&ctx.core, |conn| Ok(doctors::specialties(conn)?)).await?;
    Ok(Json(SpecialtiesResponse { specialties }))
}

/// `GET /api/doctors/locations/list`
pub async fn locations(
    State(ctx): State<ApiContext>,
) -> Result<Json<LocationsResponse>, ApiError> {
    let locations = with_db(&ctx.core, |conn| Ok(doctors::locations(conn)?)).await?;
    Ok(Json(LocationsResponse { locations }))
}

/// `POST /api/doctors` — the caller's own profile.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    ApiJson(fields): ApiJson<DoctorProfileFields>,
) -> Result<(StatusCode, Json<DoctorSavedResponse>), ApiError> {
    let doctor = with_db(&ctx.core, move |conn| {
        Ok(doctors::create_profile(conn, &caller, fields)?)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DoctorSavedResponse {
            message: "Doctor profile created successfully",
            doctor,
        }),
    ))
}

/// `PUT /api/doctors/:id` — owner only.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    ApiPath(doctor_id): ApiPath<Uuid>,
    ApiJson(fields): ApiJson<DoctorProfileFields>,
) -> Result<Json<DoctorSavedResponse>, ApiError> {
    let doctor = with_db(&ctx.core, move |conn| {
        Ok(doctors::update_profile(conn, &caller, &doctor_id, fields)?)
    })
    .await?;
    tracing::info!(doctor_id = %doctor_id, "Doctor profile updated");

    Ok(Json(DoctorSavedResponse {
        message: "Profile updated successfully",
        doctor,
    }))
}
