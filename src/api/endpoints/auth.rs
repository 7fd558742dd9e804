//! Account endpoints.
//!
//! - `POST /api/auth/register` — create a patient or doctor account
//! - `POST /api/auth/login` — exchange credentials for a bearer token
//! - `GET /api/auth/profile` — the caller's record (+ doctor profile)
//! - `PUT /api/auth/change-password`

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::accounts::{self, Registration};
use crate::api::error::ApiError;
use crate::api::types::{blocking, with_db, ApiContext, ApiJson};
use crate::authorization::CallerContext;
use crate::models::{DoctorProfile, User, UserSummary};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "role")]
    pub user_type: String,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    /// Stored as an opaque reference, never decoded.
    pub profile_image: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub message: &'static str,
    pub user: UserSummary,
    pub token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUser {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_info: Option<DoctorProfile>,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub user: ProfileUser,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// `POST /api/auth/register`
pub async fn register(
    State(ctx): State<ApiContext>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let core = ctx.core.clone();
    let registration = Registration {
        name: body.name,
        email: body.email,
        password: body.password,
        user_type: body.user_type,
        phone: body.phone,
        specialty: body.specialty,
        profile_image: body.profile_image,
    };

    let response = blocking(move || {
        let mut conn = core.open_db()?;
        let user = accounts::register(&mut conn, registration, core.password_iterations())?;
        let token = accounts::issue_token(core.token_secret(), &user)?;
        Ok(SessionResponse {
            message: "User registered successfully",
            user: UserSummary::from(&user),
            token,
        })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /api/auth/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let core = ctx.core.clone();
    let response = blocking(move || {
        let conn = core.open_db()?;
        let user = accounts::login(&conn, &body.email, &body.password)?;
        let token = accounts::issue_token(core.token_secret(), &user)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(SessionResponse {
            message: "Login successful",
            user: UserSummary::from(&user),
            token,
        })
    })
    .await?;

    Ok(Json(response))
}

/// `GET /api/auth/profile`
pub async fn profile(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let account = with_db(&ctx.core, move |conn| Ok(accounts::profile(conn, &caller.id)?)).await?;

    Ok(Json(ProfileResponse {
        user: ProfileUser {
            user: account.user,
            doctor_info: account.doctor,
        },
    }))
}

/// `PUT /api/auth/change-password`
pub async fn change_password(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let core = ctx.core.clone();
    blocking(move || {
        let conn = core.open_db()?;
        accounts::change_password(
            &conn,
            &caller.id,
            &body.current_password,
            &body.new_password,
            core.password_iterations(),
        )?;
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse {
        message: "Password updated successfully",
    }))
}
