//! Appointment endpoints.
//!
//! - `POST /api/appointments` — book (guest or authenticated)
//! - `GET /api/appointments/my-appointments`
//! - `GET /api/appointments/:id`
//! - `PUT /api/appointments/:id/status`
//! - `DELETE /api/appointments/:id` — cancel

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{blocking, with_db, ApiContext, ApiJson, ApiPath};
use crate::appointment::{self, BookedAppointment, BookingRequest, MyAppointments};
use crate::authorization::CallerContext;
use crate::models::{Appointment, AppointmentDetail};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    #[serde(default)]
    pub appointment_date: String,
    #[serde(default)]
    pub appointment_time: String,
    pub reason: Option<String>,
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub patient_email: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Serialize)]
pub struct BookedResponse {
    pub message: &'static str,
    pub appointment: BookedAppointment,
}

#[derive(Serialize)]
pub struct MyAppointmentsResponse {
    pub appointments: MyAppointments,
    pub total: usize,
}

#[derive(Serialize)]
pub struct AppointmentResponse {
    pub appointment: AppointmentDetail,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub message: &'static str,
    pub appointment: Appointment,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// `POST /api/appointments` — optional auth.
pub async fn create(
    State(ctx): State<ApiContext>,
    caller: Option<Extension<CallerContext>>,
    ApiJson(body): ApiJson<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<BookedResponse>), ApiError> {
    let core = ctx.core.clone();
    let caller = caller.map(|Extension(c)| c);
    let request = BookingRequest {
        doctor_id: body.doctor_id,
        appointment_date: body.appointment_date,
        appointment_time: body.appointment_time,
        reason: body.reason,
        patient_name: body.patient_name,
        patient_phone: body.patient_phone,
        patient_email: body.patient_email,
    };

    let appointment = blocking(move || {
        let mut conn = core.open_db()?;
        Ok(appointment::create_appointment(
            &mut conn,
            caller.as_ref(),
            request,
        )?)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(BookedResponse {
            message: "Appointment booked successfully",
            appointment,
        }),
    ))
}

/// `GET /api/appointments/my-appointments`
pub async fn mine(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
) -> Result<Json<MyAppointmentsResponse>, ApiError> {
    let appointments = with_db(&ctx.core, move |conn| {
        Ok(appointment::list_my_appointments(conn, &caller)?)
    })
    .await?;

    Ok(Json(MyAppointmentsResponse {
        total: appointments.len(),
        appointments,
    }))
}

/// `GET /api/appointments/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let appointment = with_db(&ctx.core, move |conn| {
        Ok(appointment::get_appointment(conn, &caller, &id)?)
    })
    .await?;
    Ok(Json(AppointmentResponse { appointment }))
}

/// `PUT /api/appointments/:id/status`
pub async fn update_status(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let core = ctx.core.clone();
    let appointment = blocking(move || {
        let mut conn = core.open_db()?;
        Ok(appointment::update_status(&mut conn, &caller, &id, &body.status)?)
    })
    .await?;

    Ok(Json(StatusResponse {
        message: "Appointment status updated successfully",
        appointment,
    }))
}

/// `DELETE /api/appointments/:id`
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<CallerContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let core = ctx.core.clone();
    blocking(move || {
        let mut conn = core.open_db()?;
        appointment::cancel_appointment(&mut conn, &caller, &id)?;
        Ok(())
    })
    .await?;

    Ok(Json(MessageResponse {
        message: "Appointment cancelled successfully",
    }))
}
