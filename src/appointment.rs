//! Booking workflow: guest or authenticated booking, slot conflicts, and
//! role-restricted status changes.
//!
//! Slot uniqueness is owned by the ledger's partial unique index; the
//! pre-check here only produces the friendly error early. Booking runs in one
//! IMMEDIATE transaction so a guest row never outlives a lost slot race.

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use uuid::Uuid;

use crate::authorization::{check_appointment_access, may_request_status, CallerContext};
use crate::crypto::GUEST_PASSWORD_PLACEHOLDER;
use crate::db::repository::{
    find_active_in_slot, get_appointment_detail, get_doctor_by_user, get_doctor_listing,
    insert_appointment, insert_user, list_for_doctor, list_for_patient, set_status,
    SLOT_INDEX_COLUMN,
};
use crate::db::{now_timestamp, DatabaseError};
use crate::models::{
    serialize_slot_time, Appointment, AppointmentDetail, AppointmentStatus, DoctorAppointment,
    NewAppointment, PatientAppointment, Role, User,
};
use crate::validation::{self, FieldError};

const REASON_MAX_CHARS: usize = 1000;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid field {0}")]
    Validation(#[from] FieldError),
    #[error("Name and phone are required to book without an account")]
    MissingGuestFields,
    #[error("Doctor not found")]
    DoctorNotFound,
    #[error("The requested time slot is not available")]
    SlotUnavailable,
    #[error("Could not provision a guest patient record")]
    GuestProvisioningFailed,
    #[error("Appointment not found")]
    NotFound,
    #[error("You do not have access to this appointment")]
    Forbidden,
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for BookingError {
    fn from(err: rusqlite::Error) -> Self {
        BookingError::Database(err.into())
    }
}

/// Booking fields as received. Guest fields are ignored for authenticated callers.
#[derive(Debug, Clone, Default)]
pub struct BookingRequest {
    pub doctor_id: Uuid,
    pub appointment_date: String,
    pub appointment_time: String,
    pub reason: Option<String>,
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub patient_email: Option<String>,
}

/// Confirmation returned after a successful booking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedAppointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub specialty: String,
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_slot_time")]
    pub time: NaiveTime,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
}

/// The caller's appointments, shaped by role.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MyAppointments {
    AsPatient(Vec<PatientAppointment>),
    AsDoctor(Vec<DoctorAppointment>),
}

impl MyAppointments {
    pub fn len(&self) -> usize {
        match self {
            Self::AsPatient(rows) => rows.len(),
            Self::AsDoctor(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct GuestDetails {
    name: String,
    phone: String,
    email: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// Guest provisioning
// ═══════════════════════════════════════════════════════════

/// `{name lower-cased, whitespace removed}{unix millis}@temp.com`
pub fn synthesize_guest_email(name: &str) -> String {
    let compact: String = name
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    format!(
        "{compact}{}@temp.com",
        chrono::Utc::now().timestamp_millis()
    )
}

fn guest_details(request: &BookingRequest) -> Result<GuestDetails, BookingError> {
    let present = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let (Some(name), Some(phone)) = (
        present(&request.patient_name),
        present(&request.patient_phone),
    ) else {
        return Err(BookingError::MissingGuestFields);
    };
    let name = validation::text_in_range("patientName", &name, 2, 255)?;
    let phone = validation::text_in_range("patientPhone", &phone, 6, 20)?;
    let email = match present(&request.patient_email) {
        Some(email) => Some(validation::email("patientEmail", &email)?),
        None => None,
    };
    Ok(GuestDetails { name, phone, email })
}

fn insert_guest(
    conn: &Connection,
    guest: &GuestDetails,
    email: String,
) -> Result<Uuid, DatabaseError> {
    let user = User {
        id: Uuid::new_v4(),
        name: guest.name.clone(),
        email,
        password_hash: GUEST_PASSWORD_PLACEHOLDER.to_string(),
        phone: Some(guest.phone.clone()),
        role: Role::Patient,
        profile_image: None,
        created_at: now_timestamp(),
    };
    insert_user(conn, &user)?;
    Ok(user.id)
}

/// Create the guest patient row. An email collision is retried exactly once
/// with a freshly synthesized address.
fn provision_guest(conn: &Connection, guest: &GuestDetails) -> Result<Uuid, BookingError> {
    let first = guest
        .email
        .clone()
        .unwrap_or_else(|| synthesize_guest_email(&guest.name));

    match insert_guest(conn, guest, first) {
        Ok(id) => Ok(id),
        Err(e) if e.violates("users.email") => {
            let retry = synthesize_guest_email(&guest.name);
            tracing::warn!(email = %retry, "Guest email taken, retrying with synthesized address");
            match insert_guest(conn, guest, retry) {
                Ok(id) => Ok(id),
                Err(e) if e.violates("users.email") => Err(BookingError::GuestProvisioningFailed),
                Err(e) => Err(e.into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}

// ═══════════════════════════════════════════════════════════
// Workflow
// ═══════════════════════════════════════════════════════════

/// Book a slot. `caller` is `None` for guests.
pub fn create_appointment(
    conn: &mut Connection,
    caller: Option<&CallerContext>,
    request: BookingRequest,
) -> Result<BookedAppointment, BookingError> {
    let date = validation::slot_date("appointmentDate", &request.appointment_date)?;
    let time = validation::slot_time("appointmentTime", &request.appointment_time)?;
    let reason = validation::optional_text("reason", request.reason.as_deref(), REASON_MAX_CHARS)?;
    let guest = match caller {
        Some(_) => None,
        None => Some(guest_details(&request)?),
    };

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let doctor = get_doctor_listing(&tx, &request.doctor_id)?.ok_or(BookingError::DoctorNotFound)?;

    if find_active_in_slot(&tx, &doctor.id, date, time)?.is_some() {
        return Err(BookingError::SlotUnavailable);
    }

    let patient_id = match (caller, &guest) {
        (Some(caller), _) => caller.id,
        (None, Some(guest)) => provision_guest(&tx, guest)?,
        (None, None) => return Err(BookingError::MissingGuestFields),
    };

    let appointment = insert_appointment(
        &tx,
        &NewAppointment {
            patient_id,
            doctor_id: doctor.id,
            date,
            time,
            reason,
        },
    )
    .map_err(|e| {
        if e.violates(SLOT_INDEX_COLUMN) {
            BookingError::SlotUnavailable
        } else {
            e.into()
        }
    })?;

    tx.commit()?;

    tracing::info!(
        appointment_id = %appointment.id,
        doctor_id = %doctor.id,
        guest = caller.is_none(),
        "Appointment booked"
    );

    Ok(BookedAppointment {
        id: appointment.id,
        patient_id,
        doctor_id: doctor.id,
        doctor_name: doctor.name,
        specialty: doctor.specialty,
        date: appointment.appointment_date,
        time: appointment.appointment_time,
        reason: appointment.reason,
        status: appointment.status,
    })
}

/// Patients see their bookings; doctors see bookings on their profile
/// (empty when they have no profile yet).
pub fn list_my_appointments(
    conn: &Connection,
    caller: &CallerContext,
) -> Result<MyAppointments, BookingError> {
    match caller.role {
        Role::Patient => Ok(MyAppointments::AsPatient(list_for_patient(conn, &caller.id)?)),
        Role::Doctor => match get_doctor_by_user(conn, &caller.id)? {
            Some(profile) => Ok(MyAppointments::AsDoctor(list_for_doctor(conn, &profile.id)?)),
            None => Ok(MyAppointments::AsDoctor(Vec::new())),
        },
    }
}

fn load_authorized(
    conn: &Connection,
    caller: &CallerContext,
    id: &Uuid,
) -> Result<AppointmentDetail, BookingError> {
    let detail = get_appointment_detail(conn, id)?.ok_or(BookingError::NotFound)?;
    let decision = check_appointment_access(
        caller,
        &detail.appointment.patient_id,
        &detail.doctor_user_id,
    );
    if !decision.allowed {
        tracing::debug!(appointment_id = %id, caller = %caller.id, "Appointment access denied");
        return Err(BookingError::Forbidden);
    }
    Ok(detail)
}

pub fn get_appointment(
    conn: &Connection,
    caller: &CallerContext,
    id: &Uuid,
) -> Result<AppointmentDetail, BookingError> {
    load_authorized(conn, caller, id)
}

/// Change status. Doctors may set any status on their own appointments;
/// patients may only cancel their own.
pub fn update_status(
    conn: &mut Connection,
    caller: &CallerContext,
    id: &Uuid,
    status: &str,
) -> Result<Appointment, BookingError> {
    let target: AppointmentStatus = status
        .parse()
        .map_err(|_| BookingError::InvalidStatus(status.to_string()))?;
    if !may_request_status(caller.role, target) {
        return Err(BookingError::Forbidden);
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let detail = load_authorized(&tx, caller, id)?;
    let current = detail.appointment.status;
    if !current.can_transition_to(target) {
        return Err(BookingError::InvalidTransition {
            from: current,
            to: target,
        });
    }
    let updated = set_status(&tx, id, target)?;
    tx.commit()?;

    tracing::info!(
        appointment_id = %id,
        from = %current,
        to = %target,
        "Appointment status changed"
    );
    Ok(updated)
}

pub fn cancel_appointment(
    conn: &mut Connection,
    caller: &CallerContext,
    id: &Uuid,
) -> Result<Appointment, BookingError> {
    update_status(conn, caller, id, AppointmentStatus::Cancelled.as_str())
}
