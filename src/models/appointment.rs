use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

use super::enums::AppointmentStatus;

/// Ledger row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment_date: NaiveDate,
    #[serde(serialize_with = "serialize_slot_time")]
    pub appointment_time: NaiveTime,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: String,
}

/// Fields needed to insert a new booking; status is always `pending`.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: Option<String>,
}

/// Patient view: appointment + the doctor's display fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAppointment {
    pub id: Uuid,
    pub appointment_date: NaiveDate,
    #[serde(serialize_with = "serialize_slot_time")]
    pub appointment_time: NaiveTime,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: String,
    pub specialty: String,
    pub consultation_fee: Option<f64>,
    pub doctor_name: String,
    pub doctor_email: String,
    pub doctor_phone: Option<String>,
}

/// Doctor view: appointment + the patient's display fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorAppointment {
    pub id: Uuid,
    pub appointment_date: NaiveDate,
    #[serde(serialize_with = "serialize_slot_time")]
    pub appointment_time: NaiveTime,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: String,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: Option<String>,
}

/// Full join used by the detail endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDetail {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub specialty: String,
    pub consultation_fee: Option<f64>,
    pub doctor_user_id: Uuid,
    pub doctor_name: String,
    pub doctor_email: String,
    pub doctor_phone: Option<String>,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: Option<String>,
}

/// Slot times always render as zero-padded `HH:MM`.
pub fn serialize_slot_time<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&time.format("%H:%M").to_string())
}
