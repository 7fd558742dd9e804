use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{date_col, enum_col, time_col, uuid_col, DATE_FORMAT, TIME_FORMAT};
use crate::db::{now_timestamp, DatabaseError};
use crate::models::{
    Appointment, AppointmentDetail, AppointmentStatus, DoctorAppointment, NewAppointment,
    PatientAppointment,
};

/// Column named in the UNIQUE violation raised by the active-slot index.
pub const SLOT_INDEX_COLUMN: &str = "appointments.doctor_id";

const APPOINTMENT_COLUMNS: &str = "a.id, a.patient_id, a.doctor_id, a.appointment_date,
     a.appointment_time, a.reason, a.status, a.created_at";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: uuid_col(row, 0)?,
        patient_id: uuid_col(row, 1)?,
        doctor_id: uuid_col(row, 2)?,
        appointment_date: date_col(row, 3)?,
        appointment_time: time_col(row, 4)?,
        reason: row.get(5)?,
        status: enum_col(row, 6)?,
        created_at: row.get(7)?,
    })
}

fn date_param(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn time_param(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Insert a `pending` appointment.
///
/// When another non-cancelled booking already holds the slot the active-slot
/// index rejects the row; the error satisfies `violates(SLOT_INDEX_COLUMN)`.
pub fn insert_appointment(
    conn: &Connection,
    new: &NewAppointment,
) -> Result<Appointment, DatabaseError> {
    let appointment = Appointment {
        id: Uuid::new_v4(),
        patient_id: new.patient_id,
        doctor_id: new.doctor_id,
        appointment_date: new.date,
        appointment_time: new.time,
        reason: new.reason.clone(),
        status: AppointmentStatus::Pending,
        created_at: now_timestamp(),
    };
    conn.execute(
        "INSERT INTO appointments (id, patient_id, doctor_id, appointment_date,
             appointment_time, reason, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            appointment.id.to_string(),
            appointment.patient_id.to_string(),
            appointment.doctor_id.to_string(),
            date_param(appointment.appointment_date),
            time_param(appointment.appointment_time),
            appointment.reason,
            appointment.status.as_str(),
            appointment.created_at,
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(appointment)
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let appointment = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = ?1"),
            params![id.to_string()],
            appointment_from_row,
        )
        .optional()?;
    Ok(appointment)
}

/// Appointment joined with both the doctor's and the patient's contact fields.
pub fn get_appointment_detail(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<AppointmentDetail>, DatabaseError> {
    let detail = conn
        .query_row(
            &format!(
                "SELECT {APPOINTMENT_COLUMNS},
                    d.specialty, d.consultation_fee, d.user_id,
                    du.name, du.email, du.phone,
                    pu.name, pu.email, pu.phone
                 FROM appointments a
                 JOIN doctors d ON a.doctor_id = d.id
                 JOIN users du ON d.user_id = du.id
                 JOIN users pu ON a.patient_id = pu.id
                 WHERE a.id = ?1"
            ),
            params![id.to_string()],
            |row| {
                Ok(AppointmentDetail {
                    appointment: appointment_from_row(row)?,
                    specialty: row.get(8)?,
                    consultation_fee: row.get(9)?,
                    doctor_user_id: uuid_col(row, 10)?,
                    doctor_name: row.get(11)?,
                    doctor_email: row.get(12)?,
                    doctor_phone: row.get(13)?,
                    patient_name: row.get(14)?,
                    patient_email: row.get(15)?,
                    patient_phone: row.get(16)?,
                })
            },
        )
        .optional()?;
    Ok(detail)
}

/// Id of the non-cancelled appointment occupying a slot, if any.
pub fn find_active_in_slot(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<Option<Uuid>, DatabaseError> {
    let id = conn
        .query_row(
            "SELECT id FROM appointments
             WHERE doctor_id = ?1 AND appointment_date = ?2 AND appointment_time = ?3
               AND status != 'cancelled'",
            params![doctor_id.to_string(), date_param(date), time_param(time)],
            |row| uuid_col(row, 0),
        )
        .optional()?;
    Ok(id)
}

/// A patient's bookings, most recent slot first.
pub fn list_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<PatientAppointment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.appointment_date, a.appointment_time, a.reason, a.status, a.created_at,
                d.specialty, d.consultation_fee, u.name, u.email, u.phone
         FROM appointments a
         JOIN doctors d ON a.doctor_id = d.id
         JOIN users u ON d.user_id = u.id
         WHERE a.patient_id = ?1
         ORDER BY a.appointment_date DESC, a.appointment_time DESC",
    )?;
    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok(PatientAppointment {
            id: uuid_col(row, 0)?,
            appointment_date: date_col(row, 1)?,
            appointment_time: time_col(row, 2)?,
            reason: row.get(3)?,
            status: enum_col(row, 4)?,
            created_at: row.get(5)?,
            specialty: row.get(6)?,
            consultation_fee: row.get(7)?,
            doctor_name: row.get(8)?,
            doctor_email: row.get(9)?,
            doctor_phone: row.get(10)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// A doctor profile's bookings, most recent slot first.
pub fn list_for_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<DoctorAppointment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.appointment_date, a.appointment_time, a.reason, a.status, a.created_at,
                u.name, u.email, u.phone
         FROM appointments a
         JOIN users u ON a.patient_id = u.id
         WHERE a.doctor_id = ?1
         ORDER BY a.appointment_date DESC, a.appointment_time DESC",
    )?;
    let rows = stmt.query_map(params![doctor_id.to_string()], |row| {
        Ok(DoctorAppointment {
            id: uuid_col(row, 0)?,
            appointment_date: date_col(row, 1)?,
            appointment_time: time_col(row, 2)?,
            reason: row.get(3)?,
            status: enum_col(row, 4)?,
            created_at: row.get(5)?,
            patient_name: row.get(6)?,
            patient_email: row.get(7)?,
            patient_phone: row.get(8)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Write a new status and return the updated row.
pub fn set_status(
    conn: &Connection,
    id: &Uuid,
    status: AppointmentStatus,
) -> Result<Appointment, DatabaseError> {
    let updated = conn
        .execute(
            "UPDATE appointments SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id.to_string()],
        )
        .map_err(DatabaseError::from_write)?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "appointment".into(),
            id: id.to_string(),
        });
    }
    get_appointment(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "appointment".into(),
        id: id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::fixtures;
    use crate::models::Role;

    fn slot() -> (NaiveDate, NaiveTime) {
        (
            NaiveDate::from_ymd_opt(2030, 3, 14).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        )
    }

    fn booking(patient: Uuid, doctor: Uuid, date: NaiveDate, time: NaiveTime) -> NewAppointment {
        NewAppointment {
            patient_id: patient,
            doctor_id: doctor,
            date,
            time,
            reason: Some("Visión borrosa".into()),
        }
    }

    #[test]
    fn appointment_insert_and_detail() {
        let conn = open_memory_database().unwrap();
        let (doc_user, doctor) = fixtures::doctor(&conn, "Laura Gomez", "Glaucoma");
        let patient = fixtures::user(&conn, "Ana", "ana@x.com", Role::Patient);
        let (date, time) = slot();

        let created = insert_appointment(&conn, &booking(patient.id, doctor.id, date, time)).unwrap();
        assert_eq!(created.status, AppointmentStatus::Pending);

        let detail = get_appointment_detail(&conn, &created.id).unwrap().unwrap();
        assert_eq!(detail.appointment.appointment_time, time);
        assert_eq!(detail.doctor_name, "Laura Gomez");
        assert_eq!(detail.doctor_user_id, doc_user.id);
        assert_eq!(detail.patient_name, "Ana");
    }

    #[test]
    fn active_slot_index_rejects_double_booking() {
        let conn = open_memory_database().unwrap();
        let (_, doctor) = fixtures::doctor(&conn, "Laura Gomez", "Glaucoma");
        let a = fixtures::user(&conn, "Ana", "ana@x.com", Role::Patient);
        let b = fixtures::user(&conn, "Bea", "bea@x.com", Role::Patient);
        let (date, time) = slot();

        insert_appointment(&conn, &booking(a.id, doctor.id, date, time)).unwrap();
        let err = insert_appointment(&conn, &booking(b.id, doctor.id, date, time)).unwrap_err();
        assert!(err.violates(SLOT_INDEX_COLUMN), "unexpected error: {err}");
    }

    #[test]
    fn cancelled_row_frees_the_slot() {
        let conn = open_memory_database().unwrap();
        let (_, doctor) = fixtures::doctor(&conn, "Laura Gomez", "Glaucoma");
        let a = fixtures::user(&conn, "Ana", "ana@x.com", Role::Patient);
        let (date, time) = slot();

        let first = insert_appointment(&conn, &booking(a.id, doctor.id, date, time)).unwrap();
        assert_eq!(
            find_active_in_slot(&conn, &doctor.id, date, time).unwrap(),
            Some(first.id)
        );

        set_status(&conn, &first.id, AppointmentStatus::Cancelled).unwrap();
        assert!(find_active_in_slot(&conn, &doctor.id, date, time).unwrap().is_none());

        let second = insert_appointment(&conn, &booking(a.id, doctor.id, date, time)).unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn lists_ordered_most_recent_first() {
        let conn = open_memory_database().unwrap();
        let (_, doctor) = fixtures::doctor(&conn, "Laura Gomez", "Glaucoma");
        let patient = fixtures::user(&conn, "Ana", "ana@x.com", Role::Patient);
        let day1 = NaiveDate::from_ymd_opt(2030, 1, 10).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2030, 2, 10).unwrap();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let fifteen = NaiveTime::from_hms_opt(15, 30, 0).unwrap();

        insert_appointment(&conn, &booking(patient.id, doctor.id, day1, fifteen)).unwrap();
        insert_appointment(&conn, &booking(patient.id, doctor.id, day2, nine)).unwrap();
        insert_appointment(&conn, &booking(patient.id, doctor.id, day2, fifteen)).unwrap();

        let mine = list_for_patient(&conn, &patient.id).unwrap();
        let order: Vec<(NaiveDate, NaiveTime)> = mine
            .iter()
            .map(|a| (a.appointment_date, a.appointment_time))
            .collect();
        assert_eq!(order, vec![(day2, fifteen), (day2, nine), (day1, fifteen)]);
        assert_eq!(mine[0].doctor_name, "Laura Gomez");

        let theirs = list_for_doctor(&conn, &doctor.id).unwrap();
        assert_eq!(theirs.len(), 3);
        assert_eq!(theirs[0].patient_name, "Ana");
    }

    #[test]
    fn set_status_on_missing_row_is_not_found() {
        let conn = open_memory_database().unwrap();
        let result = set_status(&conn, &Uuid::new_v4(), AppointmentStatus::Confirmed);
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn foreign_key_constraint_enforced() {
        let conn = open_memory_database().unwrap();
        let (date, time) = slot();
        let result = insert_appointment(
            &conn,
            &booking(Uuid::new_v4(), Uuid::new_v4(), date, time),
        );
        assert!(result.is_err());
    }
}
