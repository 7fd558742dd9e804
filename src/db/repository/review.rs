use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::ReviewWithPatient;

/// Newest reviews for a doctor, with the reviewer's name.
pub fn recent_reviews(
    conn: &Connection,
    doctor_id: &Uuid,
    limit: u32,
) -> Result<Vec<ReviewWithPatient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT r.rating, r.comment, r.created_at, u.name
         FROM reviews r
         JOIN users u ON r.patient_id = u.id
         WHERE r.doctor_id = ?1
         ORDER BY r.created_at DESC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![doctor_id.to_string(), limit], |row| {
        Ok(ReviewWithPatient {
            rating: row.get(0)?,
            comment: row.get(1)?,
            created_at: row.get(2)?,
            patient_name: row.get(3)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::db::repository::{fixtures, get_doctor};
    use crate::models::Role;

    #[test]
    fn review_updates_doctor_rating() {
        let conn = open_memory_database().unwrap();
        let (_, doctor) = fixtures::doctor(&conn, "Laura Gomez", "Glaucoma");
        let patient = fixtures::user(&conn, "Ana", "ana@x.com", Role::Patient);

        fixtures::review(&conn, doctor.id, patient.id, 5, "2030-01-01T10:00:00.000Z").unwrap();
        fixtures::review(&conn, doctor.id, patient.id, 4, "2030-01-02T10:00:00.000Z").unwrap();

        let loaded = get_doctor(&conn, &doctor.id).unwrap().unwrap();
        assert_eq!(loaded.reviews_count, 2);
        assert!((loaded.rating - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn recent_reviews_newest_first_and_limited() {
        let conn = open_memory_database().unwrap();
        let (_, doctor) = fixtures::doctor(&conn, "Laura Gomez", "Glaucoma");
        let patient = fixtures::user(&conn, "Ana", "ana@x.com", Role::Patient);

        for day in 1..=12 {
            let ts = format!("2030-01-{day:02}T10:00:00.000Z");
            fixtures::review(&conn, doctor.id, patient.id, 5, &ts).unwrap();
        }

        let recent = recent_reviews(&conn, &doctor.id, 10).unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].created_at, "2030-01-12T10:00:00.000Z");
        assert_eq!(recent[0].patient_name, "Ana");
    }

    #[test]
    fn rating_out_of_range_rejected() {
        let conn = open_memory_database().unwrap();
        let (_, doctor) = fixtures::doctor(&conn, "Laura Gomez", "Glaucoma");
        let patient = fixtures::user(&conn, "Ana", "ana@x.com", Role::Patient);
        let result = fixtures::review(&conn, doctor.id, patient.id, 6, "2030-01-01T10:00:00.000Z");
        assert!(result.is_err());
    }
}
