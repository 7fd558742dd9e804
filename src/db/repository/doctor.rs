use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{string_list_col, string_list_json, uuid_col};
use crate::db::DatabaseError;
use crate::models::{DoctorFilter, DoctorListing, DoctorProfile};

const PROFILE_COLUMNS: &str = "id, user_id, specialty, experience_years, languages,
     consultation_fee, availability, rating, reviews_count, image_url, location";

const LISTING_SELECT: &str = "SELECT d.id, u.name, u.email, u.phone, d.specialty, d.location,
        d.image_url, d.rating, d.reviews_count, d.experience_years, d.languages,
        d.consultation_fee, d.availability
     FROM doctors d
     JOIN users u ON d.user_id = u.id";

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<DoctorProfile> {
    Ok(DoctorProfile {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        specialty: row.get(2)?,
        experience_years: row.get(3)?,
        languages: string_list_col(row, 4)?,
        consultation_fee: row.get(5)?,
        availability: row.get(6)?,
        rating: row.get(7)?,
        reviews_count: row.get(8)?,
        image_url: row.get(9)?,
        location: row.get(10)?,
    })
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<DoctorListing> {
    Ok(DoctorListing {
        id: uuid_col(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        specialty: row.get(4)?,
        location: row.get(5)?,
        image_url: row.get(6)?,
        rating: row.get(7)?,
        reviews_count: row.get(8)?,
        experience_years: row.get(9)?,
        languages: string_list_col(row, 10)?,
        consultation_fee: row.get(11)?,
        availability: row.get(12)?,
    })
}

/// Insert a doctor profile. A second profile for the same user surfaces as
/// `DatabaseError::ConstraintViolation` naming `doctors.user_id`.
pub fn insert_doctor(conn: &Connection, doctor: &DoctorProfile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, user_id, specialty, experience_years, languages,
             consultation_fee, availability, rating, reviews_count, image_url, location)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            doctor.id.to_string(),
            doctor.user_id.to_string(),
            doctor.specialty,
            doctor.experience_years,
            string_list_json(&doctor.languages),
            doctor.consultation_fee,
            doctor.availability,
            doctor.rating,
            doctor.reviews_count,
            doctor.image_url,
            doctor.location,
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(())
}

pub fn get_doctor(conn: &Connection, id: &Uuid) -> Result<Option<DoctorProfile>, DatabaseError> {
    let doctor = conn
        .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM doctors WHERE id = ?1"),
            params![id.to_string()],
            profile_from_row,
        )
        .optional()?;
    Ok(doctor)
}

pub fn get_doctor_by_user(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Option<DoctorProfile>, DatabaseError> {
    let doctor = conn
        .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM doctors WHERE user_id = ?1"),
            params![user_id.to_string()],
            profile_from_row,
        )
        .optional()?;
    Ok(doctor)
}

pub fn get_doctor_listing(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<DoctorListing>, DatabaseError> {
    let listing = conn
        .query_row(
            &format!("{LISTING_SELECT} WHERE d.id = ?1"),
            params![id.to_string()],
            listing_from_row,
        )
        .optional()?;
    Ok(listing)
}

/// Filtered directory listing, best rated first.
pub fn list_doctors(
    conn: &Connection,
    filter: &DoctorFilter,
) -> Result<Vec<DoctorListing>, DatabaseError> {
    let mut sql = format!("{LISTING_SELECT} WHERE 1=1");
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    // LIKE is case-insensitive for ASCII in SQLite.
    if let Some(specialty) = non_blank(&filter.specialty) {
        values.push(Box::new(contains_pattern(specialty)));
        sql.push_str(&format!(" AND d.specialty LIKE ?{} ESCAPE '\\'", values.len()));
    }
    if let Some(location) = non_blank(&filter.location) {
        values.push(Box::new(contains_pattern(location)));
        sql.push_str(&format!(" AND d.location LIKE ?{} ESCAPE '\\'", values.len()));
    }
    if let Some(search) = non_blank(&filter.search) {
        values.push(Box::new(contains_pattern(search)));
        let n = values.len();
        sql.push_str(&format!(
            " AND (u.name LIKE ?{n} ESCAPE '\\' OR d.specialty LIKE ?{n} ESCAPE '\\' \
             OR d.location LIKE ?{n} ESCAPE '\\')"
        ));
    }
    if let Some(min_rating) = filter.min_rating {
        values.push(Box::new(min_rating));
        sql.push_str(&format!(" AND d.rating >= ?{}", values.len()));
    }
    if let Some(max_price) = filter.max_price {
        values.push(Box::new(max_price));
        sql.push_str(&format!(" AND d.consultation_fee <= ?{}", values.len()));
    }
    if let Some(language) = non_blank(&filter.language) {
        values.push(Box::new(language.to_string()));
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM json_each(d.languages) WHERE json_each.value = ?{})",
            values.len()
        ));
    }

    sql.push_str(" ORDER BY d.rating DESC, d.reviews_count DESC");

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn ToSql> = values.iter().map(|v| v.as_ref()).collect();
    let rows = stmt.query_map(params.as_slice(), listing_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// `%value%` with LIKE wildcards in `value` matched literally.
fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Overwrite the editable columns of an existing profile.
pub fn update_doctor(conn: &Connection, doctor: &DoctorProfile) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE doctors SET specialty = ?1, experience_years = ?2, languages = ?3,
             consultation_fee = ?4, availability = ?5, image_url = ?6, location = ?7
         WHERE id = ?8",
        params![
            doctor.specialty,
            doctor.experience_years,
            string_list_json(&doctor.languages),
            doctor.consultation_fee,
            doctor.availability,
            doctor.image_url,
            doctor.location,
            doctor.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "doctor".into(),
            id: doctor.id.to_string(),
        });
    }
    Ok(())
}

pub fn list_specialties(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT DISTINCT specialty FROM doctors ORDER BY specialty")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn list_locations(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT location FROM doctors WHERE location IS NOT NULL ORDER BY location",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
