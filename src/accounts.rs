//! Registration, login, profile and password change.
//!
//! Functions here are synchronous and hash passwords inline; async callers run
//! them on the blocking pool.

use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use crate::config::TOKEN_LIFETIME_SECS;
use crate::crypto::{self, CryptoError};
use crate::db::repository::{
    find_user_by_email, get_doctor_by_user, get_user, insert_doctor, insert_user,
    update_password_hash,
};
use crate::db::{now_timestamp, DatabaseError};
use crate::models::{DoctorProfile, Role, User};
use crate::validation::{self, FieldError};

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Invalid field {0}")]
    Validation(#[from] FieldError),
    #[error("Email is already registered")]
    EmailTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User not found")]
    UserNotFound,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<rusqlite::Error> for AccountError {
    fn from(err: rusqlite::Error) -> Self {
        AccountError::Database(err.into())
    }
}

/// Raw registration fields as received.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub user_type: String,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub profile_image: Option<String>,
}

/// Caller record plus the doctor extension when the caller is a doctor.
#[derive(Debug, Clone)]
pub struct AccountProfile {
    pub user: User,
    pub doctor: Option<DoctorProfile>,
}

fn parse_role(value: &str) -> Result<Role, FieldError> {
    value
        .trim()
        .parse::<Role>()
        .map_err(|_| FieldError::new("userType", "must be patient or doctor"))
}

/// Create a user. Doctors get a specialty-only profile in the same transaction.
pub fn register(
    conn: &mut Connection,
    input: Registration,
    password_iterations: u32,
) -> Result<User, AccountError> {
    let name = validation::text_in_range("name", &input.name, 2, 255)?;
    let email = validation::email("email", &input.email)?;
    validation::password("password", &input.password)?;
    let role = parse_role(&input.user_type)?;
    let phone = validation::optional_text("phone", input.phone.as_deref(), 20)?;
    let specialty = match role {
        Role::Doctor => Some(
            validation::optional_text("specialty", input.specialty.as_deref(), 255)?
                .ok_or_else(|| FieldError::new("specialty", "required for doctors"))?,
        ),
        Role::Patient => None,
    };

    if find_user_by_email(conn, &email)?.is_some() {
        return Err(AccountError::EmailTaken);
    }

    let user = User {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash: crypto::hash_password(&input.password, password_iterations),
        phone,
        role,
        profile_image: input.profile_image.filter(|s| !s.trim().is_empty()),
        created_at: now_timestamp(),
    };

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    insert_user(&tx, &user).map_err(|e| {
        if e.violates("users.email") {
            AccountError::EmailTaken
        } else {
            e.into()
        }
    })?;
    if let Some(specialty) = specialty {
        insert_doctor(&tx, &DoctorProfile::new(user.id, specialty))?;
    }
    tx.commit()?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");
    Ok(user)
}

/// Unknown email and wrong password are indistinguishable.
pub fn login(conn: &Connection, email: &str, password: &str) -> Result<User, AccountError> {
    let email = validation::email("email", email).map_err(|_| AccountError::InvalidCredentials)?;
    let user = find_user_by_email(conn, &email)?.ok_or(AccountError::InvalidCredentials)?;
    if !crypto::verify_password(password, &user.password_hash) {
        return Err(AccountError::InvalidCredentials);
    }
    Ok(user)
}

pub fn profile(conn: &Connection, user_id: &Uuid) -> Result<AccountProfile, AccountError> {
    let user = get_user(conn, user_id)?.ok_or(AccountError::UserNotFound)?;
    let doctor = match user.role {
        Role::Doctor => get_doctor_by_user(conn, &user.id)?,
        Role::Patient => None,
    };
    Ok(AccountProfile { user, doctor })
}

pub fn change_password(
    conn: &Connection,
    user_id: &Uuid,
    current_password: &str,
    new_password: &str,
    password_iterations: u32,
) -> Result<(), AccountError> {
    if current_password.is_empty() {
        return Err(FieldError::new("currentPassword", "required").into());
    }
    validation::password("newPassword", new_password)?;

    let user = get_user(conn, user_id)?.ok_or(AccountError::UserNotFound)?;
    if !crypto::verify_password(current_password, &user.password_hash) {
        return Err(AccountError::InvalidCredentials);
    }
    let hash = crypto::hash_password(new_password, password_iterations);
    update_password_hash(conn, user_id, &hash)?;
    tracing::info!(user_id = %user_id, "Password changed");
    Ok(())
}

/// Bearer token for `user`, valid for seven days from now.
pub fn issue_token(secret: &[u8], user: &User) -> Result<String, AccountError> {
    let now = chrono::Utc::now().timestamp();
    Ok(crypto::sign_token(
        secret,
        user.id,
        &user.email,
        now,
        TOKEN_LIFETIME_SECS,
    )?)
}
