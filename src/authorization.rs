//! Role and ownership checks for authenticated callers.
//!
//! Appointment access cascade, checked in order:
//! 1. Patient who booked the appointment → access as patient
//! 2. Doctor whose profile the appointment belongs to → access as doctor
//! 3. Default → DENY
//!
//! Default-deny. Matching is by role: a doctor never gains access as the
//! booked patient.

use serde::Serialize;
use uuid::Uuid;

use crate::models::{AppointmentStatus, Role};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Verified caller identity, attached to the request by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerContext {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Why access was granted (or denied), for the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    /// Patient on their own booking.
    BookedPatient,
    /// Doctor on a booking against their profile.
    OwningDoctor,
    /// No matching rule.
    Denied,
}

/// Result of an authorization check.
#[derive(Debug, Clone, Copy)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny() -> Self {
        Self {
            allowed: false,
            reason: AccessReason::Denied,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("This action requires the {required} role")]
    WrongRole { required: Role },
}

// ═══════════════════════════════════════════════════════════
// Checks
// ═══════════════════════════════════════════════════════════

/// Second-stage guard after authentication.
pub fn require_role(caller: &CallerContext, role: Role) -> Result<(), AuthorizationError> {
    if caller.role == role {
        Ok(())
    } else {
        Err(AuthorizationError::WrongRole { required: role })
    }
}

/// Can `caller` see or act on an appointment?
///
/// `doctor_user_id` is the user id behind the appointment's doctor profile.
pub fn check_appointment_access(
    caller: &CallerContext,
    patient_id: &Uuid,
    doctor_user_id: &Uuid,
) -> AccessDecision {
    match caller.role {
        Role::Patient if caller.id == *patient_id => {
            AccessDecision::allow(AccessReason::BookedPatient)
        }
        Role::Doctor if caller.id == *doctor_user_id => {
            AccessDecision::allow(AccessReason::OwningDoctor)
        }
        _ => AccessDecision::deny(),
    }
}

/// Which target statuses a caller may request at all.
/// Doctors may set any status; patients may only cancel.
pub fn may_request_status(role: Role, target: AppointmentStatus) -> bool {
    match role {
        Role::Doctor => true,
        Role::Patient => target == AppointmentStatus::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role) -> CallerContext {
        CallerContext {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: "test@x.com".into(),
            role,
        }
    }

    #[test]
    fn require_role_matches() {
        let doctor = caller(Role::Doctor);
        assert!(require_role(&doctor, Role::Doctor).is_ok());
        assert_eq!(
            require_role(&doctor, Role::Patient),
            Err(AuthorizationError::WrongRole {
                required: Role::Patient
            })
        );
    }

    #[test]
    fn booked_patient_allowed() {
        let patient = caller(Role::Patient);
        let decision = check_appointment_access(&patient, &patient.id, &Uuid::new_v4());
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::BookedPatient);
    }

    #[test]
    fn owning_doctor_allowed() {
        let doctor = caller(Role::Doctor);
        let decision = check_appointment_access(&doctor, &Uuid::new_v4(), &doctor.id);
        assert!(decision.allowed);
        assert_eq!(decision.reason, AccessReason::OwningDoctor);
    }

    #[test]
    fn other_doctor_denied() {
        let doctor = caller(Role::Doctor);
        let decision = check_appointment_access(&doctor, &Uuid::new_v4(), &Uuid::new_v4());
        assert!(!decision.allowed);
        assert_eq!(decision.reason, AccessReason::Denied);
    }

    #[test]
    fn patient_cannot_pass_as_doctor() {
        let patient = caller(Role::Patient);
        let decision = check_appointment_access(&patient, &Uuid::new_v4(), &patient.id);
        assert!(!decision.allowed);
    }

    #[test]
    fn patients_may_only_cancel() {
        assert!(may_request_status(Role::Patient, AppointmentStatus::Cancelled));
        assert!(!may_request_status(Role::Patient, AppointmentStatus::Confirmed));
        assert!(!may_request_status(Role::Patient, AppointmentStatus::Completed));
        assert!(may_request_status(Role::Doctor, AppointmentStatus::Confirmed));
    }
}
