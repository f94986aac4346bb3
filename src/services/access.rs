// services/access.rs
//
// Role capability matrix. Handlers go through `require` instead of
// comparing role strings inline; resource-level ownership is still
// asserted against the loaded document (or the query filter itself).
use mongodb::bson::oid::ObjectId;

use crate::errors::{AppError, Result};
use crate::models::user::{Claims, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ManageRooms,
    RequestBooking,
    DecideBooking,
    StartOnlinePayment,
    ConfirmPaymentSent,
    ConfirmPaymentReceived,
    PublishSharing,
    ApplyToSharing,
    ReviewApplication,
    CancelApplication,
}

pub fn can_perform(role: Role, action: Action) -> bool {
    match action {
        Action::ManageRooms
        | Action::DecideBooking
        | Action::ConfirmPaymentReceived => role == Role::Owner,

        Action::RequestBooking
        | Action::StartOnlinePayment
        | Action::ConfirmPaymentSent
        | Action::PublishSharing
        | Action::ApplyToSharing
        | Action::ReviewApplication
        | Action::CancelApplication => role == Role::Student,
    }
}

/// Checks the caller's role against the capability matrix and parses the
/// subject id. Authorization failures short-circuit before any mutation.
pub fn require(claims: &Claims, action: Action) -> Result<ObjectId> {
    if !can_perform(claims.role, action) {
        return Err(AppError::Unauthorized);
    }
    ObjectId::parse_str(&claims.sub)
        .map_err(|_| AppError::InvalidObjectId(claims.sub.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role) -> Claims {
        Claims {
            sub: ObjectId::new().to_hex(),
            email: "test@unistay.in".to_string(),
            role,
            exp: 0,
        }
    }

    #[test]
    fn owners_confirm_receipts_students_do_not() {
        assert!(can_perform(Role::Owner, Action::ConfirmPaymentReceived));
        assert!(!can_perform(Role::Student, Action::ConfirmPaymentReceived));
    }

    #[test]
    fn students_drive_the_sharing_lifecycle() {
        for action in [
            Action::PublishSharing,
            Action::ApplyToSharing,
            Action::ReviewApplication,
            Action::CancelApplication,
        ] {
            assert!(can_perform(Role::Student, action));
            assert!(!can_perform(Role::Owner, action));
        }
    }

    #[test]
    fn require_rejects_wrong_role() {
        let owner = claims(Role::Owner);
        assert!(require(&owner, Action::RequestBooking).is_err());
        assert!(require(&owner, Action::ManageRooms).is_ok());
    }

    #[test]
    fn require_parses_subject() {
        let student = claims(Role::Student);
        let id = require(&student, Action::RequestBooking).unwrap();
        assert_eq!(id.to_hex(), student.sub);
    }
}
