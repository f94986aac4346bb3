use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;
use validator::Validate;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

// One student's request to join a room sharing post.
// At most one per (room_sharing, applicant), enforced by a unique index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharingApplication {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub room_sharing: ObjectId,
    pub applicant: ObjectId,

    pub message: Option<String>,
    pub study_habits: Option<String>,
    pub lifestyle: Option<String>,

    pub status: ApplicationStatus,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<ObjectId>,
    pub rejection_reason: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl SharingApplication {
    pub fn new(
        room_sharing: ObjectId,
        applicant: ObjectId,
        message: Option<String>,
        study_habits: Option<String>,
        lifestyle: Option<String>,
    ) -> Self {
        SharingApplication {
            id: Some(ObjectId::new()),
            room_sharing,
            applicant,
            message,
            study_habits,
            lifestyle,
            status: ApplicationStatus::Pending,
            reviewed_at: None,
            reviewed_by: None,
            rejection_reason: None,
            created_at: Utc::now(),
        }
    }

    pub fn accept(&mut self, reviewer: ObjectId, now: DateTime<Utc>) -> Result<()> {
        if self.status != ApplicationStatus::Pending {
            return Err(AppError::conflict(format!(
                "Application has already been {}",
                self.status.as_str()
            )));
        }
        self.status = ApplicationStatus::Accepted;
        self.reviewed_at = Some(now);
        self.reviewed_by = Some(reviewer);
        Ok(())
    }

    pub fn reject(
        &mut self,
        reviewer: ObjectId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.status != ApplicationStatus::Pending {
            return Err(AppError::conflict(format!(
                "Application has already been {}",
                self.status.as_str()
            )));
        }
        self.status = ApplicationStatus::Rejected;
        self.reviewed_at = Some(now);
        self.reviewed_by = Some(reviewer);
        self.rejection_reason = reason;
        Ok(())
    }

    /// Only the applicant may cancel, and only while still pending.
    pub fn can_cancel(&self, caller: ObjectId) -> Result<()> {
        if self.applicant != caller {
            return Err(AppError::Unauthorized);
        }
        if self.status != ApplicationStatus::Pending {
            return Err(AppError::conflict(format!(
                "Application has already been {}",
                self.status.as_str()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyRequest {
    pub room_sharing_id: String,
    #[validate(length(max = 1000))]
    pub message: Option<String>,
    #[validate(length(max = 200))]
    pub study_habits: Option<String>,
    #[validate(length(max = 200))]
    pub lifestyle: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewApplicationRequest {
    pub action: String, // "accept" | "reject"
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    pub id: String,
    pub room_sharing: String,
    pub applicant: String,
    pub message: Option<String>,
    pub study_habits: Option<String>,
    pub lifestyle: Option<String>,
    pub status: ApplicationStatus,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<SharingApplication> for ApplicationResponse {
    fn from(app: SharingApplication) -> Self {
        ApplicationResponse {
            id: app.id.map(|id| id.to_hex()).unwrap_or_default(),
            room_sharing: app.room_sharing.to_hex(),
            applicant: app.applicant.to_hex(),
            message: app.message,
            study_habits: app.study_habits,
            lifestyle: app.lifestyle,
            status: app.status,
            reviewed_at: app.reviewed_at,
            rejection_reason: app.rejection_reason,
            created_at: app.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application() -> SharingApplication {
        SharingApplication::new(ObjectId::new(), ObjectId::new(), None, None, None)
    }

    #[test]
    fn accept_stamps_reviewer() {
        let mut app = application();
        let reviewer = ObjectId::new();
        let now = Utc::now();

        app.accept(reviewer, now).unwrap();
        assert_eq!(app.status, ApplicationStatus::Accepted);
        assert_eq!(app.reviewed_by, Some(reviewer));
        assert!(app.reviewed_at.is_some());
    }

    #[test]
    fn review_requires_pending() {
        let mut app = application();
        let reviewer = ObjectId::new();
        let now = Utc::now();

        app.reject(reviewer, Some("room vibe mismatch".to_string()), now)
            .unwrap();
        assert_eq!(app.status, ApplicationStatus::Rejected);
        assert_eq!(app.rejection_reason.as_deref(), Some("room vibe mismatch"));

        assert!(app.accept(reviewer, now).is_err());
        assert!(app.reject(reviewer, None, now).is_err());
        assert_eq!(app.status, ApplicationStatus::Rejected);
    }

    #[test]
    fn cancel_is_applicant_only_and_pending_only() {
        let mut app = application();
        let now = Utc::now();

        assert!(app.can_cancel(ObjectId::new()).is_err());
        assert!(app.can_cancel(app.applicant).is_ok());

        app.accept(ObjectId::new(), now).unwrap();
        assert!(app.can_cancel(app.applicant).is_err());
    }
}
