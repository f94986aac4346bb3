use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;
use validator::Validate;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharingStatus {
    Active,
    Completed,
    Cancelled,
}

impl SharingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SharingStatus::Active => "active",
            SharingStatus::Completed => "completed",
            SharingStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Confirmed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub user: ObjectId,
    pub status: ParticipantStatus,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharingRequirements {
    pub gender_preference: Option<String>,
    pub study_habits: Option<String>,
    pub lifestyle: Option<String>,
}

// A post offering to co-share an already booked room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSharing {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub initiator: ObjectId,
    pub room: ObjectId,

    pub max_participants: i32,
    pub beds_available: i32,

    #[serde(default)]
    pub current_participants: Vec<Participant>,

    pub status: SharingStatus,
    pub completion_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,

    // Rent share per participant, rupees/month
    pub rent_share: f64,

    #[serde(default)]
    pub requirements: SharingRequirements,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomSharing {
    pub fn confirmed_participants(&self) -> usize {
        self.current_participants
            .iter()
            .filter(|p| p.status == ParticipantStatus::Confirmed)
            .count()
    }

    /// The initiator implicitly occupies one of the `max_participants`
    /// slots, so the post fills at `max_participants - 1` confirmed
    /// roommates, or earlier if the room runs out of beds.
    pub fn is_full(&self) -> bool {
        self.confirmed_participants() as i32 >= self.max_participants - 1
            || self.beds_available == 0
    }

    /// Adds a confirmed roommate, decrementing the bed count (floored at
    /// zero). Rejects posts that are not accepting participants.
    pub fn add_participant(&mut self, user: ObjectId, now: DateTime<Utc>) -> Result<()> {
        if self.status != SharingStatus::Active {
            return Err(AppError::conflict("Room sharing post is not active"));
        }
        if self.is_full() {
            return Err(AppError::conflict("Room sharing post is already full"));
        }

        self.current_participants.push(Participant {
            user,
            status: ParticipantStatus::Confirmed,
            joined_at: now,
        });
        self.beds_available = (self.beds_available - 1).max(0);
        self.updated_at = now;
        Ok(())
    }

    /// Transitions the post to `completed` when it has filled up.
    /// Returns whether the transition fired so callers can persist it.
    pub fn evaluate_completion(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != SharingStatus::Active || !self.is_full() {
            return false;
        }

        let reason = if self.beds_available == 0 {
            "no_beds_available"
        } else {
            "max_participants_reached"
        };

        self.status = SharingStatus::Completed;
        self.completion_reason = Some(reason.to_string());
        self.completed_at = Some(now);
        self.updated_at = now;
        true
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSharingRequest {
    pub room_id: String,
    #[validate(range(min = 2, max = 12))]
    pub max_participants: i32,
    #[validate(range(min = 1, max = 12))]
    pub beds_available: i32,
    #[validate(range(min = 1.0))]
    pub rent_share: f64,
    #[serde(default)]
    pub requirements: SharingRequirements,
}

#[derive(Debug, Deserialize)]
pub struct SharingQuery {
    pub city: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SharingResponse {
    pub id: String,
    pub initiator: String,
    pub room: String,
    pub max_participants: i32,
    pub beds_available: i32,
    pub current_participants: Vec<Participant>,
    pub status: SharingStatus,
    pub completion_reason: Option<String>,
    pub rent_share: f64,
    pub requirements: SharingRequirements,
    pub created_at: DateTime<Utc>,
}

impl From<RoomSharing> for SharingResponse {
    fn from(post: RoomSharing) -> Self {
        SharingResponse {
            id: post.id.map(|id| id.to_hex()).unwrap_or_default(),
            initiator: post.initiator.to_hex(),
            room: post.room.to_hex(),
            max_participants: post.max_participants,
            beds_available: post.beds_available,
            current_participants: post.current_participants,
            status: post.status,
            completion_reason: post.completion_reason,
            rent_share: post.rent_share,
            requirements: post.requirements,
            created_at: post.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(max_participants: i32, beds_available: i32) -> RoomSharing {
        let now = Utc::now();
        RoomSharing {
            id: Some(ObjectId::new()),
            initiator: ObjectId::new(),
            room: ObjectId::new(),
            max_participants,
            beds_available,
            current_participants: vec![],
            status: SharingStatus::Active,
            completion_reason: None,
            completed_at: None,
            rent_share: 5000.0,
            requirements: SharingRequirements::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn accept_decrements_beds_and_stays_active_below_threshold() {
        let mut p = post(3, 2);
        let now = Utc::now();

        p.add_participant(ObjectId::new(), now).unwrap();
        assert_eq!(p.beds_available, 1);
        assert_eq!(p.confirmed_participants(), 1);

        // 1 confirmed < max_participants - 1 == 2, so still open
        assert!(!p.evaluate_completion(now));
        assert_eq!(p.status, SharingStatus::Active);
    }

    #[test]
    fn completes_when_participants_reach_threshold() {
        let mut p = post(3, 5);
        let now = Utc::now();

        p.add_participant(ObjectId::new(), now).unwrap();
        p.add_participant(ObjectId::new(), now).unwrap();

        assert!(p.evaluate_completion(now));
        assert_eq!(p.status, SharingStatus::Completed);
        assert_eq!(
            p.completion_reason.as_deref(),
            Some("max_participants_reached")
        );
        assert!(p.completed_at.is_some());
    }

    #[test]
    fn completes_when_beds_run_out() {
        let mut p = post(6, 1);
        let now = Utc::now();

        p.add_participant(ObjectId::new(), now).unwrap();
        assert_eq!(p.beds_available, 0);

        assert!(p.evaluate_completion(now));
        assert_eq!(p.completion_reason.as_deref(), Some("no_beds_available"));
    }

    #[test]
    fn full_post_rejects_new_participants() {
        let mut p = post(2, 4);
        let now = Utc::now();

        p.add_participant(ObjectId::new(), now).unwrap();
        assert!(p.add_participant(ObjectId::new(), now).is_err());
        assert_eq!(p.confirmed_participants(), 1);
    }

    #[test]
    fn beds_never_go_negative() {
        let mut p = post(10, 1);
        let now = Utc::now();

        p.add_participant(ObjectId::new(), now).unwrap();
        assert_eq!(p.beds_available, 0);
        assert!(p.add_participant(ObjectId::new(), now).is_err());
        assert_eq!(p.beds_available, 0);
    }

    #[test]
    fn completion_fires_once() {
        let mut p = post(2, 2);
        let now = Utc::now();

        p.add_participant(ObjectId::new(), now).unwrap();
        assert!(p.evaluate_completion(now));
        assert!(!p.evaluate_completion(now));
    }
}
