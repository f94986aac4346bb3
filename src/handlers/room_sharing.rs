// handlers/room_sharing.rs
//
// Room sharing lifecycle: a booking holder publishes a post, other
// students apply, the initiator accepts or rejects. Acceptance seats the
// applicant, decrements the bed count and may complete the post.
use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId},
    Collection,
};
use serde_json::{json, Value};
use tracing::{error, info};
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::models::application::{
    ApplicationResponse, ApplicationStatus, ApplyRequest, ReviewApplicationRequest,
    SharingApplication,
};
use crate::models::booking::Booking;
use crate::models::room::Room;
use crate::models::room_sharing::{
    CreateSharingRequest, Participant, ParticipantStatus, RoomSharing, SharingQuery,
    SharingResponse, SharingStatus,
};
use crate::models::user::{Claims, User};
use crate::services::access::{self, Action};
use crate::state::AppState;

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateSharingRequest>,
) -> Result<Json<Value>> {
    let initiator = access::require(&claims, Action::PublishSharing)?;
    payload.validate()?;

    let room_id = ObjectId::parse_str(&payload.room_id)?;

    // Only the holder of a live booking on the room may recruit roommates
    let bookings: Collection<Booking> = state.db.collection("bookings");
    let holds_booking = bookings
        .find_one(doc! {
            "student": initiator,
            "room": room_id,
            "status": { "$in": ["confirmed", "active"] },
        })
        .await?
        .is_some();

    if !holds_booking {
        return Err(AppError::Unauthorized);
    }

    let now = Utc::now();
    let post = RoomSharing {
        id: Some(ObjectId::new()),
        initiator,
        room: room_id,
        max_participants: payload.max_participants,
        beds_available: payload.beds_available,
        current_participants: vec![],
        status: SharingStatus::Active,
        completion_reason: None,
        completed_at: None,
        rent_share: payload.rent_share,
        requirements: payload.requirements,
        created_at: now,
        updated_at: now,
    };

    let posts: Collection<RoomSharing> = state.db.collection("room_sharings");
    posts.insert_one(&post).await?;

    info!("✅ Room sharing post published for room {}", room_id.to_hex());

    Ok(Json(json!({ "success": true, "data": SharingResponse::from(post) })))
}

// Browse: active posts only, with initiator and room joined read-side
pub async fn browse_posts(
    State(state): State<AppState>,
    Query(query): Query<SharingQuery>,
) -> Result<Json<Value>> {
    let posts: Collection<RoomSharing> = state.db.collection("room_sharings");
    let rooms: Collection<Room> = state.db.collection("rooms");

    let mut filter = doc! { "status": "active" };

    if let Some(city) = &query.city {
        let city_rooms: Vec<Room> = rooms
            .find(doc! { "city": city })
            .await?
            .try_collect()
            .await?;
        let ids: Vec<ObjectId> = city_rooms.iter().filter_map(|r| r.id).collect();
        filter.insert("room", doc! { "$in": ids });
    }

    let mut active: Vec<RoomSharing> = posts.find(filter).await?.try_collect().await?;
    active.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let room_ids: Vec<ObjectId> = active.iter().map(|p| p.room).collect();
    let initiator_ids: Vec<ObjectId> = active.iter().map(|p| p.initiator).collect();

    let room_docs: Vec<Room> = rooms
        .find(doc! { "_id": { "$in": room_ids } })
        .await?
        .try_collect()
        .await?;

    let users: Collection<User> = state.db.collection("users");
    let initiators: Vec<User> = users
        .find(doc! { "_id": { "$in": initiator_ids } })
        .await?
        .try_collect()
        .await?;

    let views: Vec<Value> = active
        .into_iter()
        .map(|post| {
            let room = room_docs.iter().find(|r| r.id == Some(post.room));
            let initiator = initiators.iter().find(|u| u._id == Some(post.initiator));
            json!({
                "post": SharingResponse::from(post),
                "room": room.map(|r| json!({
                    "title": r.title,
                    "city": r.city,
                    "address": r.address,
                    "rent": r.rent,
                })),
                "initiator": initiator.map(|u| json!({ "name": u.name })),
            })
        })
        .collect();

    Ok(Json(json!({ "success": true, "data": views })))
}

pub async fn my_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>> {
    let initiator = access::require(&claims, Action::PublishSharing)?;

    let posts: Collection<RoomSharing> = state.db.collection("room_sharings");
    let mine: Vec<RoomSharing> = posts
        .find(doc! { "initiator": initiator })
        .await?
        .try_collect()
        .await?;

    let responses: Vec<SharingResponse> = mine.into_iter().map(SharingResponse::from).collect();

    Ok(Json(json!({ "success": true, "data": responses })))
}

pub async fn apply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ApplyRequest>,
) -> Result<Json<Value>> {
    let applicant = access::require(&claims, Action::ApplyToSharing)?;
    payload.validate()?;

    let post_id = ObjectId::parse_str(&payload.room_sharing_id)?;

    let posts: Collection<RoomSharing> = state.db.collection("room_sharings");
    let post = posts
        .find_one(doc! { "_id": post_id })
        .await?
        .ok_or(AppError::SharingPostNotFound)?;

    if post.status != SharingStatus::Active {
        return Err(AppError::conflict("Room sharing post is not active"));
    }
    if post.initiator == applicant {
        return Err(AppError::invalid_data("You cannot apply to your own post"));
    }

    let application = SharingApplication::new(
        post_id,
        applicant,
        payload.message,
        payload.study_habits,
        payload.lifestyle,
    );

    // The unique (room_sharing, applicant) index is the real guard here;
    // a concurrent duplicate apply loses with E11000 and surfaces as 409
    let applications: Collection<SharingApplication> =
        state.db.collection("room_sharing_applications");
    applications
        .insert_one(&application)
        .await
        .map_err(AppError::from_write_error)?;

    info!(
        "✅ Application submitted: {} -> post {}",
        applicant.to_hex(),
        post_id.to_hex()
    );

    Ok(Json(json!({ "success": true, "data": ApplicationResponse::from(application) })))
}

pub async fn my_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>> {
    let applicant = access::require(&claims, Action::ApplyToSharing)?;

    let applications: Collection<SharingApplication> =
        state.db.collection("room_sharing_applications");
    let mine: Vec<SharingApplication> = applications
        .find(doc! { "applicant": applicant })
        .await?
        .try_collect()
        .await?;

    let post_ids: Vec<ObjectId> = mine.iter().map(|a| a.room_sharing).collect();
    let posts: Collection<RoomSharing> = state.db.collection("room_sharings");
    let post_docs: Vec<RoomSharing> = posts
        .find(doc! { "_id": { "$in": post_ids } })
        .await?
        .try_collect()
        .await?;

    let views: Vec<Value> = mine
        .into_iter()
        .map(|app| {
            let post = post_docs.iter().find(|p| p.id == Some(app.room_sharing));
            json!({
                "application": ApplicationResponse::from(app),
                "post": post.map(|p| json!({
                    "rent_share": p.rent_share,
                    "status": p.status,
                    "max_participants": p.max_participants,
                })),
            })
        })
        .collect();

    Ok(Json(json!({ "success": true, "data": views })))
}

// Applications for one of the caller's own posts, applicant profile joined
pub async fn post_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let caller = access::require(&claims, Action::ReviewApplication)?;
    let post_id = ObjectId::parse_str(&id)?;

    let posts: Collection<RoomSharing> = state.db.collection("room_sharings");
    let post = posts
        .find_one(doc! { "_id": post_id })
        .await?
        .ok_or(AppError::SharingPostNotFound)?;

    if post.initiator != caller {
        return Err(AppError::Unauthorized);
    }

    let applications: Collection<SharingApplication> =
        state.db.collection("room_sharing_applications");
    let apps: Vec<SharingApplication> = applications
        .find(doc! { "room_sharing": post_id })
        .await?
        .try_collect()
        .await?;

    let applicant_ids: Vec<ObjectId> = apps.iter().map(|a| a.applicant).collect();
    let users: Collection<User> = state.db.collection("users");
    let applicants: Vec<User> = users
        .find(doc! { "_id": { "$in": applicant_ids } })
        .await?
        .try_collect()
        .await?;

    let views: Vec<Value> = apps
        .into_iter()
        .map(|app| {
            let applicant = applicants.iter().find(|u| u._id == Some(app.applicant));
            json!({
                "application": ApplicationResponse::from(app),
                "applicant": applicant.map(|u| json!({
                    "name": u.name,
                    "email": u.email,
                })),
            })
        })
        .collect();

    Ok(Json(json!({ "success": true, "data": views })))
}

pub async fn review_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<ReviewApplicationRequest>,
) -> Result<Json<Value>> {
    let reviewer = access::require(&claims, Action::ReviewApplication)?;
    let application_id = ObjectId::parse_str(&id)?;

    let applications: Collection<SharingApplication> =
        state.db.collection("room_sharing_applications");
    let mut application = applications
        .find_one(doc! { "_id": application_id })
        .await?
        .ok_or(AppError::ApplicationNotFound)?;

    let posts: Collection<RoomSharing> = state.db.collection("room_sharings");
    let post = posts
        .find_one(doc! { "_id": application.room_sharing })
        .await?
        .ok_or(AppError::SharingPostNotFound)?;

    if post.initiator != reviewer {
        return Err(AppError::Unauthorized);
    }

    let now = Utc::now();

    match payload.action.as_str() {
        "reject" => {
            application.reject(reviewer, payload.rejection_reason.clone(), now)?;

            let updated = applications
                .update_one(
                    doc! { "_id": application_id, "status": "pending" },
                    doc! { "$set": {
                        "status": ApplicationStatus::Rejected.as_str(),
                        "reviewed_at": now.to_rfc3339(),
                        "reviewed_by": reviewer,
                        "rejection_reason": payload.rejection_reason.as_deref(),
                    }},
                )
                .await?;

            if updated.modified_count == 0 {
                return Err(AppError::conflict("Application has already been reviewed"));
            }

            Ok(Json(json!({ "success": true, "data": ApplicationResponse::from(application) })))
        }
        "accept" => {
            if post.status != SharingStatus::Active {
                return Err(AppError::conflict("Room sharing post is not active"));
            }
            if post.is_full() {
                return Err(AppError::conflict("Room sharing post is already full"));
            }

            application.accept(reviewer, now)?;

            // The pending guard in the filter makes a racing double-accept
            // lose here, before the post is touched
            let updated = applications
                .update_one(
                    doc! { "_id": application_id, "status": "pending" },
                    doc! { "$set": {
                        "status": ApplicationStatus::Accepted.as_str(),
                        "reviewed_at": now.to_rfc3339(),
                        "reviewed_by": reviewer,
                    }},
                )
                .await?;

            if updated.modified_count == 0 {
                return Err(AppError::conflict("Application has already been reviewed"));
            }

            let participant = Participant {
                user: application.applicant,
                status: ParticipantStatus::Confirmed,
                joined_at: now,
            };
            let participant_doc = bson::to_bson(&participant)
                .map_err(|e| AppError::service(format!("Participant encoding failed: {}", e)))?;

            // Seat the roommate and take a bed in one guarded atomic update;
            // the bed floor lives in the filter
            let seated = posts
                .find_one_and_update(
                    doc! {
                        "_id": application.room_sharing,
                        "status": "active",
                        "beds_available": { "$gt": 0 },
                    },
                    doc! {
                        "$push": { "current_participants": participant_doc },
                        "$inc": { "beds_available": -1 },
                        "$set": { "updated_at": now.to_rfc3339() },
                    },
                )
                .return_document(mongodb::options::ReturnDocument::After)
                .await?;

            let mut seated = match seated {
                Some(post) => post,
                None => {
                    // Application is already accepted; the seat was lost to a
                    // concurrent acceptance. Logged, not rolled back.
                    error!(
                        "Accepted application {} could not be seated on post {}",
                        application_id.to_hex(),
                        application.room_sharing.to_hex()
                    );
                    return Err(AppError::conflict(
                        "Room sharing post is no longer accepting participants",
                    ));
                }
            };

            if seated.evaluate_completion(now) {
                posts
                    .update_one(
                        doc! { "_id": application.room_sharing, "status": "active" },
                        doc! { "$set": {
                            "status": SharingStatus::Completed.as_str(),
                            "completion_reason": seated.completion_reason.as_deref(),
                            "completed_at": now.to_rfc3339(),
                            "updated_at": now.to_rfc3339(),
                        }},
                    )
                    .await?;
                info!(
                    "🏠 Room sharing post {} completed ({})",
                    application.room_sharing.to_hex(),
                    seated.completion_reason.as_deref().unwrap_or_default()
                );
            }

            Ok(Json(json!({
                "success": true,
                "data": {
                    "application": ApplicationResponse::from(application),
                    "post": SharingResponse::from(seated),
                }
            })))
        }
        other => Err(AppError::invalid_data(format!(
            "Unknown action '{}', expected accept or reject",
            other
        ))),
    }
}

pub async fn cancel_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let caller = access::require(&claims, Action::CancelApplication)?;
    let application_id = ObjectId::parse_str(&id)?;

    let applications: Collection<SharingApplication> =
        state.db.collection("room_sharing_applications");
    let application = applications
        .find_one(doc! { "_id": application_id })
        .await?
        .ok_or(AppError::ApplicationNotFound)?;

    application.can_cancel(caller)?;

    let deleted = applications
        .delete_one(doc! {
            "_id": application_id,
            "applicant": caller,
            "status": "pending",
        })
        .await?;

    if deleted.deleted_count == 0 {
        return Err(AppError::conflict("Application has already been reviewed"));
    }

    info!("🗑️ Application {} cancelled by applicant", application_id.to_hex());

    Ok(Json(json!({ "success": true })))
}
