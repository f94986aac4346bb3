use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::{bson::{doc, oid::ObjectId}, Collection};
use serde_json::{json, Value};

use crate::errors::{AppError, Result};
use crate::models::booking::{
    Booking, BookingDecisionRequest, BookingResponse, CreateBookingRequest,
};
use crate::models::room::Room;
use crate::models::user::{Claims, Role};
use crate::services::access::{self, Action};
use crate::state::AppState;

pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<Json<Value>> {
    let student = access::require(&claims, Action::RequestBooking)?;
    let room_id = ObjectId::parse_str(&payload.room_id)?;

    let rooms: Collection<Room> = state.db.collection("rooms");
    let room = rooms
        .find_one(doc! { "_id": room_id })
        .await?
        .ok_or(AppError::RoomNotFound)?;

    if !room.is_available {
        return Err(AppError::conflict("Room has no availability"));
    }

    let booking = Booking::new(student, room.owner, room_id, room.rent);

    let bookings: Collection<Booking> = state.db.collection("bookings");
    bookings.insert_one(&booking).await?;

    tracing::info!(
        "✅ Booking requested: student {} -> room {}",
        student.to_hex(),
        room_id.to_hex()
    );

    Ok(Json(json!({ "success": true, "data": BookingResponse::from(booking) })))
}

// Role-dependent view: students see their own bookings, owners see
// bookings placed against their rooms.
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>> {
    let caller = ObjectId::parse_str(&claims.sub)
        .map_err(|_| AppError::InvalidObjectId(claims.sub.clone()))?;

    let filter = match claims.role {
        Role::Student => doc! { "student": caller },
        Role::Owner => doc! { "owner": caller },
    };

    let collection: Collection<Booking> = state.db.collection("bookings");
    let cursor = collection.find(filter).await?;
    let mut bookings: Vec<Booking> = cursor.try_collect().await?;
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let responses: Vec<BookingResponse> =
        bookings.into_iter().map(BookingResponse::from).collect();

    Ok(Json(json!({ "success": true, "data": responses })))
}

pub async fn decide_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(payload): Json<BookingDecisionRequest>,
) -> Result<Json<Value>> {
    let owner = access::require(&claims, Action::DecideBooking)?;
    let booking_id = ObjectId::parse_str(&id)?;

    let accept = match payload.action.as_str() {
        "accept" => true,
        "reject" => false,
        other => {
            return Err(AppError::invalid_data(format!(
                "Unknown action '{}', expected accept or reject",
                other
            )))
        }
    };

    let collection: Collection<Booking> = state.db.collection("bookings");
    let mut booking = collection
        .find_one(doc! { "_id": booking_id, "owner": owner })
        .await?
        .ok_or(AppError::BookingNotFound)?;

    let now = Utc::now();
    booking.decide(accept, now)?;

    // The pending precondition is re-asserted in the filter so a
    // concurrent decision cannot double-apply.
    let updated = collection
        .update_one(
            doc! { "_id": booking_id, "owner": owner, "status": "pending" },
            doc! { "$set": {
                "status": booking.status.as_str(),
                "updated_at": now.to_rfc3339(),
            }},
        )
        .await?;

    if updated.modified_count == 0 {
        return Err(AppError::conflict("Booking has already been decided"));
    }

    Ok(Json(json!({ "success": true, "data": BookingResponse::from(booking) })))
}
