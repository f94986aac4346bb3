use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::{bson::{doc, oid::ObjectId}, Collection};
use serde_json::{json, Value};
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::models::room::{CreateRoomRequest, Room, RoomQuery, RoomResponse};
use crate::models::user::Claims;
use crate::services::access::{self, Action};
use crate::state::AppState;

// Public browse of available listings
pub async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
) -> Result<Json<Value>> {
    let collection: Collection<Room> = state.db.collection("rooms");

    let mut filter = doc! { "is_available": true };

    if let Some(city) = &query.city {
        filter.insert("city", city);
    }
    if let Some(max_rent) = query.max_rent {
        filter.insert("rent", doc! { "$lte": max_rent });
    }

    let cursor = collection.find(filter).await?;
    let mut rooms: Vec<Room> = cursor.try_collect().await?;
    rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let responses: Vec<RoomResponse> = rooms.into_iter().map(RoomResponse::from).collect();

    Ok(Json(json!({ "success": true, "data": responses })))
}

pub async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let collection: Collection<Room> = state.db.collection("rooms");
    let room_id = ObjectId::parse_str(&id)?;

    let room = collection
        .find_one(doc! { "_id": room_id })
        .await?
        .ok_or(AppError::RoomNotFound)?;

    Ok(Json(json!({ "success": true, "data": RoomResponse::from(room) })))
}

pub async fn create_room(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateRoomRequest>,
) -> Result<Json<Value>> {
    let owner = access::require(&claims, Action::ManageRooms)?;
    payload.validate()?;

    let collection: Collection<Room> = state.db.collection("rooms");
    let now = Utc::now();

    let room = Room {
        id: Some(ObjectId::new()),
        owner,
        title: payload.title,
        description: payload.description,
        address: payload.address,
        city: payload.city,
        rent: payload.rent,
        total_rooms: payload.total_rooms,
        available_rooms: payload.total_rooms,
        is_available: true,
        amenities: payload.amenities,
        created_at: now,
        updated_at: now,
    };

    collection.insert_one(&room).await?;

    tracing::info!("✅ Room listed: {} in {}", room.title, room.city);

    Ok(Json(json!({ "success": true, "data": RoomResponse::from(room) })))
}

// Owner's own listings, including full ones
pub async fn my_rooms(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>> {
    let owner = access::require(&claims, Action::ManageRooms)?;

    let collection: Collection<Room> = state.db.collection("rooms");
    let cursor = collection.find(doc! { "owner": owner }).await?;
    let rooms: Vec<Room> = cursor.try_collect().await?;

    let responses: Vec<RoomResponse> = rooms.into_iter().map(RoomResponse::from).collect();

    Ok(Json(json!({ "success": true, "data": responses })))
}
