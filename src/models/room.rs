use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;
use validator::Validate;

// Database model for the rooms collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub owner: ObjectId,
    pub title: String,
    pub description: String,
    pub address: String,
    pub city: String,

    // Monthly rent in rupees
    pub rent: f64,

    pub total_rooms: i32,
    pub available_rooms: i32,
    pub is_available: bool,

    #[serde(default)]
    pub amenities: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoomRequest {
    #[validate(length(min = 3, max = 120))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: String,
    #[validate(length(min = 3, max = 200))]
    pub address: String,
    #[validate(length(min = 2, max = 60))]
    pub city: String,
    #[validate(range(min = 1.0))]
    pub rent: f64,
    #[validate(range(min = 1, max = 100))]
    pub total_rooms: i32,
    #[serde(default)]
    pub amenities: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    pub city: Option<String>,
    pub max_rent: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub rent: f64,
    pub total_rooms: i32,
    pub available_rooms: i32,
    pub is_available: bool,
    pub amenities: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Room> for RoomResponse {
    fn from(room: Room) -> Self {
        RoomResponse {
            id: room.id.map(|id| id.to_hex()).unwrap_or_default(),
            owner: room.owner.to_hex(),
            title: room.title,
            description: room.description,
            address: room.address,
            city: room.city,
            rent: room.rent,
            total_rooms: room.total_rooms,
            available_rooms: room.available_rooms,
            is_available: room.is_available,
            amenities: room.amenities,
            created_at: room.created_at,
        }
    }
}
