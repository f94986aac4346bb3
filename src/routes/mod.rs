pub mod auth;
pub mod bookings;
pub mod payments;
pub mod room_sharing;
pub mod rooms;
