pub(crate) mod auth;
pub(crate) mod bookings;
pub(crate) mod payments;
pub(crate) mod room_sharing;
pub(crate) mod rooms;
