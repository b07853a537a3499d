pub mod auth;
pub mod chat;
pub mod request;
pub mod room;
pub mod room_chat;
