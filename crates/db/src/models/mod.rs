pub mod direct_chat;
pub mod message;
pub mod request;
pub mod room;
pub mod room_chat;
pub mod user;

pub use direct_chat::*;
pub use message::*;
pub use request::*;
pub use room::*;
pub use room_chat::*;
pub use user::*;
