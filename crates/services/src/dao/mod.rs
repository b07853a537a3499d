pub mod base;
pub mod direct_chat;
pub mod request;
pub mod room;
pub mod room_chat;
pub mod user;

pub use direct_chat::DirectChatDao;
pub use request::RequestDao;
pub use room::RoomDao;
pub use room_chat::RoomChatDao;
pub use user::UserDao;
