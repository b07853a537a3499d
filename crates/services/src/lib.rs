pub mod auth;
pub mod dao;
pub mod messaging;

pub use auth::AuthService;
pub use messaging::ChatService;
