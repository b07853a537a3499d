use flatmate_config::Settings;
use flatmate_services::{
    AuthService, ChatService,
    dao::{DirectChatDao, RequestDao, RoomChatDao, RoomDao, UserDao},
};
use mongodb::Database;
use std::sync::Arc;

use crate::ws::session::ChannelRegistry;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserDao>,
    pub rooms: Arc<RoomDao>,
    pub requests: Arc<RequestDao>,
    pub chat: Arc<ChatService>,
    pub channels: Arc<ChannelRegistry>,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let users = Arc::new(UserDao::new(&db));
        let rooms = Arc::new(RoomDao::new(&db));
        let requests = Arc::new(RequestDao::new(&db));
        let direct_chats = Arc::new(DirectChatDao::new(&db));
        let room_chats = Arc::new(RoomChatDao::new(&db));
        let chat = Arc::new(ChatService::new(
            users.clone(),
            rooms.clone(),
            direct_chats,
            room_chats,
        ));
        let channels = Arc::new(ChannelRegistry::new());

        Self {
            db,
            settings,
            auth,
            users,
            rooms,
            requests,
            chat,
            channels,
        }
    }
}
