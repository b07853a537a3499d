use axum::extract::ws::{Message, WebSocket};
use bson::oid::ObjectId;
use dashmap::DashMap;
use futures::stream::SplitSink;
use std::{collections::HashSet, sync::Arc};
use tokio::sync::Mutex;

pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// A delivery channel. Every connection sits in its user's personal
/// channel; conversation channels are joined and left explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelKey {
    /// Personal channel: all of one user's connections (tabs, devices).
    User(ObjectId),
    /// A direct chat's subscribers, keyed by chat id.
    Chat(ObjectId),
    /// A room chat's subscribers, keyed by room id.
    Room(ObjectId),
}

/// Tracks live WebSocket connections and their channel subscriptions.
/// Connections are keyed by a per-socket id so the same user can be
/// connected multiple times without the subscriptions colliding.
pub struct ChannelRegistry {
    connections: DashMap<String, WsSender>,
    channels: DashMap<ChannelKey, HashSet<String>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            channels: DashMap::new(),
        }
    }

    pub fn add_connection(&self, connection_id: String, sender: WsSender) {
        self.connections.insert(connection_id, sender);
    }

    /// Drops the connection and sweeps it out of every channel it joined.
    pub fn remove_connection(&self, connection_id: &str) {
        self.connections.remove(connection_id);
        self.channels.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });
    }

    pub fn join(&self, key: ChannelKey, connection_id: &str) {
        self.channels
            .entry(key)
            .or_default()
            .insert(connection_id.to_string());
    }

    pub fn leave(&self, key: &ChannelKey, connection_id: &str) {
        if let Some(mut members) = self.channels.get_mut(key) {
            members.remove(connection_id);
            if members.is_empty() {
                drop(members);
                self.channels.remove(key);
            }
        }
    }

    pub fn sender(&self, connection_id: &str) -> Option<WsSender> {
        self.connections.get(connection_id).map(|s| s.clone())
    }

    /// The senders currently subscribed to a channel, optionally excluding
    /// one connection (the originator of an event).
    pub fn subscribers(&self, key: &ChannelKey, except: Option<&str>) -> Vec<WsSender> {
        let Some(members) = self.channels.get(key) else {
            return Vec::new();
        };
        members
            .iter()
            .filter(|id| except != Some(id.as_str()))
            .filter_map(|id| self.sender(id))
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
