pub mod auth;
pub mod broadcast;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod models;
pub mod policy;
pub mod routes;
pub mod store;

use std::sync::Arc;

use broadcast::fanout::PartyBroadcast;
use config::Config;
use engine::PartyEngine;
use store::chat::{ChatStore, MemoryChatStore};
use store::PartyStore;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PartyStore>,
    pub chat: Arc<dyn ChatStore>,
    pub engine: Arc<PartyEngine>,
    pub hub: PartyBroadcast,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the state graph around a chat collaborator.
    pub fn new(config: Config, chat: Arc<dyn ChatStore>) -> Self {
        let store = Arc::new(PartyStore::new());
        let hub = PartyBroadcast::new();
        let engine = Arc::new(PartyEngine::new(store.clone(), chat.clone(), hub.clone()));
        Self {
            store,
            chat,
            engine,
            hub,
            config: Arc::new(config),
        }
    }

    /// State backed by the in-memory chat store.
    pub fn in_memory(config: Config) -> Self {
        Self::new(config, Arc::new(MemoryChatStore::new()))
    }
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    AppState::in_memory(Config::default())
}
