//! Chat collaborator boundary.
//!
//! The party core only creates and looks up messages (for history and
//! pinning); rendering and pagination live elsewhere. Backed by an
//! in-memory map here, swappable for a persistent store later.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::ApiError;
use crate::models::message::ChatMessage;

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn create_message(&self, message: ChatMessage) -> Result<ChatMessage, ApiError>;
    async fn get_message(
        &self,
        party_id: &str,
        message_id: &str,
    ) -> Result<Option<ChatMessage>, ApiError>;
    /// Most recent `limit` messages in chronological order.
    async fn list_recent(&self, party_id: &str, limit: usize) -> Result<Vec<ChatMessage>, ApiError>;
    /// Drop a party's entire history (party closure cascade).
    async fn purge_party(&self, party_id: &str) -> Result<(), ApiError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

pub struct MemoryChatStore {
    messages: DashMap<String, Vec<ChatMessage>>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self {
            messages: DashMap::new(),
        }
    }
}

impl Default for MemoryChatStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn create_message(&self, message: ChatMessage) -> Result<ChatMessage, ApiError> {
        self.messages
            .entry(message.party_id.clone())
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn get_message(
        &self,
        party_id: &str,
        message_id: &str,
    ) -> Result<Option<ChatMessage>, ApiError> {
        Ok(self
            .messages
            .get(party_id)
            .and_then(|list| list.iter().find(|m| m.id == message_id).cloned()))
    }

    async fn list_recent(&self, party_id: &str, limit: usize) -> Result<Vec<ChatMessage>, ApiError> {
        Ok(self
            .messages
            .get(party_id)
            .map(|list| {
                let skip = list.len().saturating_sub(limit);
                list.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default())
    }

    async fn purge_party(&self, party_id: &str) -> Result<(), ApiError> {
        self.messages.remove(party_id);
        Ok(())
    }
}
