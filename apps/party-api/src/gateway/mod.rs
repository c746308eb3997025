//! WebSocket gateway: the lobby feed and per-party rooms.

pub mod server;

pub use server::router;
