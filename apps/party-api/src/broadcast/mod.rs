pub mod events;
pub mod fanout;
pub mod outbox;
