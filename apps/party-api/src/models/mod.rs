pub mod blacklist;
pub mod join_request;
pub mod member;
pub mod message;
pub mod party;
pub mod waitlist;
