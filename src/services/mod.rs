pub mod chat;
pub mod events;
pub mod scheduler;
pub mod sessions;
pub mod voting;
