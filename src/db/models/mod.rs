mod event;
mod server_config;
mod vote_option;

pub use event::EventRow;
pub use server_config::ServerConfig;
pub use vote_option::{VoteOptionRow, VoteTrack};
