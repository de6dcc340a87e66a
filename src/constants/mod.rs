pub mod defaults;
pub mod embeds;
pub mod timeouts;
