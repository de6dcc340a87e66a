pub mod events;
pub mod help;
pub mod setup;
