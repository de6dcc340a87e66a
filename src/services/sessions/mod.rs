pub mod manager;
pub mod sweeper;
