pub mod event_handler;
pub mod session;
