pub mod event;
pub mod server_config;
