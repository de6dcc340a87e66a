pub mod announcements;
pub mod builder;
pub mod model;
