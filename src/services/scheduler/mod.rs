pub mod phase;
pub mod runner;
