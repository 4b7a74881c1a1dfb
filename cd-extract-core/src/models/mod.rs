pub mod config;
pub mod error;
pub mod progress;
pub mod rip_result;
pub mod sector;
pub mod state;
