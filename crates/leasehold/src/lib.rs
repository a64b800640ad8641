pub mod billing;
pub mod config;
pub mod error;
pub mod jobs;
pub mod pagination;
pub mod search;
pub mod telemetry;
pub mod users;
pub mod values;
