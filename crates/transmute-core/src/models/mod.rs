//! Data models for the application
//!
//! File and conversion records as the store reports them, upload payloads and
//! replies, and the health endpoint bodies.

mod conversion;
mod file;
mod health;
pub mod timestamp;
mod upload;

// Re-export all models for convenient imports
pub use conversion::*;
pub use file::*;
pub use health::{parse_not_ready_body, AppInfo, HealthStatus, ReadinessResponse};
pub use upload::*;
