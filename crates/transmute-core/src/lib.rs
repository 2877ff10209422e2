//! Transmute Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration and the
//! `ConversionApi` seam shared by every Transmute client component.

pub mod api;
pub mod config;
pub mod error;
pub mod filename;
pub mod models;

// Re-export commonly used types
pub use api::ConversionApi;
pub use config::ClientConfig;
pub use error::{ClientError, ErrorMetadata, LogLevel};
pub use filename::derive_download_filename;
