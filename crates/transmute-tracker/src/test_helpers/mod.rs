//! Test helpers for tracker tests
//!
//! Provides an in-memory conversion store that implements `ConversionApi`
//! without any network, plus gates for holding individual calls open so
//! interleavings can be driven deterministically.

pub mod memory_api;

pub use memory_api::{ApiCall, Gate, MemoryConversionApi};
