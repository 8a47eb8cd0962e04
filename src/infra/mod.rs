//! Infrastructure layer for cross-cutting concerns.
//!
//! Provides foundational infrastructure including:
//! - Configuration management and validation
//! - Error handling and result types
//! - Output path allocation for signed artifacts

pub mod config;
pub mod error;
pub mod output;
