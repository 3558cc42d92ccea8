//! Integration Tests Entry Point
//!
//! - `api/` - REST and gateway endpoint tests
//! - `common/` - Shared test utilities

mod api;
mod common;
