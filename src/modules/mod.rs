//! Modules layer - Infrastructure components for external integrations
//!
//! Contains clients and adapters for external services such as blob storage.

pub mod storage;
