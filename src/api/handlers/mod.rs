//! API request handlers.
//!
//! This module contains all HTTP request handlers organized by functionality.

/// Question answering handler.
pub mod chat;
/// History lookup and deletion handlers.
pub mod history;
/// Welcome, health, info, model and smoke-test handlers.
pub mod system;
