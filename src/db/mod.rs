//! Chat history storage.
//!
//! This module provides the [`ChatStore`] abstraction and its backends:
//! - **MongoDB** (`mongodb` feature, default): one document per turn
//! - **Turso/SQLite** via libsql: in-memory, local file or remote Turso

#![allow(missing_docs)]

#[cfg(feature = "mongodb")]
pub mod mongo;
pub mod traits;
pub mod turso;

#[cfg(feature = "mongodb")]
pub use mongo::MongoChatStore;
pub use traits::{ChatStore, DatabaseProvider};
pub use turso::TursoClient;
