//! A sandboxed, persistent key-value store for client-side state such as the
//! auth token.
//!
//! # Core Features
//!
//! - **Key Validation**: keys are restricted to `[A-Za-z0-9._-]`, so a key always
//!   names a single file directly under the root.
//! - **Atomic Writes**: unique temp write + `fsync` + `rename` + directory sync.
//! - **Self-Healing**: orphaned temp files are cleaned up when the store opens.
//!
//! # Examples
//!
//! ```rust
//! use bazaar_storage::{Storage, StorageError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     # let root = tmp.path().join("data");
//!     let storage = Storage::builder().root(&root).connect().await?;
//!
//!     storage.set("token", "abc123").await?;
//!     storage.set("last_conversation", "c-9").await?;
//!
//!     assert_eq!(storage.keys().await?, vec!["last_conversation", "token"]);
//!     Ok(())
//! }
//! ```

mod builder;
mod engine;
mod error;
mod maintenance;
mod security;

pub use builder::StorageBuilder;
pub use engine::Storage;
pub use error::{StorageError, StorageErrorExt};
