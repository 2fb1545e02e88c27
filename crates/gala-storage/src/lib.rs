//! Gala Storage Library
//!
//! Storage abstraction and backends for original uploads and derived media
//! artifacts.
//!
//! # Storage key format
//!
//! All objects for an event live under one prefix:
//!
//! `events/{event_id}/{variant}/{media_id}.{ext}`
//!
//! where `variant` is `originals`, `large`, `thumb`, `playback`, or `poster`.
//! Key generation is centralized in the `keys` module so every caller stays
//! consistent.

pub mod factory;
pub mod keys;
pub mod local;
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use gala_core::StorageBackend;
pub use local::LocalStorage;
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
