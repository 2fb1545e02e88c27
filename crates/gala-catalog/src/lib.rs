//! Gala Catalog Library
//!
//! Postgres repositories for the event/media catalog and the job queue
//! tables. The processing pipeline is the only writer of media status and
//! derived keys; everything else reads.

pub mod events;
pub mod jobs;
pub mod media;

pub use events::EventRepository;
pub use jobs::JobRepository;
pub use media::{MediaListFilter, MediaRepository};
