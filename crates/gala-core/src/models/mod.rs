pub mod event;
pub mod job;
pub mod media;

pub use event::Event;
pub use job::{Job, JobPayload, JobStatus, JobType, ProcessMediaPayload};
pub use media::{MediaRecord, MediaStatus, MediaType};
