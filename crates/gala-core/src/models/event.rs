//! Event model: the gallery a guest uploads into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An event, addressed by guests through its short join code.
///
/// Upload ceilings are optional; `None` means unlimited. `approval_required`
/// only sets the default of `approved` on new media records; the processing
/// pipeline itself never touches moderation state.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub approval_required: bool,
    pub max_uploads_total: Option<i32>,
    pub max_uploads_per_guest: Option<i32>,
    pub created_at: DateTime<Utc>,
}
