pub mod gallery;
pub mod health;
pub mod upload_complete;
pub mod upload_intent;
