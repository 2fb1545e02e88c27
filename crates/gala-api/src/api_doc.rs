//! OpenAPI document assembly.

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers::gallery::{GalleryResponse, MediaItemResponse};
use crate::handlers::upload_complete::{CompleteUploadRequest, CompleteUploadResponse};
use crate::handlers::upload_intent::{UploadIntentRequest, UploadIntentResponse};
use gala_core::models::{MediaStatus, MediaType};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::upload_intent::create_upload_intent,
        crate::handlers::upload_complete::complete_upload,
        crate::handlers::gallery::list_event_media,
        crate::handlers::health::health,
    ),
    components(schemas(
        UploadIntentRequest,
        UploadIntentResponse,
        CompleteUploadRequest,
        CompleteUploadResponse,
        GalleryResponse,
        MediaItemResponse,
        MediaType,
        MediaStatus,
        ErrorResponse,
    )),
    tags(
        (name = "uploads", description = "Upload intent and completion"),
        (name = "events", description = "Event gallery"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
