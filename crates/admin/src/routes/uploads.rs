//! Product and banner image uploads.
//!
//! Images are stored inline as `data:` URLs; there is no object store.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
};
use tracing::instrument;

use mistore_core::api::ApiResponse;

use crate::error::{self, created};
use crate::middleware::RequireAdmin;
use crate::services::upload::{EncodedImage, UploadError, encode_image};
use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 16 * 1024;

const FILE_FIELD: &str = "file";

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new().route(
        "/uploads",
        post(upload).layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        )),
    )
}

/// Accept one image in the `file` field.
#[instrument(skip(state, admin, multipart), fields(admin_id = %admin.id))]
async fn upload(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    mut multipart: Multipart,
) -> error::Result<(StatusCode, Json<ApiResponse<EncodedImage>>)> {
    let limit = state.config().max_upload_bytes;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let data = field.bytes().await?;
        let image = encode_image(&data, limit)?;
        tracing::info!(mime = image.mime, bytes = image.bytes, "Image uploaded");
        return created(image);
    }

    Err(UploadError::Missing.into())
}
