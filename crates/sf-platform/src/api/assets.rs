//! Assets API
//!
//! Image uploads for use in signatures. Files are validated by content, stored
//! under a generated name and served from `/uploads`.

use axum::{
    routing::get,
    extract::{DefaultBodyLimit, State, Path},
    http::StatusCode,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

use crate::api::common::{MultipartBody, SuccessResponse};
use crate::api::middleware::Authenticated;
use crate::domain::Asset;
use crate::error::PlatformError;
use crate::repository::AssetRepository;
use crate::service::{ActivityService, AssetStorage};

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
const MAX_FILENAME_CHARS: usize = 255;

/// Asset response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetResponse {
    pub id: String,
    pub tenant_id: String,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    /// Public path of the stored file
    pub url: String,
    pub uploaded_by: Option<String>,
    pub created_at: String,
}

impl From<Asset> for AssetResponse {
    fn from(a: Asset) -> Self {
        Self {
            id: a.id,
            tenant_id: a.tenant_id,
            filename: a.filename,
            mime_type: a.mime_type,
            size: a.size,
            url: a.url,
            uploaded_by: a.uploaded_by,
            created_at: a.created_at.to_rfc3339(),
        }
    }
}

/// Multipart upload form, for the OpenAPI document
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// PNG, JPEG, GIF or WebP image
    #[schema(value_type = String)]
    file: Vec<u8>,
}

#[derive(Clone)]
pub struct AssetsState {
    pub asset_repo: Arc<AssetRepository>,
    pub storage: Arc<AssetStorage>,
    pub activity: ActivityService,
}

/// Keep only the final path component of a client-supplied filename
fn display_filename(raw: Option<&str>) -> String {
    let name = raw
        .and_then(|n| n.rsplit(['/', '\\']).next())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("upload");
    name.chars().take(MAX_FILENAME_CHARS).collect()
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> PlatformError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PlatformError::validation("File exceeds the maximum upload size")
    } else {
        PlatformError::validation(format!("Invalid multipart body: {}", err.body_text()))
    }
}

/// List assets
#[utoipa::path(
    get,
    path = "/api/assets",
    tag = "assets",
    responses((status = 200, description = "Assets, newest first", body = Vec<AssetResponse>)),
    security(("bearer_auth" = []))
)]
pub async fn list_assets(
    State(state): State<AssetsState>,
    auth: Authenticated,
) -> Result<Json<Vec<AssetResponse>>, PlatformError> {
    let assets = state.asset_repo.list(&auth.0.scope()).await?;
    Ok(Json(assets.into_iter().map(AssetResponse::from).collect()))
}

/// Upload an asset
///
/// Expects a multipart form with a `file` field. The type is detected from
/// the file content; the filename and declared content type are ignored.
#[utoipa::path(
    post,
    path = "/api/assets",
    tag = "assets",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Asset stored", body = AssetResponse),
        (status = 400, description = "Missing file, unsupported type or too large", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_asset(
    State(state): State<AssetsState>,
    auth: Authenticated,
    MultipartBody(mut multipart): MultipartBody,
) -> Result<Json<AssetResponse>, PlatformError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = display_filename(field.file_name());
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| PlatformError::validation("Multipart field 'file' is required"))?;

    let stored = state.storage.save(&bytes).await?;
    let asset = Asset::new(
        &auth.0.tenant_id,
        filename,
        stored.mime_type,
        stored.size as i64,
        &stored.stored_name,
        &auth.0.user_id,
    );

    if let Err(e) = state.asset_repo.insert(&auth.0.scope(), &asset).await {
        if let Err(cleanup) = state.storage.remove(&stored.stored_name).await {
            warn!(stored_name = %stored.stored_name, error = %cleanup, "Failed to remove orphaned upload");
        }
        return Err(e);
    }

    state.activity.log_upload(&auth.0, &asset.id, &asset.filename).await;
    Ok(Json(asset.into()))
}

/// Get an asset
#[utoipa::path(
    get,
    path = "/api/assets/{id}",
    tag = "assets",
    params(("id" = String, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset", body = AssetResponse),
        (status = 403, description = "Asset of another tenant", body = crate::api::ApiError),
        (status = 404, description = "Not found", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_asset(
    State(state): State<AssetsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<AssetResponse>, PlatformError> {
    let asset = state.asset_repo.get(&auth.0.scope(), &id).await?;
    Ok(Json(asset.into()))
}

/// Delete an asset and its stored file
#[utoipa::path(
    delete,
    path = "/api/assets/{id}",
    tag = "assets",
    params(("id" = String, Path, description = "Asset ID")),
    responses(
        (status = 200, description = "Asset deleted", body = SuccessResponse),
        (status = 403, description = "Asset of another tenant", body = crate::api::ApiError),
        (status = 404, description = "Not found", body = crate::api::ApiError)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_asset(
    State(state): State<AssetsState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, PlatformError> {
    let scope = auth.0.scope();
    let asset = state.asset_repo.get(&scope, &id).await?;
    if !state.asset_repo.delete(&scope, &id).await? {
        return Err(PlatformError::not_found("Asset", &id));
    }
    // The row is gone; a leftover file is only logged
    if let Err(e) = state.storage.remove(&asset.stored_name).await {
        warn!(stored_name = %asset.stored_name, error = %e, "Failed to remove stored file");
    }

    state
        .activity
        .log_delete(&auth.0, "Asset", &id, format!("Deleted '{}'", asset.filename))
        .await;

    Ok(Json(SuccessResponse::ok()))
}

/// Create assets router
pub fn assets_router(state: AssetsState) -> Router {
    let body_limit = state.storage.max_bytes() + MULTIPART_OVERHEAD_BYTES;
    Router::new()
        .route("/", get(list_assets).post(upload_asset))
        .route("/:id", get(get_asset).delete(delete_asset))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_filename() {
        assert_eq!(display_filename(Some("logo.png")), "logo.png");
        assert_eq!(display_filename(Some("../../etc/passwd")), "passwd");
        assert_eq!(display_filename(Some("C:\\Users\\me\\logo.gif")), "logo.gif");
        assert_eq!(display_filename(Some("  ")), "upload");
        assert_eq!(display_filename(None), "upload");
        assert_eq!(display_filename(Some(&"a".repeat(300))).len(), MAX_FILENAME_CHARS);
    }
}
