//! Profile picture upload and the public redirect to the stored image.

use axum::{
    extract::{Extension, Multipart, Path},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::handlers::auth::principal::require_auth;
use crate::api::media::MediaStore;

use super::storage::{get_by_employee_id, replace_picture_url};
use super::types::PictureResponse;

/// Upload cap for profile pictures.
pub(crate) const MAX_PICTURE_BYTES: usize = 5 * 1024 * 1024;

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Pull the image out of the multipart body.
///
/// The first file field wins; its content type decides the stored
/// extension.
async fn read_image_field(
    multipart: &mut Multipart,
) -> Result<(&'static str, Vec<u8>), ApiError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("Malformed multipart body"))?;
    let Some(field) = field else {
        return Err(ApiError::Validation("An image file is required"));
    };

    let Some(extension) = field.content_type().and_then(extension_for) else {
        return Err(ApiError::Validation(
            "Only JPEG, PNG, or GIF images are accepted",
        ));
    };

    let bytes = field
        .bytes()
        .await
        .map_err(|_| ApiError::Validation("Image exceeds the 5MB limit"))?;
    if bytes.is_empty() {
        return Err(ApiError::Validation("An image file is required"));
    }
    if bytes.len() > MAX_PICTURE_BYTES {
        return Err(ApiError::Validation("Image exceeds the 5MB limit"));
    }

    Ok((extension, bytes.to_vec()))
}

#[utoipa::path(
    post,
    path = "/v1/employees/{id}/picture",
    params(
        ("id" = String, Path, description = "External employee id, e.g. EM-000123")
    ),
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Picture stored; new reference returned.", body = PictureResponse),
        (status = 400, description = "Missing, oversized, or non-image upload."),
        (status = 401, description = "Missing or invalid session credential."),
        (status = 404, description = "Unknown or soft-deleted employee.")
    ),
    tag = "employees"
)]
pub async fn upload(
    headers: HeaderMap,
    Path(id): Path<String>,
    pool: Extension<PgPool>,
    media: Extension<Arc<MediaStore>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    require_auth(&headers, &pool).await?;

    let id = id.trim();
    if get_by_employee_id(&pool, id).await?.is_none() {
        return Err(ApiError::NotFound("Employee not found"));
    }

    let (extension, bytes) = read_image_field(&mut multipart).await?;
    let content_type = match extension {
        "jpg" => "image/jpeg",
        "png" => "image/png",
        _ => "image/gif",
    };

    let key = format!("avatars/{id}/{}.{extension}", Uuid::new_v4());
    let picture_url = media
        .upload(&key, content_type, bytes)
        .await
        .map_err(ApiError::Upstream)?;

    let Some(previous) = replace_picture_url(&pool, id, &picture_url).await? else {
        // The employee vanished while the upload was in flight; reclaim the
        // orphaned object.
        if let Err(err) = media.delete(&picture_url).await {
            warn!("Failed to delete orphaned picture {picture_url}: {err}");
        }
        return Err(ApiError::NotFound("Employee not found"));
    };

    // The placeholder is shared by every new record and never deleted;
    // foreign URLs are refused by the store itself.
    if previous != picture_url && previous != super::DEFAULT_AVATAR_URL && media.owns(&previous) {
        if let Err(err) = media.delete(&previous).await {
            warn!("Failed to delete previous picture {previous}: {err}");
        }
    }

    let body = PictureResponse { picture_url };
    Ok((StatusCode::OK, Json(body)).into_response())
}

#[utoipa::path(
    get,
    path = "/v1/employees/{id}/picture",
    params(
        ("id" = String, Path, description = "External employee id, e.g. EM-000123")
    ),
    responses(
        (status = 307, description = "Redirect to the stored picture URL."),
        (status = 404, description = "Unknown or soft-deleted employee.")
    ),
    tag = "employees"
)]
pub async fn redirect(
    Path(id): Path<String>,
    pool: Extension<PgPool>,
) -> Result<Response, ApiError> {
    // Public on purpose: this is the target for <img> tags in the frontend.
    let Some(record) = get_by_employee_id(&pool, id.trim()).await? else {
        return Err(ApiError::NotFound("Employee not found"));
    };
    Ok(Redirect::temporary(&record.picture_url).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[test]
    fn extension_only_for_supported_images() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("image/gif"), Some("gif"));
        assert_eq!(extension_for("image/svg+xml"), None);
        assert_eq!(extension_for("application/pdf"), None);
        assert_eq!(extension_for("text/html"), None);
    }

    #[tokio::test]
    async fn redirect_surfaces_database_failure_as_error() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://postgres@localhost/postgres")
            .expect("lazy pool");
        // Lazy pool with nothing listening: the lookup fails and must come
        // back as an error response, never a panic.
        let result = redirect(Path("EM-000000".to_string()), Extension(pool)).await;
        assert!(result.is_err());
    }
}
