/// Post handlers - HTTP endpoints over `PostService`
use super::{respond, ApiResponse};
use crate::error::{AppError, Result};
use crate::media::{requested_kind, Attachment, TempFile, UploadLimits};
use crate::middleware::{GatewayAuth, UserId};
use crate::services::PostService;
use actix_multipart::{Field, Multipart};
use actix_web::{http::StatusCode, web, HttpResponse};
use futures::StreamExt;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Upper bound on the `caption` form part
pub const MAX_CAPTION_BYTES: usize = 8 * 1024;

/// Register post routes under the caller's scope
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/posts")
            .wrap(GatewayAuth)
            .service(
                web::resource("")
                    .route(web::get().to(list_posts))
                    .route(web::post().to(create_post)),
            )
            .route("/user/{user_id}", web::get().to(list_user_posts))
            .service(
                web::resource("/{post_id}")
                    .route(web::get().to(get_post))
                    .route(web::delete().to(delete_post)),
            )
            .route("/{post_id}/like", web::post().to(like_post))
            .route("/{post_id}/dislike", web::post().to(dislike_post))
            .route("/{post_id}/bookmark", web::post().to(toggle_bookmark))
            .service(
                web::resource("/{post_id}/comments")
                    .route(web::get().to(list_comments))
                    .route(web::post().to(add_comment)),
            ),
    );
}

/// Create a post from a multipart form with an optional `caption` text part
/// and an optional `media` file part
pub async fn create_post(
    service: web::Data<PostService>,
    user_id: UserId,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let mut caption: Option<String> = None;
    let mut attachment: Option<Attachment> = None;

    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| AppError::Validation(format!("invalid form data: {}", e)))?;
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "caption" => {
                let raw = read_text(&mut field, MAX_CAPTION_BYTES).await?;
                caption = Some(raw);
            }
            "media" => {
                if attachment.is_some() {
                    return Err(AppError::Validation(
                        "a post carries at most one media attachment".to_string(),
                    ));
                }
                attachment = Some(stage_attachment(service.upload_limits(), &mut field).await?);
            }
            _ => {
                while field.next().await.is_some() {}
            }
        }
    }

    let post = service.create_post(user_id.0, caption, attachment).await?;
    Ok(respond(
        StatusCode::CREATED,
        ApiResponse::ok("Post created successfully", post),
    ))
}

async fn read_text(field: &mut Field, max_bytes: usize) -> Result<String> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::Validation(format!("invalid form data: {}", e)))?;
        if buf.len() + chunk.len() > max_bytes {
            return Err(AppError::Validation(format!(
                "caption exceeds {} bytes",
                max_bytes
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8(buf).map_err(|_| AppError::Validation("caption must be UTF-8".to_string()))
}

/// Stream a file part to a staging file owned by a `TempFile` guard.
///
/// The MIME type is checked before anything is written and the size limit is
/// enforced per chunk; the guard removes a partially written file on rejection.
async fn stage_attachment(limits: &UploadLimits, field: &mut Field) -> Result<Attachment> {
    let mime_type = field
        .content_type()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    if requested_kind(&mime_type).is_none() {
        return Err(AppError::UnsupportedMediaType(mime_type));
    }

    let (guard, mut file) = TempFile::create_in(&limits.staging_dir)
        .await
        .map_err(|e| AppError::Internal(format!("failed to stage upload: {}", e)))?;

    let mut size: u64 = 0;
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::Validation(format!("invalid form data: {}", e)))?;
        size += chunk.len() as u64;
        if size > limits.max_upload_bytes {
            tracing::debug!(size, limit = limits.max_upload_bytes, "multipart media part over limit");
            return Err(AppError::Validation(format!(
                "media attachment exceeds {} bytes",
                limits.max_upload_bytes
            )));
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| AppError::Internal(format!("failed to stage upload: {}", e)))?;
    }
    file.flush()
        .await
        .map_err(|e| AppError::Internal(format!("failed to stage upload: {}", e)))?;

    Ok(Attachment::from_file(mime_type, size, guard))
}

pub async fn list_posts(service: web::Data<PostService>) -> Result<HttpResponse> {
    let posts = service.list_all_posts().await?;
    Ok(respond(StatusCode::OK, ApiResponse::ok("Posts fetched", posts)))
}

pub async fn list_user_posts(
    service: web::Data<PostService>,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let posts = service.list_user_posts(*user_id).await?;
    Ok(respond(StatusCode::OK, ApiResponse::ok("Posts fetched", posts)))
}

pub async fn get_post(
    service: web::Data<PostService>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = service.get_post(*post_id).await?;
    Ok(respond(StatusCode::OK, ApiResponse::ok("Post fetched", post)))
}

pub async fn delete_post(
    service: web::Data<PostService>,
    post_id: web::Path<Uuid>,
    user_id: UserId,
) -> Result<HttpResponse> {
    service.delete_post(*post_id, user_id.0).await?;
    Ok(respond(
        StatusCode::OK,
        ApiResponse::confirm("Post deleted successfully"),
    ))
}

pub async fn like_post(
    service: web::Data<PostService>,
    post_id: web::Path<Uuid>,
    user_id: UserId,
) -> Result<HttpResponse> {
    service.like_post(*post_id, user_id.0).await?;
    Ok(respond(StatusCode::OK, ApiResponse::confirm("Post liked")))
}

pub async fn dislike_post(
    service: web::Data<PostService>,
    post_id: web::Path<Uuid>,
    user_id: UserId,
) -> Result<HttpResponse> {
    service.dislike_post(*post_id, user_id.0).await?;
    Ok(respond(StatusCode::OK, ApiResponse::confirm("Post disliked")))
}

pub async fn toggle_bookmark(
    service: web::Data<PostService>,
    post_id: web::Path<Uuid>,
    user_id: UserId,
) -> Result<HttpResponse> {
    let state = service.toggle_bookmark(*post_id, user_id.0).await?;
    Ok(respond(StatusCode::OK, ApiResponse::ok(state.message(), state)))
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub text: String,
}

pub async fn add_comment(
    service: web::Data<PostService>,
    post_id: web::Path<Uuid>,
    user_id: UserId,
    req: web::Json<AddCommentRequest>,
) -> Result<HttpResponse> {
    let comment = service.add_comment(*post_id, user_id.0, &req.text).await?;
    Ok(respond(
        StatusCode::CREATED,
        ApiResponse::ok("Comment added", comment),
    ))
}

pub async fn list_comments(
    service: web::Data<PostService>,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let comments = service.list_comments(*post_id).await?;
    Ok(respond(
        StatusCode::OK,
        ApiResponse::ok("Comments fetched", comments),
    ))
}
