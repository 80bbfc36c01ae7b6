use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::db::models::{FeedPost, FileType, Post};
use crate::db::posts::{self, NewPost};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::media::{SpooledUpload, UploadOptions};
use crate::state::AppState;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/post",
            post(create_post).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/posts", get(list_posts))
        .route("/post/{id}", delete(delete_post))
}

// --- Handlers ---

/// POST /post — multipart `file` + `caption`
async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<Post>> {
    let mut caption: Option<String> = None;
    let mut upload: Option<SpooledUpload> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "caption" => caption = Some(field.text().await?),
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| AppError::BadRequest("File name is required".into()))?
                    .to_string();
                let content_type = field.content_type().map(str::to_string);

                let mut spooled = SpooledUpload::create(&file_name, content_type)?;
                while let Some(chunk) = field.chunk().await? {
                    spooled.write_chunk(&chunk).await?;
                }
                spooled.finish().await?;
                upload = Some(spooled);
            }
            other => tracing::debug!("Ignoring unexpected form field {:?}", other),
        }
    }

    let upload = upload.ok_or_else(|| AppError::BadRequest("Field 'file' is required".into()))?;
    let caption =
        caption.ok_or_else(|| AppError::BadRequest("Field 'caption' is required".into()))?;

    let options = UploadOptions {
        use_unique_file_name: true,
        tags: state.config.media.tags.clone(),
    };
    let uploaded = state
        .media
        .upload(upload.path(), upload.file_name(), &options)
        .await?;

    let file_type = FileType::detect(upload.content_type(), upload.file_name());
    let post = {
        let conn = state.db.get()?;
        posts::insert(
            &conn,
            &NewPost {
                user_id: user.id(),
                caption: &caption,
                url: &uploaded.url,
                file_type,
                file_name: &uploaded.name,
            },
        )?
    };

    tracing::info!(
        post_id = %post.id,
        user_id = %post.user_id,
        file_type = %post.file_type,
        bytes = upload.len(),
        "Post created"
    );

    // Dropping the spooled upload removes the temp file
    drop(upload);

    Ok(Json(post))
}

/// GET /posts — whole feed, newest first, annotated for the requester
async fn list_posts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<FeedPost>>> {
    let posts = {
        let conn = state.db.get()?;
        posts::list_newest_first(&conn)?
    };

    let feed = posts
        .into_iter()
        .map(|post| FeedPost {
            is_owner: post.user_id == user.user.id,
            user_email: user.user.email.clone(),
            post,
        })
        .collect();

    Ok(Json(feed))
}

/// DELETE /post/{id} — owner only
async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let not_found = || AppError::NotFound("Post not found".into());

    // Ids that are not UUIDs cannot resolve to a post
    let id = uuid::Uuid::parse_str(&id)
        .map_err(|_| not_found())?
        .to_string();

    let conn = state.db.get()?;
    let post = posts::find(&conn, &id)?.ok_or_else(not_found)?;

    if post.user_id != user.user.id {
        return Err(AppError::Forbidden(
            "You do not have permission to delete this post".into(),
        ));
    }

    posts::delete(&conn, &id)?;
    tracing::info!(post_id = %id, user_id = %user.user.id, "Post deleted");

    Ok(Json(json!({ "detail": "Post deleted successfully" })))
}
