use crate::{auth::AuthenticatedUserId, error::AppError, storage::StorageGateway};
use actix_web::{get, web, HttpResponse, Responder};
use sqlx::PgPool;

/// Downloads a stored attachment by object name.
///
/// The object name must belong to a task owned by the authenticated user;
/// otherwise the request answers `404`, whether or not the object exists.
/// The object content is returned verbatim as a binary body.
///
/// ## Responses:
/// - `200 OK`: The raw object bytes (`application/octet-stream`).
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: If no owned task references the name, or the object
///   is gone from storage.
#[get("/{name}")]
pub async fn download(
    pool: web::Data<PgPool>,
    storage: web::Data<dyn StorageGateway>,
    name: web::Path<String>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let object_name = name.into_inner();

    let owning_task = sqlx::query_as::<_, (i32,)>(
        "SELECT id FROM tasks WHERE user_id = $1 AND file_name = $2",
    )
    .bind(user.0)
    .bind(&object_name)
    .fetch_optional(&**pool)
    .await?;

    if owning_task.is_none() {
        return Err(AppError::NotFound("no attachment with that name".into()));
    }

    let content = storage.get_object(&object_name).await?;

    Ok(HttpResponse::Ok()
        .content_type("application/octet-stream")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", object_name),
        ))
        .body(content))
}
