use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    models::{Task, TaskInput, TaskUpdate},
    storage::{object_name_for, StorageGateway},
};
use actix_web::{delete, get, post, route, web, HttpResponse, Responder};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use log::warn;
use std::collections::HashMap;
use validator::Validate;

const TASK_COLUMNS: &str = "id, user_id, title, description, completed, file_name, created_at";

/// Decodes the optional attachment carried in a task payload.
///
/// `file_name` and `file_content` must be supplied together; the content is
/// base64-encoded and the object key is derived from the filename's base
/// name. Returns `Ok(None)` when no attachment was supplied.
fn decode_attachment(
    file_name: Option<&str>,
    file_content: Option<&str>,
) -> Result<Option<(String, Bytes)>, AppError> {
    match (file_name, file_content) {
        (None, None) => Ok(None),
        (Some(name), Some(content)) => {
            let object_name = object_name_for(name);
            if object_name.is_empty() {
                return Err(AppError::BadRequest("file name must not be empty".into()));
            }
            let decoded = BASE64
                .decode(content)
                .map_err(|_| AppError::BadRequest("file content must be base64 encoded".into()))?;
            Ok(Some((object_name, Bytes::from(decoded))))
        }
        _ => Err(AppError::BadRequest(
            "file_name and file_content must be supplied together".into(),
        )),
    }
}

/// Announces a task event on the notification queue. Enqueue failures are
/// logged and swallowed; the task record is already committed at this point.
async fn notify_task_event(
    storage: &dyn StorageGateway,
    event: &str,
    task: &Task,
) {
    let mut attributes = HashMap::new();
    attributes.insert("event".to_string(), event.to_string());
    attributes.insert("task_id".to_string(), task.id.to_string());
    if let Some(object_name) = &task.file_name {
        attributes.insert("object".to_string(), object_name.clone());
    }

    let body = format!("task {}: {}", task.id, event);
    if let Err(e) = storage.enqueue_notification(attributes, &body).await {
        warn!("notification enqueue failed for task {}: {}", task.id, e);
    }
}

/// Retrieves a list of tasks for the authenticated user.
///
/// Tasks are returned in storage order. Tasks of other users are never
/// included.
///
/// ## Responses:
/// - `200 OK`: Returns a JSON array of `Task` objects.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
#[get("")]
pub async fn list_tasks(
    pool: web::Data<sqlx::PgPool>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let tasks = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE user_id = $1 ORDER BY id",
        TASK_COLUMNS
    ))
    .bind(user.0)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task for the authenticated user.
///
/// If the payload carries an attachment (`file_name` + base64
/// `file_content`), the object is uploaded to storage BEFORE the task row is
/// written: a failed upload aborts the request and leaves no partial record.
/// After a successful insert a notification is enqueued referencing the task
/// (best effort).
///
/// ## Request Body:
/// A JSON object matching the `TaskInput` struct:
/// - `title`: The title of the task (required, 1-200 characters).
/// - `description` (optional): A description of the task.
/// - `file_name` / `file_content` (optional, paired): attachment to store.
///
/// ## Responses:
/// - `201 Created`: Returns the newly created `Task` object as JSON.
/// - `400 Bad Request`: If validation fails or the attachment pair is incomplete.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `502 Bad Gateway`: If the attachment upload fails.
#[post("")]
pub async fn create_task(
    pool: web::Data<sqlx::PgPool>,
    storage: web::Data<dyn StorageGateway>,
    task_data: web::Json<TaskInput>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    // Validate input
    task_data.validate()?;

    let attachment = decode_attachment(
        task_data.file_name.as_deref(),
        task_data.file_content.as_deref(),
    )?;

    // Upload before inserting the row; a failed upload leaves no record.
    let object_name = match attachment {
        Some((name, content)) => {
            storage.put_object(&name, content).await?;
            Some(name)
        }
        None => None,
    };

    let task = sqlx::query_as::<_, Task>(&format!(
        "INSERT INTO tasks (user_id, title, description, file_name)
         VALUES ($1, $2, $3, $4)
         RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(user.0)
    .bind(&task_data.title)
    .bind(&task_data.description)
    .bind(&object_name)
    .fetch_one(&**pool)
    .await?;

    notify_task_event(storage.as_ref(), "created", &task).await;

    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a specific task by its ID.
///
/// The authenticated user must be the owner of the task; tasks of other
/// users answer `404` rather than revealing their existence.
///
/// ## Responses:
/// - `200 OK`: Returns the `Task` object as JSON if found and owned by the user.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: If the task does not exist or is not owned by the user.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<sqlx::PgPool>,
    task_id: web::Path<i32>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let task = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
        TASK_COLUMNS
    ))
    .bind(task_id.into_inner())
    .bind(user.0)
    .fetch_optional(&**pool)
    .await?;

    match task {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}

/// Updates an existing task (partial update).
///
/// Only the supplied fields are applied; absent fields keep their current
/// value. When a new attachment replaces an old one, the new object is
/// uploaded before the row changes and the replaced object is deleted only
/// afterwards; a failed delete of the old object is logged, not surfaced.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `Task` object as JSON.
/// - `400 Bad Request`: If validation fails or the attachment pair is incomplete.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: If the task does not exist or is not owned by the user.
/// - `502 Bad Gateway`: If the replacement attachment upload fails.
#[route("/{id}", method = "PUT", method = "PATCH")]
pub async fn update_task(
    pool: web::Data<sqlx::PgPool>,
    storage: web::Data<dyn StorageGateway>,
    task_id: web::Path<i32>,
    task_data: web::Json<TaskUpdate>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let id = task_id.into_inner();

    let existing = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
        TASK_COLUMNS
    ))
    .bind(id)
    .bind(user.0)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    let attachment = decode_attachment(
        task_data.file_name.as_deref(),
        task_data.file_content.as_deref(),
    )?;

    let new_object = match attachment {
        Some((name, content)) => {
            storage.put_object(&name, content).await?;
            Some(name)
        }
        None => None,
    };

    let task = sqlx::query_as::<_, Task>(&format!(
        "UPDATE tasks
         SET title = COALESCE($1, title),
             description = COALESCE($2, description),
             completed = COALESCE($3, completed),
             file_name = COALESCE($4, file_name)
         WHERE id = $5 AND user_id = $6
         RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(&task_data.title)
    .bind(&task_data.description)
    .bind(task_data.completed)
    .bind(&new_object)
    .bind(id)
    .bind(user.0)
    .fetch_one(&**pool)
    .await?;

    // The old object is unreferenced once the row points at the new one.
    if let (Some(old), Some(new)) = (&existing.file_name, &new_object) {
        if old != new {
            if let Err(e) = storage.delete_object(old).await {
                warn!("failed to delete replaced object {}: {}", old, e);
            }
        }
    }

    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task by its ID.
///
/// Removes the task row, then requests deletion of the associated stored
/// object if one exists. Object deletion is best effort: a storage failure
/// is logged and the row removal is not rolled back.
///
/// ## Responses:
/// - `204 No Content`: On successful deletion.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: If the task does not exist or is not owned by the user.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<sqlx::PgPool>,
    storage: web::Data<dyn StorageGateway>,
    task_id: web::Path<i32>,
    user: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let id = task_id.into_inner();

    let deleted = sqlx::query_as::<_, (Option<String>,)>(
        "DELETE FROM tasks WHERE id = $1 AND user_id = $2 RETURNING file_name",
    )
    .bind(id)
    .bind(user.0)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Task not found or not owned by user".into()))?;

    if let Some(object_name) = deleted.0 {
        if let Err(e) = storage.delete_object(&object_name).await {
            warn!("failed to delete object {} for task {}: {}", object_name, id, e);
        }
    }

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_attachment_round_trip() {
        let encoded = BASE64.encode(b"hello world");
        let decoded = decode_attachment(Some("/tmp/uploads/notes.txt"), Some(&encoded))
            .unwrap()
            .unwrap();
        assert_eq!(decoded.0, "notes.txt");
        assert_eq!(decoded.1, Bytes::from_static(b"hello world"));
    }

    #[test]
    fn test_decode_attachment_absent() {
        assert!(decode_attachment(None, None).unwrap().is_none());
    }

    #[test]
    fn test_decode_attachment_rejects_incomplete_pair() {
        assert!(decode_attachment(Some("notes.txt"), None).is_err());
        assert!(decode_attachment(None, Some("aGVsbG8=")).is_err());
    }

    #[test]
    fn test_decode_attachment_rejects_bad_base64() {
        let result = decode_attachment(Some("notes.txt"), Some("not base64!!"));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_decode_attachment_rejects_empty_name() {
        let encoded = BASE64.encode(b"content");
        let result = decode_attachment(Some("uploads/"), Some(&encoded));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
