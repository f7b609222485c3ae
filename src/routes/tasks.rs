use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{Task, TaskInput, TaskUpdate},
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

const TASK_COLUMNS: &str = "id, title, description, completed, user_id, created_at, updated_at";

/// Retrieves all tasks owned by the authenticated user.
///
/// Tasks are ordered by creation date, newest first.
///
/// ## Responses:
/// - `200 OK`: Returns `{count, tasks}`.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `500 Internal Server Error`: For database errors.
#[get("")]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let tasks = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE user_id = $1 ORDER BY created_at DESC",
        TASK_COLUMNS
    ))
    .bind(user.id)
    .fetch_all(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "count": tasks.len(),
        "tasks": tasks
    })))
}

/// Creates a new task owned by the authenticated user.
///
/// ## Request Body:
/// A JSON object matching `TaskInput`:
/// - `title`: The title of the task (required, 3 to 100 characters).
/// - `description` (optional): A description of up to 500 characters.
///
/// ## Responses:
/// - `201 Created`: Returns `{message, task}` with the newly created task.
/// - `400 Bad Request`: If validation on `TaskInput` fails.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `500 Internal Server Error`: For database errors.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = Task::new(task_data.into_inner(), user.id);

    let result = sqlx::query_as::<_, Task>(&format!(
        "INSERT INTO tasks (id, title, description, user_id)
         VALUES ($1, $2, $3, $4)
         RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(task.id)
    .bind(task.title)
    .bind(task.description)
    .bind(task.user_id)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Task created successfully",
        "task": result
    })))
}

/// Retrieves a single task by its ID.
///
/// The ownership filter is part of the query, so a task belonging to
/// another user is indistinguishable from one that does not exist.
///
/// ## Responses:
/// - `200 OK`: Returns `{task}`.
/// - `400 Bad Request`: If the id is not a valid UUID.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: If no task with this id is owned by the caller.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
        TASK_COLUMNS
    ))
    .bind(task_id.into_inner())
    .bind(user.id)
    .fetch_optional(&**pool)
    .await?;

    match task {
        Some(task) => Ok(HttpResponse::Ok().json(json!({ "task": task }))),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}

/// Updates a task owned by the authenticated user.
///
/// All fields are optional; omitted fields keep their current value. The
/// `completed` flag toggles freely.
///
/// ## Request Body:
/// A JSON object matching `TaskUpdate`: `title`, `description`, `completed`.
///
/// ## Responses:
/// - `200 OK`: Returns `{message, task}` with the updated task.
/// - `400 Bad Request`: If validation on `TaskUpdate` fails or the id is malformed.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: If no task with this id is owned by the caller.
#[put("/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskUpdate>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let update = task_data.into_inner();

    let task = sqlx::query_as::<_, Task>(&format!(
        "UPDATE tasks
         SET title = COALESCE($1, title),
             description = COALESCE($2, description),
             completed = COALESCE($3, completed),
             updated_at = NOW()
         WHERE id = $4 AND user_id = $5
         RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(update.title)
    .bind(update.description)
    .bind(update.completed)
    .bind(task_id.into_inner())
    .bind(user.id)
    .fetch_optional(&**pool)
    .await?;

    match task {
        Some(task) => Ok(HttpResponse::Ok().json(json!({
            "message": "Task updated successfully",
            "task": task
        }))),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}

/// Deletes a task owned by the authenticated user.
///
/// ## Responses:
/// - `200 OK`: Returns `{message}`.
/// - `400 Bad Request`: If the id is not a valid UUID.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: If no task with this id is owned by the caller.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    user: CurrentUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
        .bind(task_id.into_inner())
        .bind(user.id)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Task not found".into()));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Task deleted successfully"
    })))
}

/// Deletes every task owned by the authenticated user.
///
/// ## Responses:
/// - `200 OK`: Returns `{message, count}` where `count` is the number of
///   tasks actually removed.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
#[delete("")]
pub async fn delete_all_tasks(
    pool: web::Data<PgPool>,
    user: CurrentUser,
) -> Result<impl Responder, AppError> {
    let result = sqlx::query("DELETE FROM tasks WHERE user_id = $1")
        .bind(user.id)
        .execute(&**pool)
        .await?;

    let count = result.rows_affected();

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("{} tasks deleted", count),
        "count": count
    })))
}
