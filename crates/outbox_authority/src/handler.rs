//! HTTP routes.
//!
//! | Method | Path          | Success         | Unknown id |
//! |--------|---------------|-----------------|------------|
//! | GET    | `/users`      | 200, all users  |            |
//! | POST   | `/users`      | 201, new user   |            |
//! | PUT    | `/users/{id}` | 200, merged     | 404        |
//! | DELETE | `/users/{id}` | 204             | 404        |
//!
//! Errors answer `{"error": "<message>"}`.

use crate::error::AuthorityError;
use crate::store::{Authority, User};
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use outbox_core::{NewRecord, RecordPatch};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

impl IntoResponse for AuthorityError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        // Unknown and malformed ids both read as a missing user.
        let message = if self.is_not_found() {
            AuthorityError::UserNotFound.to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Builds the router over `authority`.
pub fn router(authority: Arc<Authority>) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", put(update_user).delete(delete_user))
        .with_state(authority)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers(Any),
        )
}

/// Runs a table operation off the async workers; each change rewrites the file.
async fn blocking<T, F>(authority: Arc<Authority>, op: F) -> Result<T, AuthorityError>
where
    T: Send + 'static,
    F: FnOnce(&Authority) -> Result<T, AuthorityError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&authority))
        .await
        .map_err(|e| AuthorityError::Internal(e.to_string()))?
}

async fn list_users(State(authority): State<Arc<Authority>>) -> Json<Vec<User>> {
    Json(authority.list_users())
}

async fn create_user(
    State(authority): State<Arc<Authority>>,
    Json(fields): Json<NewRecord>,
) -> Result<(StatusCode, Json<User>), AuthorityError> {
    if let Some(field) = fields.missing_field() {
        return Err(AuthorityError::InvalidRequest(format!(
            "missing required field: {field}"
        )));
    }
    let user = blocking(authority, move |a| a.create_user(fields)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    State(authority): State<Arc<Authority>>,
    Path(id): Path<String>,
    Json(patch): Json<RecordPatch>,
) -> Result<Json<User>, AuthorityError> {
    let user = blocking(authority, move |a| a.update_user(&id, &patch)).await?;
    Ok(Json(user))
}

async fn delete_user(
    State(authority): State<Arc<Authority>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AuthorityError> {
    blocking(authority, move |a| a.delete_user(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
