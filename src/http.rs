/*
 *  http.rs
 *
 *  picframe - slideshow picture frame
 *  (c) 2020-26 Stuart Hunter
 *
 *  HTTP surface - thin axum handlers over the frame facade
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Local};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::Path;
use tower_http::services::ServeDir;

use crate::display_state::Selection;
use crate::error::FrameError;
use crate::frame::PictureFrame;

/// Errors surfaced to HTTP callers.
#[derive(Debug)]
pub enum ApiError {
    Frame(FrameError),
    BadRequest(String),
    Internal(String),
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Frame(e) => write!(f, "{}", e),
            ApiError::BadRequest(msg) => write!(f, "{}", msg),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<FrameError> for ApiError {
    fn from(err: FrameError) -> Self {
        ApiError::Frame(err)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Frame(FrameError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Frame(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Frame(e) if e.is_render_error() => StatusCode::BAD_GATEWAY,
            ApiError::Frame(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    name: Option<String>,
}

impl NameQuery {
    fn required(self) -> Result<String, ApiError> {
        self.name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::BadRequest("Missing file name".into()))
    }
}

#[derive(Debug, Serialize)]
pub struct FrameStateView {
    pub current: Option<Selection>,
    pub last_rotation: Option<DateTime<Local>>,
    pub rendering: bool,
    pub pictures: usize,
}

/// Build the router: API endpoints plus static files from `static_dir`.
pub fn router(frame: PictureFrame, static_dir: &Path, upload_limit_bytes: usize) -> Router {
    Router::new()
        .route("/list-pictures", get(list_pictures))
        .route("/upload-picture", post(upload_picture))
        .route("/delete-picture", delete(delete_picture))
        .route("/display-picture", get(display_picture))
        .route("/state", get(frame_state))
        .layer(DefaultBodyLimit::max(upload_limit_bytes))
        .with_state(frame)
        .fallback_service(ServeDir::new(static_dir))
}

async fn list_pictures(State(frame): State<PictureFrame>) -> Result<Json<Vec<String>>, ApiError> {
    let snapshot = tokio::task::spawn_blocking(move || frame.list()).await??;
    Ok(Json(snapshot.as_ref().clone()))
}

async fn upload_picture(
    State(frame): State<PictureFrame>,
    mut multipart: Multipart,
) -> Result<String, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Error parsing form: {}", e)))?
    {
        if field.name() != Some("picture") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_owned)
            .ok_or_else(|| ApiError::BadRequest("Error retrieving file".into()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Error reading file: {}", e)))?;

        let stored = tokio::task::spawn_blocking(move || frame.ingest(&data, &file_name)).await??;
        return Ok(format!("Upload and aspect-ratio padding successful: {}", stored));
    }
    Err(ApiError::BadRequest("Error retrieving file".into()))
}

async fn delete_picture(
    State(frame): State<PictureFrame>,
    Query(query): Query<NameQuery>,
) -> Result<&'static str, ApiError> {
    let name = query.required()?;
    tokio::task::spawn_blocking(move || frame.remove(&name)).await??;
    Ok("Delete successful")
}

async fn display_picture(
    State(frame): State<PictureFrame>,
    Query(query): Query<NameQuery>,
) -> Result<&'static str, ApiError> {
    let name = query.required()?;
    frame.display_now(&name).await?;
    Ok("Display successful")
}

async fn frame_state(State(frame): State<PictureFrame>) -> Json<FrameStateView> {
    Json(FrameStateView {
        current: frame.current(),
        last_rotation: frame.state().last_rotation(),
        rendering: frame.gateway().is_busy(),
        pictures: frame.catalog().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let s = |e: ApiError| e.status();
        assert_eq!(s(FrameError::NotFound("a".into()).into()), StatusCode::NOT_FOUND);
        assert_eq!(s(FrameError::EmptyCatalog.into()), StatusCode::BAD_REQUEST);
        assert_eq!(s(FrameError::InvalidName("..".into()).into()), StatusCode::BAD_REQUEST);
        assert_eq!(s(FrameError::RenderUnavailable("x".into()).into()), StatusCode::BAD_GATEWAY);
        assert_eq!(
            s(FrameError::Store(std::io::Error::other("disk full")).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(s(ApiError::BadRequest("Missing file name".into())), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_name_query_required() {
        assert_eq!(NameQuery { name: Some("a.png".into()) }.required().unwrap(), "a.png");
        assert!(NameQuery { name: Some(String::new()) }.required().is_err());
        assert!(NameQuery { name: None }.required().is_err());
    }
}
