//! Thumbnail API handlers.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thumbcache_common::{Error, ThumbnailRecord, ThumbnailResult};

use super::error::AppError;
use crate::context::AppContext;
use crate::writeback::QueueStats;

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/thumbnail", get(get_thumbnail))
        .route("/thumbnails", post(list_thumbnails))
        .route("/queue", get(queue_stats))
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ThumbnailQuery {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListRequest {
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub thumbnails: Vec<ThumbnailEntry>,
}

/// One response entry: `{"thumbnail": {..}}` or `{"error": {..}}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailEntry {
    Thumbnail(ThumbnailBody),
    Error(ErrorBody),
}

#[derive(Debug, Serialize)]
pub struct ThumbnailBody {
    pub id: String,
    pub url: String,
    pub channel_title: String,
    pub title: String,
    pub width: i32,
    pub height: i32,
    /// Base64 image bytes.
    pub file: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// The identifier, or the raw locator when it was unusable.
    pub url: String,
    pub message: String,
}

impl From<&ThumbnailRecord> for ThumbnailBody {
    fn from(record: &ThumbnailRecord) -> Self {
        let meta = &record.metadata;
        Self {
            id: meta.id.to_string(),
            url: meta.source_url.clone(),
            channel_title: meta.channel_title.clone(),
            title: meta.title.clone(),
            width: meta.width,
            height: meta.height,
            file: STANDARD.encode(&record.image),
        }
    }
}

impl From<&ThumbnailResult> for ThumbnailEntry {
    fn from(result: &ThumbnailResult) -> Self {
        match result {
            ThumbnailResult::Success(record) => Self::Thumbnail(record.into()),
            ThumbnailResult::Failure(failure) => Self::Error(ErrorBody {
                url: failure.key.clone(),
                message: failure.kind.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_thumbnail(
    State(ctx): State<AppContext>,
    Query(query): Query<ThumbnailQuery>,
) -> Result<Json<ThumbnailEntry>, AppError> {
    let url = query
        .url
        .ok_or_else(|| Error::invalid_input("missing `url` query parameter"))?;
    let result = ctx.orchestrator.resolve_one(&url).await;
    Ok(Json((&result).into()))
}

async fn list_thumbnails(
    State(ctx): State<AppContext>,
    Json(request): Json<ListRequest>,
) -> Result<Json<ListResponse>, AppError> {
    let results = ctx.orchestrator.resolve_batch(&request.urls).await?;
    Ok(Json(ListResponse {
        thumbnails: results.iter().map(ThumbnailEntry::from).collect(),
    }))
}

async fn queue_stats(State(ctx): State<AppContext>) -> Json<QueueStats> {
    Json(ctx.writeback.stats())
}
