use std::collections::BTreeSet;
use std::fmt::Display;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::config::AppConfig;
use crate::ingest::types::{FeedFetcher, FeedSource, NormalizedItem};
use crate::ingest::{self, snapshot, IngestReport};
use crate::query::{FilterParams, FilterState, Stats};
use crate::session::Session;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<Session>>,
    pub fetcher: Arc<dyn FeedFetcher>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(session: Session, fetcher: Arc<dyn FeedFetcher>, config: AppConfig) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            fetcher,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/items", get(items))
        .route("/filters", post(set_filters))
        .route("/stats", get(stats))
        .route("/sources", get(sources))
        .route("/favorites", get(favorites))
        .route("/favorites/{id}", post(toggle_favorite))
        .route("/reload", post(reload))
        .route("/live", post(live))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/* ----------------------------
Errors
---------------------------- */

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(e: impl Display) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: format!("{e:#}"),
        }
    }

    fn internal(e: impl Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{e:#}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

fn read(state: &AppState) -> Result<RwLockReadGuard<'_, Session>, ApiError> {
    state
        .session
        .read()
        .map_err(|_| ApiError::internal("session lock poisoned"))
}

fn write(state: &AppState) -> Result<RwLockWriteGuard<'_, Session>, ApiError> {
    state
        .session
        .write()
        .map_err(|_| ApiError::internal("session lock poisoned"))
}

/* ----------------------------
View
---------------------------- */

#[derive(Serialize)]
struct ItemOut {
    #[serde(flatten)]
    item: NormalizedItem,
    favorite: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ViewOut {
    generated_at: Option<String>,
    count: usize,
    filters: FilterParams,
    items: Vec<ItemOut>,
}

fn view_out(s: &Session) -> ViewOut {
    let items = s
        .view()
        .iter()
        .map(|it| ItemOut {
            favorite: s.is_favorite(&it.id),
            item: it.clone(),
        })
        .collect::<Vec<_>>();
    ViewOut {
        generated_at: s.generated_at().as_ref().map(ingest::date::to_canonical),
        count: items.len(),
        filters: FilterParams::from(s.filters()),
        items,
    }
}

async fn items(State(state): State<AppState>) -> Result<Json<ViewOut>, ApiError> {
    let s = read(&state)?;
    Ok(Json(view_out(&s)))
}

async fn set_filters(
    State(state): State<AppState>,
    Json(params): Json<FilterParams>,
) -> Result<Json<ViewOut>, ApiError> {
    let filters = FilterState::try_from(params).map_err(ApiError::bad_request)?;
    let mut s = write(&state)?;
    s.set_filters(filters);
    Ok(Json(view_out(&s)))
}

async fn stats(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    Ok(Json(read(&state)?.stats()))
}

async fn sources(State(state): State<AppState>) -> Result<Json<Vec<FeedSource>>, ApiError> {
    Ok(Json(read(&state)?.sources().to_vec()))
}

async fn favorites(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let s = read(&state)?;
    let sorted: BTreeSet<String> = s.favorites().iter().cloned().collect();
    Ok(Json(sorted.into_iter().collect()))
}

#[derive(Serialize)]
struct ToggleOut {
    id: String,
    favorite: bool,
}

async fn toggle_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ToggleOut>, ApiError> {
    let favorite = write(&state)?.toggle_favorite(&id).map_err(|e| {
        warn!(error = ?e, %id, "favorite toggle not persisted");
        ApiError::internal(e)
    })?;
    Ok(Json(ToggleOut { id, favorite }))
}

/// Reload the snapshot. The current collection stays in place on failure.
async fn reload(State(state): State<AppState>) -> Result<Json<IngestReport>, ApiError> {
    let classifier = read(&state)?.classifier();
    let data = &state.config.data;
    let batch = ingest::load_snapshot_batch(&data.entries_path, &data.feeds_path, &classifier)
        .map_err(|e| {
            warn!(error = ?e, "snapshot reload failed");
            ApiError::internal(e)
        })?;
    let report = write(&state)?.apply_batch(batch);
    Ok(Json(report))
}

/// Live ingestion; fetches run without holding the session lock.
async fn live(State(state): State<AppState>) -> Result<Json<IngestReport>, ApiError> {
    let (feeds, classifier) = {
        let s = read(&state)?;
        (s.sources().to_vec(), s.classifier())
    };
    let feeds = if feeds.is_empty() {
        snapshot::load_sources(&state.config.data.feeds_path).map_err(|e| {
            warn!(error = ?e, "no source list for live ingestion");
            ApiError::internal(e)
        })?
    } else {
        feeds
    };

    let batch = ingest::run_live(feeds, state.fetcher.as_ref(), &classifier).await;
    let report = write(&state)?.apply_batch(batch);
    Ok(Json(report))
}
