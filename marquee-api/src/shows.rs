use std::collections::BTreeMap;
use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use marquee_core::{SeatState, Show};
use marquee_engine::ReclaimReport;
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct ShowResponse {
    pub id: Uuid,
    pub venue_name: String,
    pub show_time: String,
    pub price: i64,
    pub version: u64,
    pub available: usize,
    pub seats: BTreeMap<String, SeatState>,
}

impl From<Show> for ShowResponse {
    fn from(show: Show) -> Self {
        let available = show.count_where(SeatState::is_available);
        Self {
            id: show.id,
            venue_name: show.venue_name,
            show_time: show.show_time,
            price: show.price,
            version: show.version,
            available,
            seats: show.seats,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/shows/{show_id}", get(get_show))
        .route("/v1/shows/{show_id}/stream", get(stream_show))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/v1/shows/{show_id}/reclaim", post(reclaim_show))
}

/// GET /v1/shows/{show_id}
async fn get_show(
    State(state): State<AppState>,
    Path(show_id): Path<Uuid>,
) -> Result<Json<ShowResponse>, AppError> {
    let show = state.engine.view_show(show_id, Utc::now()).await?;
    Ok(Json(show.into()))
}

/// GET /v1/shows/{show_id}/stream
/// Live seat changes for one show
async fn stream_show(
    State(state): State<AppState>,
    Path(show_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    state.engine.show(show_id).await?;

    let rx = state.engine.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.show_id() == show_id => Event::default()
                .event(event.name())
                .json_data(&event)
                .ok()
                .map(Ok),
            // lagged receivers skip what they missed
            _ => None,
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// POST /v1/shows/{show_id}/reclaim
async fn reclaim_show(
    State(state): State<AppState>,
    Path(show_id): Path<Uuid>,
) -> Result<Json<ReclaimReport>, AppError> {
    let report = state.engine.reclaim_expired(show_id, Utc::now()).await?;
    Ok(Json(report))
}
