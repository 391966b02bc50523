use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{format_big_number, ContinuationEntry, HomeSections, UserInteractions, VideoRecord, VideoStats},
    services::{
        continuation::continue_watching,
        feed::RefreshOutcome,
        sampler::{sample_discovery, ThreadRandom},
        search::{SearchPhase, SearchSnapshot},
        views::{self, PlayList, Shelf},
    },
};

use super::AppState;

// Request/Response types

/// A record as shown to the viewer, with its display counters
#[derive(Debug, Serialize)]
pub struct VideoResponse {
    #[serde(flatten)]
    pub video: VideoRecord,
    pub stats: VideoStats,
    pub views_label: String,
    pub likes_label: String,
}

impl From<&VideoRecord> for VideoResponse {
    fn from(video: &VideoRecord) -> Self {
        let stats = VideoStats::from_seed(video.media_key());

        Self {
            video: video.clone(),
            views_label: format_big_number(stats.views),
            likes_label: format_big_number(stats.likes),
            stats,
        }
    }
}

fn responses(videos: &[VideoRecord]) -> Vec<VideoResponse> {
    videos.iter().map(VideoResponse::from).collect()
}

#[derive(Debug, Serialize)]
pub struct ContinuationResponse {
    pub video: VideoResponse,
    pub progress: f64,
}

impl From<&ContinuationEntry> for ContinuationResponse {
    fn from(entry: &ContinuationEntry) -> Self {
        Self {
            video: VideoResponse::from(&entry.video),
            progress: entry.progress,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryRowResponse {
    pub label: String,
    pub videos: Vec<VideoResponse>,
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub discovery: Vec<VideoResponse>,
    pub continue_watching: Vec<ContinuationResponse>,
    pub featured_longs: Vec<VideoResponse>,
    pub quick_shorts: Vec<VideoResponse>,
    pub category_rows: Vec<CategoryRowResponse>,
}

impl From<HomeSections> for HomeResponse {
    fn from(home: HomeSections) -> Self {
        Self {
            discovery: responses(&home.discovery),
            continue_watching: home.continue_watching.iter().map(ContinuationResponse::from).collect(),
            featured_longs: responses(&home.featured_longs),
            quick_shorts: responses(&home.quick_shorts),
            category_rows: home
                .category_rows
                .iter()
                .map(|row| CategoryRowResponse {
                    label: row.label.clone(),
                    videos: responses(&row.videos),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub hard: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub progress: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub list: PlayList,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SearchAccepted {
    pub sequence: u64,
    pub phase: SearchPhase,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub sequence: u64,
    pub query: String,
    pub phase: SearchPhase,
    pub results: Vec<VideoResponse>,
}

impl From<SearchSnapshot> for SearchResponse {
    fn from(snapshot: SearchSnapshot) -> Self {
        Self {
            sequence: snapshot.sequence,
            results: responses(&snapshot.results),
            query: snapshot.query,
            phase: snapshot.phase,
        }
    }
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Full composed feed, disliked records included
pub async fn get_feed(State(state): State<AppState>) -> Json<Vec<VideoResponse>> {
    let feed = state.feed.current().await;
    Json(responses(&feed))
}

pub async fn refresh_feed(
    State(state): State<AppState>,
    body: Option<Json<RefreshRequest>>,
) -> AppResult<Json<RefreshOutcome>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let result = state.feed.refresh(request.hard).await;

    if request.hard && !matches!(result, Ok(RefreshOutcome::Skipped)) {
        state.search.clear();
    }

    Ok(Json(result?))
}

pub async fn get_home(State(state): State<AppState>) -> Json<HomeResponse> {
    let feed = state.feed.current().await;
    let interactions = state.interactions.snapshot();

    let home = views::home_sections(
        &feed,
        &interactions,
        &state.categories,
        state.discovery_count,
        &mut ThreadRandom,
    );

    Json(HomeResponse::from(home))
}

pub async fn get_continue_watching(State(state): State<AppState>) -> Json<Vec<ContinuationResponse>> {
    let feed = state.feed.current().await;
    let interactions = state.interactions.snapshot();

    let entries = continue_watching(&interactions.watch_history, &feed);
    Json(entries.iter().map(ContinuationResponse::from).collect())
}

pub async fn get_discovery(State(state): State<AppState>) -> Json<Vec<VideoResponse>> {
    let feed = state.feed.current().await;
    let shown = views::visible(&feed, &state.interactions.snapshot());

    let picked = sample_discovery(&shown, &state.categories, state.discovery_count, &mut ThreadRandom);
    Json(responses(&picked))
}

pub async fn get_interactions(State(state): State<AppState>) -> Json<UserInteractions> {
    Json(state.interactions.snapshot())
}

/// Explicit reset path; drops every stored signal
pub async fn reset_interactions(State(state): State<AppState>) -> Json<UserInteractions> {
    Json(state.interactions.reset())
}

pub async fn like_video(State(state): State<AppState>, Path(id): Path<String>) -> Json<UserInteractions> {
    Json(state.interactions.like(&id))
}

pub async fn dislike_video(State(state): State<AppState>, Path(id): Path<String>) -> Json<UserInteractions> {
    Json(state.interactions.dislike(&id))
}

pub async fn restore_video(State(state): State<AppState>, Path(id): Path<String>) -> Json<UserInteractions> {
    Json(state.interactions.restore(&id))
}

pub async fn save_video(State(state): State<AppState>, Path(id): Path<String>) -> Json<UserInteractions> {
    Json(state.interactions.save_bookmark(&id))
}

pub async fn record_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ProgressRequest>,
) -> AppResult<Json<UserInteractions>> {
    if !request.progress.is_finite() || !(0.0..=1.0).contains(&request.progress) {
        return Err(AppError::InvalidInput(format!(
            "progress must be between 0 and 1, got {}",
            request.progress
        )));
    }

    Ok(Json(state.interactions.record_progress(&id, request.progress)))
}

pub async fn next_video(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<NextQuery>,
) -> AppResult<Json<VideoResponse>> {
    let feed = state.feed.current().await;
    let shown = views::visible(&feed, &state.interactions.snapshot());
    let list = params.list.select(&shown);

    views::next_in_list(&list, &id)
        .map(|video| Json(VideoResponse::from(video)))
        .ok_or_else(|| AppError::NotFound(format!("No video after {}", id)))
}

pub async fn get_library(
    State(state): State<AppState>,
    Path(shelf): Path<Shelf>,
) -> Json<Vec<VideoResponse>> {
    let feed = state.feed.current().await;
    let videos = views::library(&feed, &state.interactions.snapshot(), shelf);
    Json(responses(&videos))
}

/// Starts a debounced search over the visible feed
pub async fn submit_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> (StatusCode, Json<SearchAccepted>) {
    let feed = state.feed.current().await;
    let shown = Arc::new(views::visible(&feed, &state.interactions.snapshot()));

    let sequence = state.search.submit(&request.query, shown);
    let phase = state.search.snapshot().phase;

    (StatusCode::ACCEPTED, Json(SearchAccepted { sequence, phase }))
}

pub async fn get_search(State(state): State<AppState>) -> Json<SearchResponse> {
    Json(SearchResponse::from(state.search.snapshot()))
}

pub async fn clear_search(State(state): State<AppState>) -> Json<SearchResponse> {
    state.search.clear();
    Json(SearchResponse::from(state.search.snapshot()))
}
