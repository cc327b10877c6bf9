use crate::config::AppConfig;
use crate::fetch::Fetcher;
use crate::join::RegionView;
use crate::render::{render_html, render_svg};
use crate::tooltip::Tooltip;
use crate::types::GeographyFeature;
use crate::view::{Event, ViewState};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::Point;
use rstar::{RTree, RTreeObject, AABB};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

// Wrapper for RTree indexing
pub struct FeatureIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for FeatureIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub view: RwLock<ViewState>,
    pub tree: RTree<FeatureIndex>,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

pub fn build_index(features: &[GeographyFeature]) -> RTree<FeatureIndex> {
    let items: Vec<FeatureIndex> = features
        .iter()
        .enumerate()
        .filter_map(|(i, feature)| {
            let rect = feature.geometry.bounding_rect()?;
            Some(FeatureIndex {
                index: i,
                aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            })
        })
        .collect();
    RTree::bulk_load(items)
}

impl AppState {
    pub fn new(config: AppConfig, features: Vec<GeographyFeature>) -> Self {
        let tree = build_index(&features);
        let view = ViewState::new(
            features,
            config.palette.colors.clone(),
            config.palette.default_color.clone(),
        );
        Self {
            config,
            view: RwLock::new(view),
            tree,
        }
    }

    /// Applies one event to the shared view state.
    pub async fn dispatch(&self, event: Event) {
        let mut view = self.view.write().await;
        *view = std::mem::take(&mut *view).apply(event);
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state
        .config
        .output
        .html
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_default();

    Router::new()
        .route("/", get(index_handler))
        .route("/map.svg", get(svg_handler))
        .route("/api/regions", get(regions_handler))
        .route("/api/hover/:code", post(hover_handler))
        .route("/api/leave/:code", post(leave_handler))
        .route("/api/tooltip", get(tooltip_handler))
        .route("/api/query", get(query_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Loads the datasets once, like a page mount; a failure keeps the current state.
pub async fn load_once(state: Arc<AppState>) {
    let fetcher = Fetcher::new(state.config.sources.clone());
    match fetcher.fetch().await {
        Ok(data) => {
            state.dispatch(Event::DataLoaded(data)).await;
            let view = state.view.read().await;
            info!(
                stats = view.stats().len(),
                tests = view.tests().len(),
                "view state updated"
            );
        }
        Err(e) => {
            error!(error = ?e, "failed to load regional data");
            state.dispatch(Event::FetchFailed).await;
        }
    }
}

pub async fn start_server(config: AppConfig, features: Vec<GeographyFeature>) -> Result<()> {
    let port = config.server.port;
    let state = Arc::new(AppState::new(config, features));

    // The server comes up with empty data; the map recolors once the fetch lands.
    tokio::spawn(load_once(state.clone()));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Renders a snapshot of the view off the async workers; rendering projects in parallel.
async fn render_snapshot<F>(state: &Arc<AppState>, render: F) -> Result<String, StatusCode>
where
    F: FnOnce(&AppConfig, &ViewState) -> String + Send + 'static,
{
    let view = state.view.read().await.clone();
    let state = state.clone();
    tokio::task::spawn_blocking(move || render(&state.config, &view))
        .await
        .map_err(|e| {
            error!(error = ?e, "render task failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Result<Html<String>, StatusCode> {
    let html = render_snapshot(&state, |config, view| {
        let svg = render_svg(config, view);
        render_html(config, &svg, view.tooltip())
    })
    .await?;
    Ok(Html(html))
}

async fn svg_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, StatusCode> {
    let svg = render_snapshot(&state, render_svg).await?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

async fn regions_handler(State(state): State<Arc<AppState>>) -> Json<Vec<RegionView>> {
    Json(state.view.read().await.regions())
}

async fn hover_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Tooltip>, StatusCode> {
    let mut view = state.view.write().await;
    let next = std::mem::take(&mut *view).apply(Event::PointerEnter { code: code.clone() });
    // an unknown code leaves the slot as it was, so check whose tooltip this is
    let tooltip = next.tooltip().filter(|t| t.code == code).cloned();
    *view = next;
    tooltip.map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn leave_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> StatusCode {
    state.dispatch(Event::PointerLeave { code }).await;
    StatusCode::NO_CONTENT
}

async fn tooltip_handler(State(state): State<Arc<AppState>>) -> Json<Option<Tooltip>> {
    Json(state.view.read().await.tooltip().cloned())
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<RegionView>> {
    let point = Point::new(params.lon, params.lat);
    let envelope = AABB::from_point([params.lon, params.lat]);
    let view = state.view.read().await;

    for candidate in state.tree.locate_in_envelope_intersecting(&envelope) {
        if let Some(feature) = view.features().get(candidate.index) {
            if feature.geometry.contains(&point) {
                return Json(view.region(&feature.code));
            }
        }
    }

    Json(None)
}
