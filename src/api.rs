//! REST API for the road segment map.
//!
//! Provides endpoints for:
//! - Dataset listing, optionally filtered by road number
//! - One-shot map renders, plain or streamed over SSE
//! - Map session management (create, get, zoom, toggle overlays, delete)
//! - Swagger UI at /q/swagger-ui

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::console;
use crate::display::{ArrowPattern, FitOptions, FittedBounds, Overlay, Style};
use crate::domain::Dataset;
use crate::dto::{
    BaseLayerDto, DrawableDto, HealthResponse, InfoResponse, OutcomeDto, OverlayDto, OverlayToggleRequest,
    RecordDto, RuasQuery, SceneDto, ViewDto, ZoomRequest,
};
use crate::geometry::Bounds;
use crate::routing::{route_record, GeometrySource, RouteProvider};
use crate::ruas::QueryIdentifier;
use crate::session::{MapSession, SessionStore};

/// Application state shared across handlers.
pub struct AppState {
    /// `None` when the dataset failed to load; map endpoints answer 503.
    pub dataset: Option<Arc<Dataset>>,
    pub routes: Arc<dyn RouteProvider>,
    /// Shown by `/info`.
    pub routing_url: String,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(dataset: Option<Dataset>, routes: Arc<dyn RouteProvider>, routing_url: impl Into<String>) -> Self {
        Self {
            dataset: dataset.map(Arc::new),
            routes,
            routing_url: routing_url.into(),
            sessions: SessionStore::new(),
        }
    }

    /// Bounds the session store.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.sessions = SessionStore::with_max_sessions(max_sessions);
        self
    }

    fn dataset(&self) -> Result<Arc<Dataset>, StatusCode> {
        self.dataset.clone().ok_or(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Creates the API router with CORS and Swagger UI enabled.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & Info
        .route("/health", get(health))
        .route("/info", get(info))
        // Dataset
        .route("/ruas", get(list_ruas))
        // One-shot renders
        .route("/map", get(get_map))
        .route("/map/stream", get(get_map_stream))
        // Sessions
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/zoom", put(zoom_session))
        .route("/sessions/{id}/overlays/{overlay}", put(toggle_overlay))
        // Swagger UI at /q/swagger-ui (Quarkus-style path)
        .merge(SwaggerUi::new("/q/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health & Info
// ============================================================================

/// GET /health - Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "UP" })
}

/// GET /info - Application info endpoint.
#[utoipa::path(
    get,
    path = "/info",
    responses((status = 200, description = "Application info", body = InfoResponse))
)]
async fn info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "Ruas Jalan Map",
        version: env!("CARGO_PKG_VERSION"),
        records: state.dataset.as_ref().map(|d| d.len()),
        routing_url: state.routing_url.clone(),
    })
}

// ============================================================================
// Dataset
// ============================================================================

/// GET /ruas - List road records, only the matching ones when `ruasId` is given.
#[utoipa::path(
    get,
    path = "/ruas",
    params(RuasQuery),
    responses(
        (status = 200, description = "Road records", body = Vec<RecordDto>),
        (status = 503, description = "Dataset not loaded")
    )
)]
async fn list_ruas(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RuasQuery>,
) -> Result<Json<Vec<RecordDto>>, StatusCode> {
    let dataset = state.dataset()?;
    let records = match params.query() {
        Some(query) => dataset.matching(&query).map(RecordDto::from_record).collect(),
        None => dataset.records.iter().map(RecordDto::from_record).collect(),
    };
    Ok(Json(records))
}

// ============================================================================
// Map Renders
// ============================================================================

/// Renders a session against the loaded dataset.
async fn render(state: &AppState, query: Option<QueryIdentifier>) -> Result<MapSession, StatusCode> {
    let dataset = state.dataset()?;
    let started = Instant::now();
    let session = MapSession::render(&dataset, query, state.routes.as_ref()).await;
    console::print_render(
        session.query().map(QueryIdentifier::as_str),
        session.outcome(),
        started.elapsed(),
    );
    Ok(session)
}

/// GET /map - Render the map for an optional `ruasId` and return its scene.
#[utoipa::path(
    get,
    path = "/map",
    params(RuasQuery),
    responses(
        (status = 200, description = "Rendered scene", body = SceneDto),
        (status = 503, description = "Dataset not loaded")
    )
)]
async fn get_map(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RuasQuery>,
) -> Result<Json<SceneDto>, StatusCode> {
    let session = render(&state, params.query()).await?;
    Ok(Json(SceneDto::from_session(&session, None)))
}

fn sse_event(value: serde_json::Value) -> String {
    format!("data: {}\n\n", value)
}

fn sse_response(body: Body) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response()
}

/// GET /map/stream - Render the map with SSE progress updates.
///
/// Emits one `progress` event per resolved route and a final `complete`
/// event carrying the scene. Compatible with the frontend's EventSource API.
#[utoipa::path(
    get,
    path = "/map/stream",
    params(RuasQuery),
    responses((
        status = 200,
        description = "SSE stream of `progress` events, then `complete` with the scene or `error` when the dataset is not loaded",
        body = String,
        content_type = "text/event-stream"
    ))
)]
async fn get_map_stream(State(state): State<Arc<AppState>>, Query(params): Query<RuasQuery>) -> impl IntoResponse {
    let Some(dataset) = state.dataset.clone() else {
        let error = sse_event(json!({"event": "error", "message": "Dataset not loaded"}));
        return sse_response(Body::from(error));
    };
    let query = params.query();
    let routes = state.routes.clone();

    let stream = async_stream::stream! {
        let started = Instant::now();
        let mut session = MapSession::begin(query);
        session.draw_direct(&dataset);

        let records = session.pending_routes(&dataset);
        let total = records.len();
        let initial_percent = if total == 0 { 100 } else { 0 };
        yield Ok::<_, Infallible>(sse_event(json!({
            "event": "progress",
            "phase": "routing",
            "resolved": 0,
            "total": total,
            "percent": initial_percent,
        })));

        let mut pending: FuturesUnordered<_> = records
            .into_iter()
            .map(|record| route_record(routes.as_ref(), record))
            .collect();
        let mut resolved = 0;
        while let Some((record, geometry)) = pending.next().await {
            resolved += 1;
            let no_ruas = record.no_ruas().to_string();
            let fallback = geometry.source == GeometrySource::Fallback;
            session.draw(record, geometry);
            yield Ok(sse_event(json!({
                "event": "progress",
                "phase": "routing",
                "noRuas": no_ruas,
                "fallback": fallback,
                "resolved": resolved,
                "total": total,
                "percent": resolved * 100 / total,
            })));
        }

        session.finish();
        console::print_render(
            session.query().map(QueryIdentifier::as_str),
            session.outcome(),
            started.elapsed(),
        );

        let scene = SceneDto::from_session(&session, None);
        yield Ok(sse_event(json!({"event": "complete", "scene": scene})));
    };

    sse_response(Body::from_stream(stream))
}

// ============================================================================
// Sessions
// ============================================================================

/// POST /sessions - Render a map and keep it as a session.
#[utoipa::path(
    post,
    path = "/sessions",
    params(RuasQuery),
    responses(
        (status = 200, description = "Session ID", body = String),
        (status = 503, description = "Dataset not loaded")
    )
)]
async fn create_session(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RuasQuery>,
) -> Result<String, StatusCode> {
    let session = render(&state, params.query()).await?;
    let id = state.sessions.insert(session);
    tracing::info!(%id, "Session created");
    Ok(id)
}

/// GET /sessions - List all session IDs.
#[utoipa::path(
    get,
    path = "/sessions",
    responses((status = 200, description = "List of session IDs", body = Vec<String>))
)]
async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.sessions.list())
}

/// GET /sessions/{id} - Get the current scene of a session.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session scene", body = SceneDto),
        (status = 404, description = "Not found")
    )
)]
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SceneDto>, StatusCode> {
    match state.sessions.get(&id) {
        Some(session) => {
            let guard = session.read();
            Ok(Json(SceneDto::from_session(&guard, Some(id))))
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// PUT /sessions/{id}/zoom - Report a zoom change.
///
/// Restyles lines and rebuilds arrows for the new zoom.
#[utoipa::path(
    put,
    path = "/sessions/{id}/zoom",
    params(("id" = String, Path, description = "Session ID")),
    request_body = ZoomRequest,
    responses(
        (status = 200, description = "Updated scene", body = SceneDto),
        (status = 404, description = "Not found")
    )
)]
async fn zoom_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ZoomRequest>,
) -> Result<Json<SceneDto>, StatusCode> {
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let mut guard = session.write();
    guard.zoom_to(request.zoom);
    Ok(Json(SceneDto::from_session(&guard, Some(id))))
}

/// PUT /sessions/{id}/overlays/{overlay} - Show or hide an overlay.
#[utoipa::path(
    put,
    path = "/sessions/{id}/overlays/{overlay}",
    params(
        ("id" = String, Path, description = "Session ID"),
        ("overlay" = Overlay, Path, description = "Overlay to toggle")
    ),
    request_body = OverlayToggleRequest,
    responses(
        (status = 200, description = "Updated scene", body = SceneDto),
        (status = 404, description = "Not found")
    )
)]
async fn toggle_overlay(
    State(state): State<Arc<AppState>>,
    Path((id, overlay)): Path<(String, Overlay)>,
    Json(request): Json<OverlayToggleRequest>,
) -> Result<Json<SceneDto>, StatusCode> {
    let session = state.sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let mut guard = session.write();
    guard.toggle_overlay(overlay, request.shown);
    Ok(Json(SceneDto::from_session(&guard, Some(id))))
}

/// DELETE /sessions/{id} - Discard a session.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(("id" = String, Path, description = "Session ID")),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Not found")
    )
)]
async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> StatusCode {
    match state.sessions.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

// ============================================================================
// OpenAPI Documentation
// ============================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        info,
        list_ruas,
        get_map,
        get_map_stream,
        create_session,
        list_sessions,
        get_session,
        zoom_session,
        toggle_overlay,
        delete_session,
    ),
    components(schemas(
        HealthResponse,
        InfoResponse,
        RecordDto,
        SceneDto,
        ViewDto,
        BaseLayerDto,
        OverlayDto,
        DrawableDto,
        OutcomeDto,
        ZoomRequest,
        OverlayToggleRequest,
        Overlay,
        Style,
        ArrowPattern,
        FitOptions,
        FittedBounds,
        Bounds,
    ))
)]
struct ApiDoc;
