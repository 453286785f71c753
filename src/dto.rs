//! DTOs for REST API requests/responses.
//!
//! Coordinates go out as `[latitude, longitude]` arrays and line
//! geometry as Google-encoded polylines, the shapes Leaflet consumes.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::display::{ArrowPattern, DrawableKind, Drawable, DisplaySurface, FittedBounds, Overlay, Style, ROAD_COLOR};
use crate::domain::{path_length_meters, RoadRecord};
use crate::geometry::encode_polyline;
use crate::ruas::QueryIdentifier;
use crate::session::{MapSession, RenderOutcome};

/// `ruasId` query parameter shared by the map endpoints.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RuasQuery {
    /// Road number to focus on; blank means the overview.
    pub ruas_id: Option<String>,
}

impl RuasQuery {
    pub fn query(&self) -> Option<QueryIdentifier> {
        self.ruas_id.as_deref().and_then(QueryIdentifier::from_param)
    }
}

/// One road record as listed by `GET /ruas`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordDto {
    pub index: usize,
    pub no_ruas: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kapanewon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kalurahan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panjang_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lebar_m: Option<f64>,
    /// Start point as `[latitude, longitude]`.
    pub start: [f64; 2],
    /// End point as `[latitude, longitude]`.
    pub end: [f64; 2],
    /// Length of the dataset geometry.
    pub length_meters: f64,
    /// Encoded polyline of the dataset geometry.
    pub geometry: String,
}

impl RecordDto {
    pub fn from_record(record: &RoadRecord) -> Self {
        let props = &record.properties;
        Self {
            index: record.index,
            no_ruas: record.no_ruas().to_string(),
            name: record.display_name().to_string(),
            kapanewon: props.kapanewon.clone(),
            kalurahan: props.kalurahan.clone(),
            panjang_km: props.panjang_km,
            lebar_m: props.lebar_m,
            start: record.start().lat_lng(),
            end: record.end().lat_lng(),
            length_meters: path_length_meters(&record.coordinates),
            geometry: encode_polyline(&record.coordinates),
        }
    }
}

/// Tile layer offered by the layer control.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BaseLayerDto {
    pub name: &'static str,
    pub url: &'static str,
    pub attribution: &'static str,
    pub max_zoom: u8,
    /// Layer shown on load.
    pub default: bool,
}

/// Base layers in layer-control order; the first is the default.
pub fn base_layers() -> Vec<BaseLayerDto> {
    vec![
        BaseLayerDto {
            name: "OpenStreetMap",
            url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            attribution: "&copy; OpenStreetMap contributors",
            max_zoom: 19,
            default: true,
        },
        BaseLayerDto {
            name: "Satelit",
            url: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
            attribution: "Tiles &copy; Esri",
            max_zoom: 19,
            default: false,
        },
        BaseLayerDto {
            name: "Terrain",
            url: "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
            attribution: "&copy; OpenTopoMap contributors",
            max_zoom: 17,
            default: false,
        },
    ]
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverlayDto {
    pub id: Overlay,
    pub label: &'static str,
    pub shown: bool,
}

/// Presentation state of the map view.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewDto {
    /// Centre as `[latitude, longitude]`.
    pub center: [f64; 2],
    pub zoom: u8,
    /// Map container still hidden.
    pub hidden: bool,
    pub layer_control: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fitted: Option<FittedBounds>,
    /// Drawable whose popup is open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_popup: Option<u64>,
}

/// One drawable as the frontend replays it.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrawableDto {
    pub id: u64,
    /// `line`, `arrow` or `marker`.
    pub kind: &'static str,
    pub overlay: Overlay,
    /// Index of the originating record.
    pub record: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_ruas: Option<String>,
    /// Currently on the map.
    pub attached: bool,
    pub style: Style,
    pub color: &'static str,
    /// Encoded polyline (lines).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<String>,
    /// Position as `[latitude, longitude]` (markers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat_lng: Option<[f64; 2]>,
    /// Decorated line (arrows).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<ArrowPattern>,
    /// `pangkal` or `ujung` (markers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<&'static str>,
    /// Icon HTML (markers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup: Option<String>,
}

impl DrawableDto {
    pub fn from_drawable(drawable: &Drawable, attached: bool) -> Self {
        let mut dto = Self {
            id: drawable.id().0,
            kind: "line",
            overlay: drawable.overlay(),
            record: drawable.record(),
            no_ruas: drawable.identifier().map(|id| id.as_str().to_string()),
            attached,
            style: drawable.style(),
            color: ROAD_COLOR,
            geometry: None,
            lat_lng: None,
            line_id: None,
            pattern: None,
            endpoint: None,
            icon: None,
            popup: drawable.popup().map(str::to_string),
        };

        match drawable.kind() {
            DrawableKind::Line { path, .. } => {
                dto.geometry = Some(encode_polyline(path));
            }
            DrawableKind::Arrow { line, pattern } => {
                dto.kind = "arrow";
                dto.line_id = Some(line.0);
                dto.pattern = Some(*pattern);
            }
            DrawableKind::Marker {
                position,
                endpoint,
                icon,
                ..
            } => {
                dto.kind = "marker";
                dto.lat_lng = Some(position.lat_lng());
                dto.endpoint = Some(endpoint.slug());
                dto.icon = Some(icon.clone());
            }
        }
        dto
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeDto {
    pub drawn: usize,
    pub route_requests: usize,
    pub fallbacks: usize,
    pub found: bool,
}

impl From<&RenderOutcome> for OutcomeDto {
    fn from(outcome: &RenderOutcome) -> Self {
        Self {
            drawn: outcome.drawn,
            route_requests: outcome.route_requests,
            fallbacks: outcome.fallbacks,
            found: outcome.found,
        }
    }
}

/// Full state of a map session.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SceneDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Query as typed by the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ruas_id: Option<String>,
    pub view: ViewDto,
    pub base_layers: Vec<BaseLayerDto>,
    pub overlays: Vec<OverlayDto>,
    pub drawables: Vec<DrawableDto>,
    pub outcome: OutcomeDto,
}

impl SceneDto {
    pub fn from_session(session: &MapSession, session_id: Option<String>) -> Self {
        let view = session.view();
        Self {
            session_id,
            ruas_id: session.query().map(|q| q.as_str().to_string()),
            view: ViewDto {
                center: view.center().lat_lng(),
                zoom: view.zoom(),
                hidden: view.is_hidden(),
                layer_control: view.has_layer_control(),
                fitted: view.fitted(),
                open_popup: view.opened_popup().map(|id| id.0),
            },
            base_layers: base_layers(),
            overlays: Overlay::ALL
                .into_iter()
                .map(|overlay| OverlayDto {
                    id: overlay,
                    label: overlay.label(),
                    shown: view.is_overlay_shown(overlay),
                })
                .collect(),
            drawables: session
                .scene()
                .drawables()
                .map(|d| DrawableDto::from_drawable(d, view.is_attached(d.id())))
                .collect(),
            outcome: OutcomeDto::from(session.outcome()),
        }
    }
}

/// Body of `PUT /sessions/{id}/zoom`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ZoomRequest {
    pub zoom: u8,
}

/// Body of `PUT /sessions/{id}/overlays/{overlay}`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OverlayToggleRequest {
    pub shown: bool,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Status indicator ("UP" when healthy).
    pub status: &'static str,
}

/// Application info response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    /// Records in the loaded dataset, absent when loading failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
    pub routing_url: String,
}
