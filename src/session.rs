//! Map sessions: one rendered view of the dataset for one query.
//!
//! Rendering runs in explicit phases:
//!
//! 1. draw every record (dataset geometry without a query, routed
//!    geometry for the matched records with one)
//! 2. attach the layer control and, in overview mode, fit to everything
//! 3. resolve visibility by the query
//! 4. in detail mode, un-hide the map and focus the matched road
//!
//! Route fetches are concurrent and each result is drawn as it arrives.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::display::{DisplaySurface, FitOptions, MapView, Overlay};
use crate::domain::{Dataset, LonLat, RoadRecord};
use crate::routing::{route_record, GeometrySource, RoadGeometry, RouteProvider};
use crate::ruas::QueryIdentifier;
use crate::scene::{Resolution, Scene};

/// Initial centre of the map (Kulon Progo).
pub const INITIAL_CENTER: LonLat = LonLat {
    lon: 110.156,
    lat: -7.826,
};

/// Initial zoom when focusing a single road.
pub const DETAIL_ZOOM: u8 = 18;

/// Initial zoom of the overview.
pub const OVERVIEW_ZOOM: u8 = 12;

/// Padding ratio of the overview fit.
const OVERVIEW_PAD: f64 = 0.1;

/// Fit options of the detail focus.
const DETAIL_FIT: FitOptions = FitOptions {
    padding: 30,
    max_zoom: Some(DETAIL_ZOOM),
};

/// Summary of a finished render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Records drawn.
    pub drawn: usize,
    /// Route requests issued.
    pub route_requests: usize,
    /// Route requests that fell back to a straight line.
    pub fallbacks: usize,
    /// Drawables left visible by the final visibility pass.
    pub resolution: Resolution,
    /// Whether the query found anything. Always true in overview mode.
    pub found: bool,
}

/// One map view plus the drawables on it.
#[derive(Debug, Clone)]
pub struct MapSession {
    view: MapView,
    scene: Scene,
    outcome: RenderOutcome,
}

impl MapSession {
    /// Starts an empty session. A query starts hidden at detail zoom, no
    /// query starts visible at overview zoom.
    pub fn begin(query: Option<QueryIdentifier>) -> Self {
        let view = match query {
            Some(_) => MapView::hidden(INITIAL_CENTER, DETAIL_ZOOM),
            None => MapView::new(INITIAL_CENTER, OVERVIEW_ZOOM),
        };
        Self {
            view,
            scene: Scene::new(query),
            outcome: RenderOutcome::default(),
        }
    }

    /// Renders a full session, routing matched records concurrently.
    pub async fn render<P: RouteProvider + ?Sized>(
        dataset: &Dataset,
        query: Option<QueryIdentifier>,
        provider: &P,
    ) -> Self {
        let mut session = Self::begin(query);
        session.draw_direct(dataset);

        let mut pending: FuturesUnordered<_> = session
            .pending_routes(dataset)
            .into_iter()
            .map(|record| route_record(provider, record))
            .collect();
        while let Some((record, geometry)) = pending.next().await {
            session.draw(record, geometry);
        }

        session.finish();
        session
    }

    pub fn query(&self) -> Option<&QueryIdentifier> {
        self.scene.query()
    }

    pub fn view(&self) -> &MapView {
        &self.view
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn outcome(&self) -> &RenderOutcome {
        &self.outcome
    }

    /// Records that need a route: the matched ones, and only when there
    /// is a query. Each one counts as a route request.
    pub fn pending_routes<'a>(&mut self, dataset: &'a Dataset) -> Vec<&'a RoadRecord> {
        let Some(query) = self.scene.query() else {
            info!("No OSRM requests, using dataset geometry for all features");
            return Vec::new();
        };

        let records: Vec<&RoadRecord> = dataset.matching(query).collect();
        for (n, record) in records.iter().enumerate() {
            info!(request = n + 1, no_ruas = record.no_ruas(), "OSRM request");
        }
        info!(total = records.len(), ruas_id = %query, "Total OSRM requests");
        self.outcome.route_requests = records.len();
        records
    }

    /// Without a query, draws every record with its own coordinates.
    pub fn draw_direct(&mut self, dataset: &Dataset) {
        if self.scene.query().is_some() {
            return;
        }
        for record in &dataset.records {
            self.draw(record, RoadGeometry::from_dataset(record));
        }
    }

    /// Draws one record with already resolved geometry.
    pub fn draw(&mut self, record: &RoadRecord, geometry: RoadGeometry) {
        if geometry.source == GeometrySource::Fallback {
            self.outcome.fallbacks += 1;
        }
        self.scene.add_road(&mut self.view, record, geometry);
        self.outcome.drawn += 1;
    }

    /// Runs the closing phases once every record is drawn.
    pub fn finish(&mut self) -> &RenderOutcome {
        self.view.attach_layer_control();

        let overview = self.scene.query().is_none();
        if overview {
            if let Some(bounds) = self.scene.attached_bounds(&self.view) {
                self.view.fit_bounds(
                    bounds.pad(OVERVIEW_PAD),
                    FitOptions {
                        padding: 0,
                        max_zoom: None,
                    },
                );
            }
        }

        let resolution = self.scene.resolve_visibility(&mut self.view);

        if !overview {
            self.view.reveal();
            self.focus(&resolution);
        }

        self.outcome.found = overview || !resolution.is_empty();
        self.outcome.resolution = resolution;
        &self.outcome
    }

    /// Fits the view to the matched lines, or failing that the matched
    /// markers, and opens the first one's popup.
    fn focus(&mut self, resolution: &Resolution) {
        let targets = if resolution.lines.is_empty() {
            &resolution.markers
        } else {
            &resolution.lines
        };

        let Some(&first) = targets.first() else {
            let ruas_id = self.scene.query().map(|q| q.as_str().to_string()).unwrap_or_default();
            warn!(%ruas_id, "Nomor ruas tidak ditemukan");
            return;
        };

        if let Some(bounds) = self.scene.bounds_of(targets) {
            self.view.fit_bounds(bounds, DETAIL_FIT);
        }
        self.view.open_popup(first);
    }

    /// Applies a zoom change from the frontend. Returns the applied zoom.
    pub fn zoom_to(&mut self, zoom: u8) -> u8 {
        let applied = self.view.set_zoom(zoom);
        self.scene.on_zoom_end(&mut self.view, applied);
        debug!(zoom = applied, "Zoom changed");
        applied
    }

    /// Shows or hides an overlay the way the layer control does: hiding
    /// takes all of its members off the map, showing puts them all back
    /// and then lets the scene restore their style or re-filter them.
    pub fn toggle_overlay(&mut self, overlay: Overlay, shown: bool) {
        let members = self.scene.members(overlay);
        self.view.set_overlay_shown(overlay, shown);
        if shown {
            for id in members {
                self.view.attach(id);
            }
            self.scene.on_overlay_add(&mut self.view, overlay);
        } else {
            for id in members {
                self.view.detach(id);
            }
        }
        debug!(?overlay, shown, "Overlay toggled");
    }
}

/// Sessions kept before the oldest one is evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 256;

#[derive(Default)]
struct SessionMap {
    by_id: HashMap<String, Arc<RwLock<MapSession>>>,
    /// Ids in insertion order, oldest first.
    order: VecDeque<String>,
}

/// Live sessions keyed by id, bounded to a maximum count.
///
/// Pages delete their session when they unload; the bound covers pages
/// that never get to.
pub struct SessionStore {
    max_sessions: usize,
    sessions: RwLock<SessionMap>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_max_sessions(DEFAULT_MAX_SESSIONS)
    }

    /// Store holding at most `max_sessions` sessions (at least one).
    pub fn with_max_sessions(max_sessions: usize) -> Self {
        Self {
            max_sessions: max_sessions.max(1),
            sessions: RwLock::new(SessionMap::default()),
        }
    }

    /// Stores a session under a fresh id, evicting the oldest sessions
    /// beyond the bound.
    pub fn insert(&self, session: MapSession) -> String {
        let id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write();
        sessions
            .by_id
            .insert(id.clone(), Arc::new(RwLock::new(session)));
        sessions.order.push_back(id.clone());

        while sessions.by_id.len() > self.max_sessions {
            let Some(oldest) = sessions.order.pop_front() else {
                break;
            };
            sessions.by_id.remove(&oldest);
            debug!(id = %oldest, "Session evicted");
        }
        id
    }

    pub fn get(&self, id: &str) -> Option<Arc<RwLock<MapSession>>> {
        self.sessions.read().by_id.get(id).cloned()
    }

    /// Session ids, oldest first.
    pub fn list(&self) -> Vec<String> {
        self.sessions.read().order.iter().cloned().collect()
    }

    pub fn remove(&self, id: &str) -> Option<Arc<RwLock<MapSession>>> {
        let mut sessions = self.sessions.write();
        let removed = sessions.by_id.remove(id)?;
        sessions.order.retain(|other| other != id);
        Some(removed)
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().by_id.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DrawableId, Style};
    use crate::domain::RoadProperties;
    use crate::routing::RoutingError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Routes every request through a midpoint, or fails when `fail` is set.
    struct Midpoint {
        fail: bool,
        calls: AtomicUsize,
    }

    impl Midpoint {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RouteProvider for Midpoint {
        async fn route(&self, start: LonLat, end: LonLat) -> Result<Vec<LonLat>, RoutingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RoutingError::NoRoute("NoSegment".to_string()));
            }
            let mid = LonLat::new((start.lon + end.lon) / 2.0 + 0.001, (start.lat + end.lat) / 2.0);
            Ok(vec![start, mid, end])
        }
    }

    fn dataset() -> Dataset {
        let ids = ["242.0", "242.1", "242.2", "100"];
        Dataset::from_records(
            ids.iter()
                .enumerate()
                .filter_map(|(i, id)| {
                    let lon = 110.10 + i as f64 * 0.02;
                    RoadRecord::new(
                        i,
                        RoadProperties {
                            no_ruas: Some(id.to_string()),
                            ..Default::default()
                        },
                        vec![LonLat::new(lon, -7.80), LonLat::new(lon, -7.805), LonLat::new(lon, -7.81)],
                    )
                })
                .collect(),
        )
    }

    fn query(q: &str) -> Option<QueryIdentifier> {
        QueryIdentifier::from_param(q)
    }

    fn visible_ids(session: &MapSession) -> Vec<String> {
        let mut ids: Vec<String> = session
            .scene()
            .drawables()
            .filter(|d| d.is_line() && session.view().is_attached(d.id()))
            .filter_map(|d| d.identifier().map(|id| id.as_str().to_string()))
            .collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn test_base_query_focuses_group() {
        let provider = Midpoint::new(false);
        let session = MapSession::render(&dataset(), query("242"), &provider).await;

        assert_eq!(visible_ids(&session), vec!["242.0", "242.1", "242.2"]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(session.outcome().route_requests, 3);
        assert_eq!(session.outcome().fallbacks, 0);
        assert!(session.outcome().found);

        let view = session.view();
        assert!(!view.is_hidden());
        assert!(view.has_layer_control());
        let fitted = view.fitted().unwrap();
        assert_eq!(fitted.options, DETAIL_FIT);
        let first_line = session.outcome().resolution.lines[0];
        assert_eq!(view.opened_popup(), Some(first_line));
    }

    #[tokio::test]
    async fn test_variant_query_focuses_one() {
        let provider = Midpoint::new(false);
        let session = MapSession::render(&dataset(), query("242.1"), &provider).await;
        assert_eq!(visible_ids(&session), vec!["242.1"]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let line = session.scene().get(session.outcome().resolution.lines[0]).unwrap();
        assert_eq!(line.points().len(), 3);
        assert!((line.points()[1].lon - 110.121).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_overview_draws_everything_without_routing() {
        let provider = Midpoint::new(false);
        let session = MapSession::render(&dataset(), None, &provider).await;

        assert_eq!(visible_ids(&session), vec!["100", "242.0", "242.1", "242.2"]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.scene().len(), 16);

        let view = session.view();
        assert!(!view.is_hidden());
        assert_eq!(view.zoom(), OVERVIEW_ZOOM);
        assert_eq!(view.opened_popup(), None);
        let fitted = view.fitted().unwrap();
        assert!(fitted.bounds.west < 110.10);
        assert!(fitted.bounds.east > 110.16);
    }

    #[tokio::test]
    async fn test_unknown_query_reveals_without_focus() {
        let provider = Midpoint::new(false);
        let session = MapSession::render(&dataset(), query("999"), &provider).await;

        assert!(visible_ids(&session).is_empty());
        assert!(session.scene().is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert!(!session.outcome().found);

        let view = session.view();
        assert!(!view.is_hidden());
        assert_eq!(view.fitted(), None);
        assert_eq!(view.opened_popup(), None);
        assert_eq!(view.zoom(), DETAIL_ZOOM);
    }

    #[tokio::test]
    async fn test_routing_failure_draws_straight_line() {
        let provider = Midpoint::new(true);
        let data = dataset();
        let session = MapSession::render(&data, query("242.2"), &provider).await;

        assert_eq!(session.outcome().fallbacks, 1);
        let line = session.scene().get(session.outcome().resolution.lines[0]).unwrap();
        let record = &data.records[2];
        assert_eq!(line.points(), &[record.start(), record.end()]);
    }

    #[tokio::test]
    async fn test_markers_follow_dataset_endpoints() {
        let provider = Midpoint::new(false);
        let data = dataset();
        let session = MapSession::render(&data, query("242.1"), &provider).await;

        let markers = &session.outcome().resolution.markers;
        assert_eq!(markers.len(), 2);
        let start = session.scene().get(markers[0]).unwrap();
        assert_eq!(start.points(), &[data.records[1].start()]);
    }

    #[tokio::test]
    async fn test_zoom_and_overlay_round_trip() {
        let provider = Midpoint::new(false);
        let mut session = MapSession::render(&dataset(), query("242.1"), &provider).await;
        let line = session.outcome().resolution.lines[0];

        assert_eq!(session.zoom_to(30), crate::display::MAX_ZOOM);
        let arrow = session.scene().arrow_of(line).unwrap();
        assert!(session.view().is_attached(arrow));

        session.toggle_overlay(Overlay::Roads, false);
        assert!(!session.view().is_attached(line));

        session.zoom_to(13);
        let arrow = session.scene().arrow_of(line).unwrap();
        assert!(!session.view().is_attached(arrow));

        session.toggle_overlay(Overlay::Roads, true);
        assert!(session.view().is_attached(line));
        assert_eq!(session.scene().get(line).unwrap().style().weight, 5.0);
    }

    #[test]
    fn test_overlay_show_refilters_members() {
        let data = dataset();
        let mut session = MapSession::begin(query("242.1"));
        for record in &data.records {
            session.draw(record, RoadGeometry::from_dataset(record));
        }
        session.finish();

        session.toggle_overlay(Overlay::Endpoints, false);
        assert!(session
            .scene()
            .members(Overlay::Endpoints)
            .iter()
            .all(|id| !session.view().is_attached(*id)));

        session.toggle_overlay(Overlay::Endpoints, true);
        let attached: Vec<DrawableId> = session
            .scene()
            .members(Overlay::Endpoints)
            .into_iter()
            .filter(|id| session.view().is_attached(*id))
            .collect();
        assert_eq!(attached, session.outcome().resolution.markers);
        for id in session.scene().members(Overlay::Endpoints) {
            if !attached.contains(&id) {
                assert_eq!(session.scene().get(id).unwrap().style(), Style::HIDDEN);
            }
        }
    }

    #[tokio::test]
    async fn test_overview_roads_reshown_after_zoom() {
        let provider = Midpoint::new(false);
        let mut session = MapSession::render(&dataset(), None, &provider).await;

        session.toggle_overlay(Overlay::Roads, false);
        session.zoom_to(17);
        session.toggle_overlay(Overlay::Roads, true);

        let lines: Vec<DrawableId> = session
            .scene()
            .drawables()
            .filter(|d| d.is_line())
            .map(|d| d.id())
            .collect();
        assert_eq!(lines.len(), 4);
        for line in lines {
            assert!(session.view().is_attached(line));
            assert_eq!(session.scene().get(line).unwrap().style().weight, 3.0);

            let arrow = session.scene().arrow_of(line).unwrap();
            assert!(session.view().is_attached(arrow));
            let style = session.scene().get(arrow).unwrap().style();
            assert_ne!(style, Style::HIDDEN);
            assert_eq!(style.opacity, crate::display::SHOWN_OPACITY);
        }
    }

    #[tokio::test]
    async fn test_overview_zoom_while_roads_hidden_keeps_them_off() {
        let provider = Midpoint::new(false);
        let mut session = MapSession::render(&dataset(), None, &provider).await;

        session.toggle_overlay(Overlay::Roads, false);
        session.zoom_to(15);
        for id in session.scene().members(Overlay::Roads) {
            assert!(!session.view().is_attached(id));
        }
        for id in session.scene().members(Overlay::Endpoints) {
            assert!(session.view().is_attached(id));
        }
    }

    #[test]
    fn test_session_store_evicts_oldest() {
        let store = SessionStore::with_max_sessions(2);
        let first = store.insert(MapSession::begin(None));
        let second = store.insert(MapSession::begin(None));
        let third = store.insert(MapSession::begin(None));

        assert_eq!(store.len(), 2);
        assert!(store.get(&first).is_none());
        assert_eq!(store.list(), vec![second.clone(), third.clone()]);

        assert!(store.remove(&second).is_some());
        let fourth = store.insert(MapSession::begin(None));
        assert_eq!(store.list(), vec![third, fourth]);
    }

    #[test]
    fn test_session_store_bound_is_at_least_one() {
        let store = SessionStore::with_max_sessions(0);
        assert_eq!(store.max_sessions(), 1);
        let id = store.insert(MapSession::begin(None));
        assert_eq!(store.list(), vec![id]);
        assert_eq!(SessionStore::default().max_sessions(), DEFAULT_MAX_SESSIONS);
    }

    #[test]
    fn test_session_store() {
        let store = SessionStore::new();
        assert!(store.is_empty());
        let id = store.insert(MapSession::begin(None));
        assert_eq!(store.len(), 1);
        assert_eq!(store.list(), vec![id.clone()]);
        assert!(store.get(&id).is_some());
        assert!(store.remove(&id).is_some());
        assert!(store.get(&id).is_none());
        assert!(store.remove(&id).is_none());
    }
}
