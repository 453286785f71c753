//! Drawable objects and their presentation state.
//!
//! A road record is displayed as a [`DrawableKind::Line`], a directional
//! [`DrawableKind::Arrow`] decorator bound to that line, and two
//! [`DrawableKind::Marker`]s for its endpoints. Every drawable carries a
//! copy of its record's identifier so filters never look it up again.
//!
//! The map host is abstracted as a [`DisplaySurface`]; [`MapView`] is the
//! in-memory surface whose state is serialized to the web frontend.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::LonLat;
use crate::geometry::Bounds;
use crate::ruas::RoadIdentifier;

/// Stroke and fill color of road lines and arrows.
pub const ROAD_COLOR: &str = "#ff6b35";

/// Opacity of a shown line or arrow.
pub const SHOWN_OPACITY: f64 = 0.9;

/// Opacity of a shown marker.
pub const MARKER_OPACITY: f64 = 1.0;

/// Highest zoom the base tiles support.
pub const MAX_ZOOM: u8 = 19;

/// Rendered style of a drawable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub opacity: f64,
    pub fill_opacity: f64,
    pub weight: f64,
}

impl Style {
    /// Collapsed style of a hidden object; zero weight also removes the
    /// hover hit area.
    pub const HIDDEN: Style = Style {
        opacity: 0.0,
        fill_opacity: 0.0,
        weight: 0.0,
    };

    pub fn is_hidden(&self) -> bool {
        *self == Self::HIDDEN
    }
}

/// Zoom-dependent line style: thinner lines when zoomed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub weight: f64,
    pub opacity: f64,
}

impl LineStyle {
    /// ```
    /// use ruas_map::display::LineStyle;
    ///
    /// assert_eq!(LineStyle::for_zoom(18).weight, 3.0);
    /// assert_eq!(LineStyle::for_zoom(12).weight, 5.0);
    /// assert_eq!(LineStyle::for_zoom(8).weight, 6.0);
    /// ```
    pub fn for_zoom(zoom: u8) -> Self {
        let (weight, opacity) = match zoom {
            16.. => (3.0, 0.8),
            14..=15 => (4.0, 0.85),
            12..=13 => (5.0, 0.9),
            _ => (6.0, 0.9),
        };
        Self { weight, opacity }
    }
}

/// Arrow-head pattern of a direction decorator. Spacing depends on zoom,
/// which is why decorators are rebuilt whenever the zoom changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArrowPattern {
    /// First arrow position along the line, percent of its length.
    pub offset_percent: f64,
    /// Arrow spacing, percent of the line length.
    pub repeat_percent: f64,
    pub pixel_size: f64,
    pub weight: f64,
}

impl ArrowPattern {
    pub fn for_zoom(zoom: u8) -> Self {
        let (pixel_size, weight, repeat_percent) = match zoom {
            16.. => (8.0, 1.5, 20.0),
            14..=15 => (10.0, 2.0, 18.0),
            12..=13 => (12.0, 2.0, 15.0),
            _ => (14.0, 2.5, 12.0),
        };
        Self {
            offset_percent: 10.0,
            repeat_percent,
            pixel_size,
            weight,
        }
    }
}

/// Stable handle of a drawable within one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DrawableId(pub u64);

/// Which end of a road a marker sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Start of the geometry.
    Pangkal,
    /// End of the geometry.
    Ujung,
}

impl Endpoint {
    pub fn label(self) -> &'static str {
        match self {
            Endpoint::Pangkal => "Pangkal",
            Endpoint::Ujung => "Ujung",
        }
    }

    /// CSS class and popup-id fragment.
    pub fn slug(self) -> &'static str {
        match self {
            Endpoint::Pangkal => "pangkal",
            Endpoint::Ujung => "ujung",
        }
    }
}

/// Toggleable overlay group of the layer control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Overlay {
    /// Lines and their arrows ("Ruas Jalan").
    Roads,
    /// Start and end markers ("Titik Pangkal & Ujung").
    Endpoints,
}

impl Overlay {
    pub const ALL: [Overlay; 2] = [Overlay::Roads, Overlay::Endpoints];

    pub fn label(self) -> &'static str {
        match self {
            Overlay::Roads => "Ruas Jalan",
            Overlay::Endpoints => "Titik Pangkal & Ujung",
        }
    }
}

/// Shape-specific data of a drawable.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawableKind {
    Line {
        path: Vec<LonLat>,
        popup: String,
    },
    Arrow {
        line: DrawableId,
        pattern: ArrowPattern,
    },
    Marker {
        position: LonLat,
        endpoint: Endpoint,
        icon: String,
        popup: String,
    },
}

/// A displayable derived from one road record.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    id: DrawableId,
    record: usize,
    identifier: Option<RoadIdentifier>,
    kind: DrawableKind,
    style: Style,
    /// Zoom-derived stroke weight restored when the object is shown.
    nominal_weight: f64,
}

impl Drawable {
    pub fn line(
        id: DrawableId,
        record: usize,
        identifier: Option<RoadIdentifier>,
        path: Vec<LonLat>,
        popup: String,
        zoom: u8,
    ) -> Self {
        let line_style = LineStyle::for_zoom(zoom);
        Self {
            id,
            record,
            identifier,
            kind: DrawableKind::Line { path, popup },
            style: Style {
                opacity: line_style.opacity,
                fill_opacity: line_style.opacity,
                weight: line_style.weight,
            },
            nominal_weight: line_style.weight,
        }
    }

    /// Builds the arrow decorator of `line` for the given zoom. The arrow
    /// inherits the line's record and identifier.
    pub fn arrow_for(id: DrawableId, line: &Drawable, zoom: u8) -> Self {
        let pattern = ArrowPattern::for_zoom(zoom);
        Self {
            id,
            record: line.record,
            identifier: line.identifier.clone(),
            kind: DrawableKind::Arrow {
                line: line.id,
                pattern,
            },
            style: Style {
                opacity: SHOWN_OPACITY,
                fill_opacity: SHOWN_OPACITY,
                weight: pattern.weight,
            },
            nominal_weight: pattern.weight,
        }
    }

    pub fn marker(
        id: DrawableId,
        record: usize,
        identifier: Option<RoadIdentifier>,
        position: LonLat,
        endpoint: Endpoint,
        icon: String,
        popup: String,
    ) -> Self {
        Self {
            id,
            record,
            identifier,
            kind: DrawableKind::Marker {
                position,
                endpoint,
                icon,
                popup,
            },
            style: Style {
                opacity: MARKER_OPACITY,
                fill_opacity: MARKER_OPACITY,
                weight: 0.0,
            },
            nominal_weight: 0.0,
        }
    }

    pub fn id(&self) -> DrawableId {
        self.id
    }

    /// Index of the originating record in the dataset.
    pub fn record(&self) -> usize {
        self.record
    }

    /// Identifier copied from the originating record.
    pub fn identifier(&self) -> Option<&RoadIdentifier> {
        self.identifier.as_ref()
    }

    pub fn kind(&self) -> &DrawableKind {
        &self.kind
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    /// Overlay group the drawable is listed under.
    pub fn overlay(&self) -> Overlay {
        match self.kind {
            DrawableKind::Line { .. } | DrawableKind::Arrow { .. } => Overlay::Roads,
            DrawableKind::Marker { .. } => Overlay::Endpoints,
        }
    }

    pub fn is_line(&self) -> bool {
        matches!(self.kind, DrawableKind::Line { .. })
    }

    pub fn is_marker(&self) -> bool {
        matches!(self.kind, DrawableKind::Marker { .. })
    }

    /// Points covered by the drawable, for bounds fitting. Arrows cover
    /// nothing of their own.
    pub fn points(&self) -> &[LonLat] {
        match &self.kind {
            DrawableKind::Line { path, .. } => path,
            DrawableKind::Marker { position, .. } => std::slice::from_ref(position),
            DrawableKind::Arrow { .. } => &[],
        }
    }

    pub fn popup(&self) -> Option<&str> {
        match &self.kind {
            DrawableKind::Line { popup, .. } | DrawableKind::Marker { popup, .. } => Some(popup),
            DrawableKind::Arrow { .. } => None,
        }
    }

    /// Full-visibility style for this shape: lines and arrows get stroke
    /// and fill opacity back, markers get their opacity back.
    fn shown_style(&self) -> Style {
        match self.kind {
            DrawableKind::Line { .. } | DrawableKind::Arrow { .. } => Style {
                opacity: SHOWN_OPACITY,
                fill_opacity: SHOWN_OPACITY,
                weight: self.nominal_weight,
            },
            DrawableKind::Marker { .. } => Style {
                opacity: MARKER_OPACITY,
                fill_opacity: MARKER_OPACITY,
                weight: 0.0,
            },
        }
    }

    /// Applies a zoom change to a line: records the new nominal weight and,
    /// unless collapsed, restyles weight and opacity. Detached lines of a
    /// hidden overlay are not collapsed and follow the zoom too.
    pub(crate) fn restyle_line(&mut self, line_style: LineStyle) {
        self.nominal_weight = line_style.weight;
        if self.style != Style::HIDDEN {
            self.style.weight = line_style.weight;
            self.style.opacity = line_style.opacity;
        }
    }
}

/// Options for fitting the view to bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FitOptions {
    /// Pixel padding kept around the bounds.
    pub padding: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<u8>,
}

/// The map host a scene draws on.
///
/// Event subscription is inverted: the host reports zoom and overlay
/// changes by calling [`Scene::on_zoom_end`](crate::scene::Scene::on_zoom_end)
/// and [`Scene::on_overlay_add`](crate::scene::Scene::on_overlay_add).
pub trait DisplaySurface {
    /// Puts a drawable on the map. Attaching twice is a no-op.
    fn attach(&mut self, id: DrawableId);
    /// Takes a drawable off the map. Detaching twice is a no-op.
    fn detach(&mut self, id: DrawableId);
    fn is_attached(&self, id: DrawableId) -> bool;
    fn zoom(&self) -> u8;
    fn is_overlay_shown(&self, overlay: Overlay) -> bool;
    fn fit_bounds(&mut self, bounds: Bounds, options: FitOptions);
    fn open_popup(&mut self, id: DrawableId);
    /// Un-hides the map container.
    fn reveal(&mut self);
}

/// Shows or hides a drawable on a surface.
///
/// Showing attaches the object if needed and restores its full-visibility
/// style. Hiding collapses the style to zero and then detaches; both steps
/// run whatever the current attachment. Geometry is never touched.
///
/// # Examples
///
/// ```
/// use ruas_map::display::{apply_visibility, Drawable, DrawableId, DisplaySurface, MapView, Style};
/// use ruas_map::domain::LonLat;
///
/// let mut view = MapView::new(LonLat::new(110.156, -7.826), 12);
/// let path = vec![LonLat::new(110.15, -7.85), LonLat::new(110.16, -7.84)];
/// let mut line = Drawable::line(DrawableId(1), 0, None, path, String::new(), 12);
///
/// apply_visibility(&mut view, &mut line, true);
/// assert!(view.is_attached(line.id()));
/// assert_eq!(line.style().opacity, 0.9);
///
/// apply_visibility(&mut view, &mut line, false);
/// assert!(!view.is_attached(line.id()));
/// assert_eq!(line.style(), Style::HIDDEN);
/// ```
pub fn apply_visibility<S: DisplaySurface + ?Sized>(surface: &mut S, drawable: &mut Drawable, visible: bool) {
    if visible {
        if !surface.is_attached(drawable.id()) {
            surface.attach(drawable.id());
        }
        drawable.set_style(drawable.shown_style());
    } else {
        drawable.set_style(Style::HIDDEN);
        surface.detach(drawable.id());
    }
}

/// A view fit request recorded by [`MapView`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FittedBounds {
    pub bounds: Bounds,
    pub options: FitOptions,
}

/// In-memory display surface.
///
/// Records what a Leaflet map would show; the frontend replays it.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    center: LonLat,
    zoom: u8,
    hidden: bool,
    layer_control: bool,
    shown_overlays: BTreeSet<Overlay>,
    attached: BTreeSet<DrawableId>,
    fitted: Option<FittedBounds>,
    open_popup: Option<DrawableId>,
}

impl MapView {
    /// Creates a visible view with both overlays shown and no layer control.
    pub fn new(center: LonLat, zoom: u8) -> Self {
        Self {
            center,
            zoom: zoom.min(MAX_ZOOM),
            hidden: false,
            layer_control: false,
            shown_overlays: Overlay::ALL.into_iter().collect(),
            attached: BTreeSet::new(),
            fitted: None,
            open_popup: None,
        }
    }

    /// Creates a view whose container stays hidden until revealed.
    pub fn hidden(center: LonLat, zoom: u8) -> Self {
        Self {
            hidden: true,
            ..Self::new(center, zoom)
        }
    }

    pub fn center(&self) -> LonLat {
        self.center
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn has_layer_control(&self) -> bool {
        self.layer_control
    }

    pub fn attach_layer_control(&mut self) {
        self.layer_control = true;
    }

    /// Records a zoom change, clamped to the tile range. Returns the
    /// applied zoom.
    pub fn set_zoom(&mut self, zoom: u8) -> u8 {
        self.zoom = zoom.min(MAX_ZOOM);
        self.zoom
    }

    pub fn set_overlay_shown(&mut self, overlay: Overlay, shown: bool) {
        if shown {
            self.shown_overlays.insert(overlay);
        } else {
            self.shown_overlays.remove(&overlay);
        }
    }

    pub fn attached(&self) -> impl Iterator<Item = DrawableId> + '_ {
        self.attached.iter().copied()
    }

    pub fn fitted(&self) -> Option<FittedBounds> {
        self.fitted
    }

    pub fn opened_popup(&self) -> Option<DrawableId> {
        self.open_popup
    }
}

impl DisplaySurface for MapView {
    fn attach(&mut self, id: DrawableId) {
        self.attached.insert(id);
    }

    fn detach(&mut self, id: DrawableId) {
        self.attached.remove(&id);
        if self.open_popup == Some(id) {
            self.open_popup = None;
        }
    }

    fn is_attached(&self, id: DrawableId) -> bool {
        self.attached.contains(&id)
    }

    fn zoom(&self) -> u8 {
        self.zoom
    }

    fn is_overlay_shown(&self, overlay: Overlay) -> bool {
        self.shown_overlays.contains(&overlay)
    }

    fn fit_bounds(&mut self, bounds: Bounds, options: FitOptions) {
        self.center = bounds.center();
        if let Some(max_zoom) = options.max_zoom {
            self.zoom = self.zoom.min(max_zoom);
        }
        self.fitted = Some(FittedBounds { bounds, options });
    }

    fn open_popup(&mut self, id: DrawableId) {
        self.open_popup = Some(id);
    }

    fn reveal(&mut self) {
        self.hidden = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> MapView {
        MapView::new(LonLat::new(110.156, -7.826), 14)
    }

    fn line(id: u64) -> Drawable {
        Drawable::line(
            DrawableId(id),
            0,
            RoadIdentifier::parse("242.1"),
            vec![LonLat::new(110.15, -7.85), LonLat::new(110.16, -7.84)],
            "<div></div>".to_string(),
            14,
        )
    }

    fn marker(id: u64) -> Drawable {
        Drawable::marker(
            DrawableId(id),
            0,
            RoadIdentifier::parse("242.1"),
            LonLat::new(110.15, -7.85),
            Endpoint::Pangkal,
            String::new(),
            String::new(),
        )
    }

    #[test]
    fn test_line_style_thresholds() {
        assert_eq!(LineStyle::for_zoom(19), LineStyle { weight: 3.0, opacity: 0.8 });
        assert_eq!(LineStyle::for_zoom(16), LineStyle { weight: 3.0, opacity: 0.8 });
        assert_eq!(LineStyle::for_zoom(15), LineStyle { weight: 4.0, opacity: 0.85 });
        assert_eq!(LineStyle::for_zoom(14), LineStyle { weight: 4.0, opacity: 0.85 });
        assert_eq!(LineStyle::for_zoom(13), LineStyle { weight: 5.0, opacity: 0.9 });
        assert_eq!(LineStyle::for_zoom(11), LineStyle { weight: 6.0, opacity: 0.9 });
    }

    #[test]
    fn test_arrow_pattern_thresholds() {
        let near = ArrowPattern::for_zoom(17);
        assert_eq!((near.pixel_size, near.weight, near.repeat_percent), (8.0, 1.5, 20.0));
        let mid = ArrowPattern::for_zoom(14);
        assert_eq!((mid.pixel_size, mid.weight, mid.repeat_percent), (10.0, 2.0, 18.0));
        let far = ArrowPattern::for_zoom(3);
        assert_eq!((far.pixel_size, far.weight, far.repeat_percent), (14.0, 2.5, 12.0));
        assert_eq!(far.offset_percent, 10.0);
    }

    #[test]
    fn test_show_is_idempotent() {
        let mut surface = view();
        let mut once = line(1);
        apply_visibility(&mut surface, &mut once, true);
        let state_once = (surface.clone(), once.clone());

        apply_visibility(&mut surface, &mut once, true);
        assert_eq!((surface, once), state_once);
    }

    #[test]
    fn test_hidden_round_trip_matches_direct_hide() {
        let mut direct_surface = view();
        let mut direct = line(1);
        apply_visibility(&mut direct_surface, &mut direct, false);

        let mut surface = view();
        let mut toggled = line(1);
        apply_visibility(&mut surface, &mut toggled, false);
        apply_visibility(&mut surface, &mut toggled, true);
        apply_visibility(&mut surface, &mut toggled, false);

        assert_eq!(toggled.style(), direct.style());
        assert_eq!(surface.is_attached(toggled.id()), direct_surface.is_attached(direct.id()));
        assert!(toggled.style().is_hidden());
    }

    #[test]
    fn test_show_restores_zoom_weight() {
        let mut surface = view();
        let mut l = line(1);
        apply_visibility(&mut surface, &mut l, false);
        apply_visibility(&mut surface, &mut l, true);
        assert_eq!(
            l.style(),
            Style {
                opacity: 0.9,
                fill_opacity: 0.9,
                weight: 4.0
            }
        );
    }

    #[test]
    fn test_hide_detached_object() {
        let mut surface = view();
        let mut m = marker(7);
        assert!(!surface.is_attached(m.id()));
        apply_visibility(&mut surface, &mut m, false);
        assert!(!surface.is_attached(m.id()));
        assert!(m.style().is_hidden());
    }

    #[test]
    fn test_marker_shown_style() {
        let mut surface = view();
        let mut m = marker(7);
        apply_visibility(&mut surface, &mut m, false);
        apply_visibility(&mut surface, &mut m, true);
        assert_eq!(m.style().opacity, 1.0);
        assert!(surface.is_attached(m.id()));
    }

    #[test]
    fn test_geometry_untouched_by_visibility() {
        let mut surface = view();
        let mut l = line(1);
        let before = l.points().to_vec();
        apply_visibility(&mut surface, &mut l, false);
        apply_visibility(&mut surface, &mut l, true);
        assert_eq!(l.points(), before.as_slice());
    }

    #[test]
    fn test_arrow_inherits_identifier() {
        let l = line(1);
        let arrow = Drawable::arrow_for(DrawableId(2), &l, 18);
        assert_eq!(arrow.identifier(), l.identifier());
        assert_eq!(arrow.record(), l.record());
        assert_eq!(arrow.overlay(), Overlay::Roads);
        assert!(arrow.points().is_empty());
    }

    #[test]
    fn test_map_view_fit_caps_zoom() {
        let mut surface = MapView::hidden(LonLat::new(110.156, -7.826), 19);
        let bounds = Bounds::of_point(LonLat::new(110.2, -7.9));
        surface.fit_bounds(
            bounds,
            FitOptions {
                padding: 30,
                max_zoom: Some(18),
            },
        );
        assert_eq!(surface.zoom(), 18);
        assert_eq!(surface.center(), LonLat::new(110.2, -7.9));
        assert!(surface.is_hidden());
        surface.reveal();
        assert!(!surface.is_hidden());
    }

    #[test]
    fn test_detach_closes_popup() {
        let mut surface = view();
        surface.attach(DrawableId(3));
        surface.open_popup(DrawableId(3));
        surface.detach(DrawableId(3));
        assert_eq!(surface.opened_popup(), None);
    }
}
