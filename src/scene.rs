//! Registry of every drawable in one map session.
//!
//! The scene owns the drawables for the session's lifetime and decides
//! their visibility from the session's query. Event handlers take the
//! scene and the surface by `&mut`; nothing is global.

use std::collections::BTreeMap;

use tracing::debug;

use crate::display::{apply_visibility, Drawable, DrawableId, DisplaySurface, Endpoint, LineStyle, Overlay};
use crate::domain::RoadRecord;
use crate::geometry::Bounds;
use crate::popup;
use crate::routing::RoadGeometry;
use crate::ruas::{is_shown, QueryIdentifier};

/// Handles of the drawables created for one road.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoadHandles {
    pub line: DrawableId,
    pub arrow: DrawableId,
    pub start: DrawableId,
    pub end: DrawableId,
}

/// Drawables left visible by a visibility pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub lines: Vec<DrawableId>,
    pub markers: Vec<DrawableId>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.markers.is_empty()
    }
}

/// A line and the arrow decorator currently bound to it.
#[derive(Debug, Clone, Copy)]
struct ArrowBinding {
    line: DrawableId,
    arrow: DrawableId,
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    query: Option<QueryIdentifier>,
    drawables: BTreeMap<DrawableId, Drawable>,
    arrows: Vec<ArrowBinding>,
    next_id: u64,
}

impl Scene {
    pub fn new(query: Option<QueryIdentifier>) -> Self {
        Self {
            query,
            ..Default::default()
        }
    }

    pub fn query(&self) -> Option<&QueryIdentifier> {
        self.query.as_ref()
    }

    fn allocate_id(&mut self) -> DrawableId {
        self.next_id += 1;
        DrawableId(self.next_id)
    }

    /// Draws one road: its line, arrow decorator and endpoint markers.
    ///
    /// Everything is attached first; objects the query does not admit are
    /// then hidden straight away.
    pub fn add_road<S: DisplaySurface + ?Sized>(
        &mut self,
        surface: &mut S,
        record: &RoadRecord,
        geometry: RoadGeometry,
    ) -> RoadHandles {
        let zoom = surface.zoom();
        let identifier = record.identifier.clone();
        let visible = is_shown(self.query.as_ref(), identifier.as_ref());

        let line_id = self.allocate_id();
        let line = Drawable::line(
            line_id,
            record.index,
            identifier.clone(),
            geometry.path,
            popup::road_popup(&record.properties),
            zoom,
        );
        let arrow_id = self.allocate_id();
        let arrow = Drawable::arrow_for(arrow_id, &line, zoom);

        surface.attach(arrow_id);
        surface.attach(line_id);
        self.drawables.insert(line_id, line);
        self.drawables.insert(arrow_id, arrow);
        self.arrows.push(ArrowBinding {
            line: line_id,
            arrow: arrow_id,
        });

        if !visible {
            for id in [line_id, arrow_id] {
                if let Some(drawable) = self.drawables.get_mut(&id) {
                    apply_visibility(surface, drawable, false);
                }
            }
        }

        let mut marker_for = |endpoint: Endpoint, scene: &mut Self| {
            let position = match endpoint {
                Endpoint::Pangkal => record.start(),
                Endpoint::Ujung => record.end(),
            };
            let id = scene.allocate_id();
            let mut marker = Drawable::marker(
                id,
                record.index,
                identifier.clone(),
                position,
                endpoint,
                popup::marker_icon(record, endpoint),
                popup::marker_popup(record, endpoint, position),
            );
            surface.attach(id);
            if !visible {
                apply_visibility(surface, &mut marker, false);
            }
            scene.drawables.insert(id, marker);
            id
        };
        let start = marker_for(Endpoint::Pangkal, self);
        let end = marker_for(Endpoint::Ujung, self);

        debug!(
            no_ruas = record.no_ruas(),
            visible,
            source = ?geometry.source,
            "Drew road"
        );

        RoadHandles {
            line: line_id,
            arrow: arrow_id,
            start,
            end,
        }
    }

    /// Zoom handler: restyles every line and rebuilds every arrow with the
    /// pattern for the new zoom.
    ///
    /// A rebuilt arrow gets a new handle, copies its line's identifier and
    /// is attached exactly when its line is.
    pub fn on_zoom_end<S: DisplaySurface + ?Sized>(&mut self, surface: &mut S, zoom: u8) {
        let line_style = LineStyle::for_zoom(zoom);
        for drawable in self.drawables.values_mut().filter(|d| d.is_line()) {
            drawable.restyle_line(line_style);
        }

        let bindings = std::mem::take(&mut self.arrows);
        for binding in bindings {
            if let Some(old) = self.drawables.remove(&binding.arrow) {
                surface.detach(old.id());
            }
            let arrow_id = self.allocate_id();
            let Some(line) = self.drawables.get(&binding.line) else {
                continue;
            };
            let line_attached = surface.is_attached(line.id());
            let mut arrow = Drawable::arrow_for(arrow_id, line, zoom);
            apply_visibility(surface, &mut arrow, line_attached);

            self.drawables.insert(arrow_id, arrow);
            self.arrows.push(ArrowBinding {
                line: binding.line,
                arrow: arrow_id,
            });
        }
    }

    /// Overlay-add handler: while the overlay is shown, re-applies the
    /// initial-state rule to every drawable of the overlay. Without a query
    /// that shows all of them with their full style.
    pub fn on_overlay_add<S: DisplaySurface + ?Sized>(&mut self, surface: &mut S, overlay: Overlay) {
        if !surface.is_overlay_shown(overlay) {
            return;
        }
        for drawable in self.drawables.values_mut().filter(|d| d.overlay() == overlay) {
            let visible = is_shown(self.query.as_ref(), drawable.identifier());
            apply_visibility(surface, drawable, visible);
        }
    }

    /// Final visibility pass: every drawable is shown or hidden according
    /// to the query. Returns the lines and markers left visible.
    pub fn resolve_visibility<S: DisplaySurface + ?Sized>(&mut self, surface: &mut S) -> Resolution {
        let mut resolution = Resolution::default();
        for drawable in self.drawables.values_mut() {
            let visible = is_shown(self.query.as_ref(), drawable.identifier());
            apply_visibility(surface, drawable, visible);
            if visible {
                if drawable.is_line() {
                    resolution.lines.push(drawable.id());
                } else if drawable.is_marker() {
                    resolution.markers.push(drawable.id());
                }
            }
        }
        resolution
    }

    /// Bounds of the given drawables, `None` when they cover no points.
    pub fn bounds_of(&self, ids: &[DrawableId]) -> Option<Bounds> {
        Bounds::from_points(
            ids.iter()
                .filter_map(|id| self.drawables.get(id))
                .flat_map(|d| d.points().iter().copied()),
        )
    }

    /// Bounds of everything currently attached to the surface.
    pub fn attached_bounds<S: DisplaySurface + ?Sized>(&self, surface: &S) -> Option<Bounds> {
        Bounds::from_points(
            self.drawables
                .values()
                .filter(|d| surface.is_attached(d.id()))
                .flat_map(|d| d.points().iter().copied()),
        )
    }

    pub fn get(&self, id: DrawableId) -> Option<&Drawable> {
        self.drawables.get(&id)
    }

    /// Drawables in creation order.
    pub fn drawables(&self) -> impl Iterator<Item = &Drawable> {
        self.drawables.values()
    }

    /// Handles of every drawable listed under an overlay.
    pub fn members(&self, overlay: Overlay) -> Vec<DrawableId> {
        self.drawables
            .values()
            .filter(|d| d.overlay() == overlay)
            .map(Drawable::id)
            .collect()
    }

    /// Arrow currently bound to a line.
    pub fn arrow_of(&self, line: DrawableId) -> Option<DrawableId> {
        self.arrows.iter().find(|b| b.line == line).map(|b| b.arrow)
    }

    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }
}
