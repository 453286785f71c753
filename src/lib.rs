//! Road segment ("ruas jalan") map service.
//!
//! Loads a GeoJSON dataset of road segments and renders it as lines with
//! direction arrows and start/end markers. When a road number is
//! requested, only the matching segments are shown, drawn along the route
//! OSRM finds between their endpoints, and the view focuses on them.
//!
//! # Road numbers
//!
//! - [`normalize`](ruas::normalize): strips whitespace and lower-cases
//! - [`matches`](ruas::matches): a base number (`242`, `242.0`) selects
//!   its whole group, a variant (`242.1`) selects only itself
//! - [`apply_visibility`](display::apply_visibility): shows or hides one
//!   drawable on a [`DisplaySurface`](display::DisplaySurface)
//!
//! # Rendering
//!
//! - [`Scene`](scene::Scene): every drawable of a session, with the zoom
//!   and overlay event handlers
//! - [`MapSession`](session::MapSession): phased rendering of one query
//! - [`api`]: axum router serving scenes to the Leaflet frontend

pub mod api;
pub mod config;
pub mod console;
pub mod demo_data;
pub mod display;
pub mod domain;
pub mod dto;
pub mod geometry;
pub mod popup;
pub mod routing;
pub mod ruas;
pub mod scene;
pub mod session;
