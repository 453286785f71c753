//! Domain model for the road segment dataset.
//!
//! # Overview
//!
//! - [`LonLat`]: a GeoJSON position with haversine distance
//! - [`RoadProperties`]: descriptive metadata of one road segment
//! - [`RoadRecord`]: one `LineString` feature, immutable once loaded
//! - [`Dataset`]: every usable record of a `FeatureCollection`
//!
//! Only `LineString` features with at least two positions participate;
//! everything else is counted as skipped.

use std::path::Path;
use std::str::FromStr;

use geojson::{FeatureCollection, GeoJson, JsonObject, JsonValue};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::ruas::{QueryIdentifier, RoadIdentifier};

/// Earth radius in meters for haversine calculation.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Display name used when a feature carries neither `name` nor `Nama_Ruas`.
pub const DEFAULT_ROAD_NAME: &str = "Ruas Jalan";

/// Error type for dataset loading.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The dataset file could not be read.
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The text is not valid GeoJSON.
    #[error("invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    /// The GeoJSON is valid but not a `FeatureCollection`.
    #[error("expected a FeatureCollection, got {0}")]
    NotACollection(&'static str),
}

/// A geographic position in GeoJSON axis order.
///
/// # Examples
///
/// ```
/// use ruas_map::domain::LonLat;
///
/// let wates = LonLat::new(110.1586, -7.8575);
/// let sentolo = LonLat::new(110.2196, -7.8300);
///
/// // Roughly 7 km apart
/// let distance = wates.distance_meters(&sentolo);
/// assert!(distance > 6_000.0 && distance < 8_000.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LonLat {
    /// Longitude in degrees (-180 to 180).
    pub lon: f64,
    /// Latitude in degrees (-90 to 90).
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Leaflet axis order, `[latitude, longitude]`.
    pub fn lat_lng(&self) -> [f64; 2] {
        [self.lat, self.lon]
    }

    /// Great-circle distance in meters using the haversine formula.
    pub fn distance_meters(&self, other: &LonLat) -> f64 {
        if self == other {
            return 0.0;
        }

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_M * c
    }
}

/// Total length of a coordinate path in meters.
pub fn path_length_meters(path: &[LonLat]) -> f64 {
    path.windows(2).map(|w| w[0].distance_meters(&w[1])).sum()
}

/// Descriptive metadata of a road segment.
///
/// Lengths are kilometres, width is metres. Numeric fields accept JSON
/// numbers or numeric strings; anything else reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadProperties {
    /// Raw `no_ruas` text.
    pub no_ruas: Option<String>,
    /// `name`, falling back to `Nama_Ruas`.
    pub name: Option<String>,
    pub kapanewon: Option<String>,
    pub kalurahan: Option<String>,
    pub panjang_km: Option<f64>,
    pub lebar_m: Option<f64>,
    pub hotmix_km: Option<f64>,
    pub kerikil_km: Option<f64>,
    pub tanah_km: Option<f64>,
}

impl RoadProperties {
    /// Reads the known keys out of a GeoJSON property object.
    pub fn from_json(props: &JsonObject) -> Self {
        let text = |key: &str| props.get(key).and_then(json_text);
        let number = |key: &str| props.get(key).and_then(json_number);

        Self {
            no_ruas: text("no_ruas"),
            name: text("name")
                .filter(|s| !s.is_empty())
                .or_else(|| text("Nama_Ruas").filter(|s| !s.is_empty())),
            kapanewon: text("kapanewon"),
            kalurahan: text("kalurahan"),
            panjang_km: number("panjang_km"),
            lebar_m: number("lebar_m"),
            hotmix_km: number("hotmix_km"),
            kerikil_km: number("kerikil_km"),
            tanah_km: number("tanah_km"),
        }
    }

    /// Name shown in popups and marker tooltips.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_ROAD_NAME)
    }
}

/// One road segment of the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadRecord {
    /// Position in [`Dataset::records`].
    pub index: usize,
    /// Identifier parsed from `no_ruas`; `None` when missing or blank.
    pub identifier: Option<RoadIdentifier>,
    pub properties: RoadProperties,
    /// Geometry in dataset order, at least two positions.
    pub coordinates: Vec<LonLat>,
}

impl RoadRecord {
    /// Creates a record. Returns `None` for geometries shorter than two
    /// positions.
    pub fn new(index: usize, properties: RoadProperties, coordinates: Vec<LonLat>) -> Option<Self> {
        if coordinates.len() < 2 {
            return None;
        }
        let identifier = properties.no_ruas.as_deref().and_then(RoadIdentifier::parse);
        Some(Self {
            index,
            identifier,
            properties,
            coordinates,
        })
    }

    /// Start point ("Pangkal").
    pub fn start(&self) -> LonLat {
        self.coordinates[0]
    }

    /// End point ("Ujung").
    pub fn end(&self) -> LonLat {
        self.coordinates[self.coordinates.len() - 1]
    }

    /// `no_ruas` as displayed, empty when absent.
    pub fn no_ruas(&self) -> &str {
        self.properties.no_ruas.as_deref().unwrap_or_default()
    }

    pub fn display_name(&self) -> &str {
        self.properties.display_name()
    }
}

/// All usable road records of one dataset.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<RoadRecord>,
    /// Features that were not a usable `LineString`.
    pub skipped: usize,
}

impl Dataset {
    /// Wraps already built records, re-indexing them in order.
    pub fn from_records(records: Vec<RoadRecord>) -> Self {
        let records = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| RoadRecord { index, ..record })
            .collect();
        Self { records, skipped: 0 }
    }

    /// Parses a GeoJSON `FeatureCollection`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ruas_map::domain::Dataset;
    ///
    /// let text = r#"{
    ///   "type": "FeatureCollection",
    ///   "features": [
    ///     {"type": "Feature",
    ///      "properties": {"no_ruas": 242.1, "name": "Wates - Kenteng"},
    ///      "geometry": {"type": "LineString", "coordinates": [[110.15, -7.85], [110.16, -7.84]]}},
    ///     {"type": "Feature", "properties": {},
    ///      "geometry": {"type": "Point", "coordinates": [110.15, -7.85]}}
    ///   ]
    /// }"#;
    ///
    /// let dataset = Dataset::from_geojson_str(text).unwrap();
    /// assert_eq!(dataset.records.len(), 1);
    /// assert_eq!(dataset.skipped, 1);
    /// assert_eq!(dataset.records[0].no_ruas(), "242.1");
    /// ```
    pub fn from_geojson_str(text: &str) -> Result<Self, DatasetError> {
        let geojson = GeoJson::from_str(text)?;
        let collection = match geojson {
            GeoJson::FeatureCollection(collection) => collection,
            GeoJson::Feature(_) => return Err(DatasetError::NotACollection("Feature")),
            GeoJson::Geometry(_) => return Err(DatasetError::NotACollection("Geometry")),
        };
        Ok(Self::from_collection(&collection))
    }

    /// Builds the dataset from a parsed collection, skipping unusable features.
    pub fn from_collection(collection: &FeatureCollection) -> Self {
        let mut records = Vec::new();
        let mut skipped = 0;

        for (feature_idx, feature) in collection.features.iter().enumerate() {
            let Some(geometry) = feature.geometry.as_ref() else {
                skipped += 1;
                continue;
            };
            let geojson::Value::LineString(positions) = &geometry.value else {
                debug!(feature_idx, "Skipping non-LineString feature");
                skipped += 1;
                continue;
            };

            let coordinates: Vec<LonLat> = positions
                .iter()
                .filter_map(|p| match p.as_slice() {
                    [lon, lat, ..] => Some(LonLat::new(*lon, *lat)),
                    _ => None,
                })
                .collect();

            let properties = feature
                .properties
                .as_ref()
                .map(RoadProperties::from_json)
                .unwrap_or_default();

            match RoadRecord::new(records.len(), properties, coordinates) {
                Some(record) => records.push(record),
                None => {
                    debug!(feature_idx, "Skipping LineString with fewer than 2 positions");
                    skipped += 1;
                }
            }
        }

        Self { records, skipped }
    }

    /// Reads and parses a dataset file.
    pub async fn load(path: &Path) -> Result<Self, DatasetError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DatasetError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let dataset = Self::from_geojson_str(&text)?;
        info!(
            path = %path.display(),
            records = dataset.records.len(),
            skipped = dataset.skipped,
            "Loaded road dataset"
        );
        Ok(dataset)
    }

    /// Records admitted by a query, in dataset order.
    pub fn matching<'a, 'q>(&'a self, query: &'q QueryIdentifier) -> impl Iterator<Item = &'a RoadRecord> + 'q
    where
        'a: 'q,
    {
        self.records
            .iter()
            .filter(move |r| query.admits(r.identifier.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Renders a JSON scalar as display text.
///
/// Integral floats drop their fraction (`242.0` reads as `"242"`), the
/// way the dataset's numbers are written by the spreadsheet export.
fn json_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => {
            if n.is_f64() {
                n.as_f64().map(format_number)
            } else {
                Some(n.to_string())
            }
        }
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

fn json_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

/// Formats a number the way it is shown to users: no trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(features: &str) -> String {
        format!(r#"{{"type": "FeatureCollection", "features": [{features}]}}"#)
    }

    fn line_feature(props: &str, coords: &str) -> String {
        format!(
            r#"{{"type": "Feature", "properties": {props}, "geometry": {{"type": "LineString", "coordinates": {coords}}}}}"#
        )
    }

    #[test]
    fn test_skips_unusable_features() {
        let text = collection(&[
            line_feature(r#"{"no_ruas": "242"}"#, "[[110.1, -7.8], [110.2, -7.9]]"),
            line_feature(r#"{"no_ruas": "243"}"#, "[[110.1, -7.8]]"),
            r#"{"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [110.1, -7.8]}}"#.to_string(),
            r#"{"type": "Feature", "properties": {}, "geometry": null}"#.to_string(),
        ]
        .join(","));

        let dataset = Dataset::from_geojson_str(&text).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.skipped, 3);
        assert_eq!(dataset.records[0].index, 0);
        assert_eq!(dataset.records[0].no_ruas(), "242");
    }

    #[test]
    fn test_identifier_forms() {
        let text = collection(&[
            line_feature(r#"{"no_ruas": 242.1}"#, "[[0, 0], [1, 1]]"),
            line_feature(r#"{"no_ruas": 242.0}"#, "[[0, 0], [1, 1]]"),
            line_feature(r#"{"no_ruas": 100}"#, "[[0, 0], [1, 1]]"),
            line_feature(r#"{"no_ruas": null}"#, "[[0, 0], [1, 1]]"),
            line_feature(r#"{"no_ruas": " "}"#, "[[0, 0], [1, 1]]"),
            line_feature("null", "[[0, 0], [1, 1]]"),
        ]
        .join(","));

        let dataset = Dataset::from_geojson_str(&text).unwrap();
        let ids: Vec<Option<&str>> = dataset
            .records
            .iter()
            .map(|r| r.identifier.as_ref().map(|id| id.normalized()))
            .collect();
        assert_eq!(ids, vec![Some("242.1"), Some("242"), Some("100"), None, None, None]);
    }

    #[test]
    fn test_properties_parsing() {
        let text = collection(&[line_feature(
            r#"{"no_ruas": "7", "Nama_Ruas": "Brosot - Galur", "kapanewon": "Galur",
                "panjang_km": "2,5", "lebar_m": 4, "hotmix_km": 1.5, "kerikil_km": null}"#,
            "[[110.2, -7.9], [110.21, -7.91], [110.22, -7.92]]",
        )]
        .join(","));

        let dataset = Dataset::from_geojson_str(&text).unwrap();
        let record = &dataset.records[0];
        assert_eq!(record.display_name(), "Brosot - Galur");
        assert_eq!(record.properties.kapanewon.as_deref(), Some("Galur"));
        assert_eq!(record.properties.kalurahan, None);
        assert_eq!(record.properties.panjang_km, Some(2.5));
        assert_eq!(record.properties.lebar_m, Some(4.0));
        assert_eq!(record.properties.hotmix_km, Some(1.5));
        assert_eq!(record.properties.kerikil_km, None);
        assert_eq!(record.start(), LonLat::new(110.2, -7.9));
        assert_eq!(record.end(), LonLat::new(110.22, -7.92));
    }

    #[test]
    fn test_name_fallbacks() {
        let props = RoadProperties::default();
        assert_eq!(props.display_name(), DEFAULT_ROAD_NAME);

        let text = collection(&[line_feature(
            r#"{"name": "", "Nama_Ruas": "Sentolo - Nanggulan"}"#,
            "[[0, 0], [1, 1]]",
        )]
        .join(","));
        let dataset = Dataset::from_geojson_str(&text).unwrap();
        assert_eq!(dataset.records[0].display_name(), "Sentolo - Nanggulan");
    }

    #[test]
    fn test_rejects_non_collections() {
        let feature = line_feature("{}", "[[0, 0], [1, 1]]");
        assert!(matches!(
            Dataset::from_geojson_str(&feature),
            Err(DatasetError::NotACollection("Feature"))
        ));
        assert!(matches!(
            Dataset::from_geojson_str("not json"),
            Err(DatasetError::GeoJson(_))
        ));
    }

    #[test]
    fn test_matching_records() {
        let text = collection(&[
            line_feature(r#"{"no_ruas": "242.0"}"#, "[[0, 0], [1, 1]]"),
            line_feature(r#"{"no_ruas": "242.1"}"#, "[[0, 0], [1, 1]]"),
            line_feature(r#"{"no_ruas": "100"}"#, "[[0, 0], [1, 1]]"),
        ]
        .join(","));
        let dataset = Dataset::from_geojson_str(&text).unwrap();
        let query = QueryIdentifier::from_param("242").unwrap();
        let matched: Vec<&str> = dataset.matching(&query).map(|r| r.no_ruas()).collect();
        assert_eq!(matched, vec!["242.0", "242.1"]);

        // Matched records borrow the dataset only, not the query.
        let records: Vec<&RoadRecord> = {
            let variant = QueryIdentifier::from_param("242.1").unwrap();
            dataset.matching(&variant).collect()
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].no_ruas(), "242.1");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = Dataset::load(Path::new("definitely/not/here.json")).await;
        assert!(matches!(result, Err(DatasetError::Io { .. })));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(242.0), "242");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.1), "0.1");
    }

    #[test]
    fn test_path_length() {
        let path = [LonLat::new(0.0, 0.0), LonLat::new(1.0, 0.0), LonLat::new(2.0, 0.0)];
        let length = path_length_meters(&path);
        assert!(length > 220_000.0 && length < 224_000.0);
        assert_eq!(path_length_meters(&path[..1]), 0.0);
    }
}
