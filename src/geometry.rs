//! Geometry utilities for map rendering.
//!
//! Bounding boxes for view fitting, and Google Polyline encoding for
//! compact transmission of line geometry to the frontend.
//! See: <https://developers.google.com/maps/documentation/utilities/polylinealgorithm>

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::LonLat;

/// Axis-aligned geographic bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Bounds of a single point.
    pub fn of_point(point: LonLat) -> Self {
        Self {
            south: point.lat,
            west: point.lon,
            north: point.lat,
            east: point.lon,
        }
    }

    /// Smallest bounds containing every point, `None` for no points.
    ///
    /// # Examples
    ///
    /// ```
    /// use ruas_map::domain::LonLat;
    /// use ruas_map::geometry::Bounds;
    ///
    /// let bounds = Bounds::from_points([
    ///     LonLat::new(110.15, -7.85),
    ///     LonLat::new(110.25, -7.80),
    /// ])
    /// .unwrap();
    /// assert_eq!(bounds.south, -7.85);
    /// assert_eq!(bounds.east, 110.25);
    ///
    /// assert!(Bounds::from_points([]).is_none());
    /// ```
    pub fn from_points(points: impl IntoIterator<Item = LonLat>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::of_point(first), |bounds, p| bounds.extend(p)))
    }

    /// Grows the bounds to contain `point`.
    pub fn extend(self, point: LonLat) -> Self {
        Self {
            south: self.south.min(point.lat),
            west: self.west.min(point.lon),
            north: self.north.max(point.lat),
            east: self.east.max(point.lon),
        }
    }

    /// Expands the bounds by a ratio of their size on each side
    /// (e.g., 0.1 = 10% on each side).
    pub fn pad(self, ratio: f64) -> Self {
        let lat_pad = (self.north - self.south) * ratio;
        let lon_pad = (self.east - self.west) * ratio;

        Self {
            south: self.south - lat_pad,
            west: self.west - lon_pad,
            north: self.north + lat_pad,
            east: self.east + lon_pad,
        }
    }

    pub fn center(&self) -> LonLat {
        LonLat::new((self.west + self.east) / 2.0, (self.south + self.north) / 2.0)
    }
}

/// Encodes a coordinate path using the Google Polyline Algorithm.
///
/// Points are written latitude first with 5 decimal places of precision,
/// each as the difference from the previous point.
///
/// # Examples
///
/// ```
/// use ruas_map::domain::LonLat;
/// use ruas_map::geometry::encode_polyline;
///
/// let path = [
///     LonLat::new(-120.2, 38.5),
///     LonLat::new(-120.95, 40.7),
///     LonLat::new(-126.453, 43.252),
/// ];
/// assert_eq!(encode_polyline(&path), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
/// assert!(encode_polyline(&[]).is_empty());
/// ```
pub fn encode_polyline(path: &[LonLat]) -> String {
    let mut result = String::new();
    let mut prev_lat = 0i64;
    let mut prev_lon = 0i64;

    for point in path {
        let lat_e5 = (point.lat * 1e5).round() as i64;
        let lon_e5 = (point.lon * 1e5).round() as i64;

        encode_value(lat_e5 - prev_lat, &mut result);
        encode_value(lon_e5 - prev_lon, &mut result);

        prev_lat = lat_e5;
        prev_lon = lon_e5;
    }

    result
}

/// Encodes one signed delta as 5-bit chunks offset into printable ASCII.
fn encode_value(value: i64, output: &mut String) {
    let mut encoded = if value < 0 { !(value << 1) } else { value << 1 };

    while encoded >= 0x20 {
        output.push((((encoded & 0x1f) | 0x20) as u8 + 63) as char);
        encoded >>= 5;
    }
    output.push((encoded as u8 + 63) as char);
}
