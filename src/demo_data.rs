//! Built-in demo dataset for running without `jalan-kp.json`.
//!
//! A handful of road segments around Wates, Kulon Progo, including the
//! `242.x` variant group used to exercise base and variant queries:
//! - 242.0, 242.1, 242.2 (one road split into three segments)
//! - 100 (unrelated road)
//! - 57 (gravel farm road)

use crate::domain::{Dataset, LonLat, RoadProperties, RoadRecord};

/// Static description of one demo road segment.
struct SegmentData {
    no_ruas: &'static str,
    name: &'static str,
    kapanewon: &'static str,
    kalurahan: &'static str,
    lebar_m: f64,
    hotmix_km: f64,
    kerikil_km: f64,
    tanah_km: f64,
    /// Path as `(lon, lat)` pairs.
    path: &'static [(f64, f64)],
}

const SEGMENTS: &[SegmentData] = &[
    SegmentData {
        no_ruas: "242.0",
        name: "Wates - Kenteng",
        kapanewon: "Wates",
        kalurahan: "Wates",
        lebar_m: 5.0,
        hotmix_km: 1.1,
        kerikil_km: 0.0,
        tanah_km: 0.0,
        path: &[(110.1560, -7.8570), (110.1601, -7.8532), (110.1648, -7.8497)],
    },
    SegmentData {
        no_ruas: "242.1",
        name: "Wates - Kenteng",
        kapanewon: "Wates",
        kalurahan: "Bendungan",
        lebar_m: 4.5,
        hotmix_km: 0.9,
        kerikil_km: 0.4,
        tanah_km: 0.0,
        path: &[(110.1648, -7.8497), (110.1702, -7.8461), (110.1755, -7.8420)],
    },
    SegmentData {
        no_ruas: "242.2",
        name: "Wates - Kenteng",
        kapanewon: "Pengasih",
        kalurahan: "Kedungsari",
        lebar_m: 4.0,
        hotmix_km: 0.5,
        kerikil_km: 0.3,
        tanah_km: 0.2,
        path: &[(110.1755, -7.8420), (110.1790, -7.8372), (110.1821, -7.8330)],
    },
    SegmentData {
        no_ruas: "100",
        name: "Giripeni - Karangwuni",
        kapanewon: "Wates",
        kalurahan: "Giripeni",
        lebar_m: 6.0,
        hotmix_km: 2.3,
        kerikil_km: 0.0,
        tanah_km: 0.0,
        path: &[(110.1452, -7.8661), (110.1503, -7.8702), (110.1567, -7.8748), (110.1620, -7.8790)],
    },
    SegmentData {
        no_ruas: "57",
        name: "Sogan - Kulwaru",
        kapanewon: "Wates",
        kalurahan: "Sogan",
        lebar_m: 3.0,
        hotmix_km: 0.0,
        kerikil_km: 0.8,
        tanah_km: 0.6,
        path: &[(110.1380, -7.8550), (110.1415, -7.8590), (110.1433, -7.8637)],
    },
];

/// Builds the demo dataset.
///
/// ```
/// use ruas_map::demo_data::generate;
/// use ruas_map::ruas::QueryIdentifier;
///
/// let dataset = generate();
/// let query = QueryIdentifier::from_param("242").unwrap();
/// assert_eq!(dataset.matching(&query).count(), 3);
/// ```
pub fn generate() -> Dataset {
    let records = SEGMENTS
        .iter()
        .enumerate()
        .filter_map(|(index, segment)| {
            let coordinates: Vec<LonLat> = segment
                .path
                .iter()
                .map(|&(lon, lat)| LonLat::new(lon, lat))
                .collect();
            let surfaced = segment.hotmix_km + segment.kerikil_km + segment.tanah_km;
            let properties = RoadProperties {
                no_ruas: Some(segment.no_ruas.to_string()),
                name: Some(segment.name.to_string()),
                kapanewon: Some(segment.kapanewon.to_string()),
                kalurahan: Some(segment.kalurahan.to_string()),
                panjang_km: Some((surfaced * 100.0).round() / 100.0),
                lebar_m: Some(segment.lebar_m),
                hotmix_km: Some(segment.hotmix_km),
                kerikil_km: Some(segment.kerikil_km),
                tanah_km: Some(segment.tanah_km),
            };
            RoadRecord::new(index, properties, coordinates)
        })
        .collect();

    Dataset::from_records(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruas::QueryIdentifier;

    #[test]
    fn test_generate() {
        let dataset = generate();
        assert_eq!(dataset.len(), SEGMENTS.len());
        assert_eq!(dataset.skipped, 0);
        assert!(dataset.records.iter().all(|r| r.coordinates.len() >= 2));
    }

    #[test]
    fn test_variant_group() {
        let dataset = generate();
        let query = QueryIdentifier::from_param("242.1").unwrap();
        let matched: Vec<&str> = dataset.matching(&query).map(|r| r.no_ruas()).collect();
        assert_eq!(matched, vec!["242.1"]);

        let query = QueryIdentifier::from_param("242.0").unwrap();
        assert_eq!(dataset.matching(&query).count(), 3);
    }

    #[test]
    fn test_panjang_sums_surfaces() {
        let dataset = generate();
        assert_eq!(dataset.records[2].properties.panjang_km, Some(1.0));
    }
}
