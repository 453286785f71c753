//! HTML fragments for road popups and endpoint markers.
//!
//! Markup and CSS class names follow the frontend stylesheet in
//! `static/style.css`. Every interpolated value is HTML-escaped.

use std::fmt::Write;

use crate::display::Endpoint;
use crate::domain::{format_number, LonLat, RoadProperties, RoadRecord};

/// Label used on markers of roads without number or name.
const FALLBACK_LABEL: &str = "Ruas";

/// Escapes text for use inside HTML content and attribute values.
///
/// ```
/// use ruas_map::popup::escape_html;
///
/// assert_eq!(escape_html(r#"Jl. "Wates" <1> & 2"#), "Jl. &quot;Wates&quot; &lt;1&gt; &amp; 2");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Popup of a road line: name, administrative area, dimensions and the
/// surface composition.
pub fn road_popup(props: &RoadProperties) -> String {
    let mut html = format!(
        "<div class=\"popup-content\"><div class=\"popup-title\">{}</div><div class=\"popup-detail\">",
        escape_html(props.display_name())
    );

    if let Some(no_ruas) = &props.no_ruas {
        let _ = write!(html, "<strong>No Ruas:</strong> {}<br />", escape_html(no_ruas));
    }
    if let Some(kapanewon) = props.kapanewon.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(html, "<strong>Kapanewon:</strong> {}<br />", escape_html(kapanewon));
    }
    if let Some(kalurahan) = props.kalurahan.as_deref().filter(|s| !s.is_empty()) {
        let _ = write!(html, "<strong>Kalurahan:</strong> {}<br />", escape_html(kalurahan));
    }
    if let Some(panjang) = props.panjang_km.filter(|v| *v != 0.0) {
        let _ = write!(html, "<strong>Panjang:</strong> {} km<br />", format_number(panjang));
    }
    if let Some(lebar) = props.lebar_m.filter(|v| *v != 0.0) {
        let _ = write!(html, "<strong>Lebar:</strong> {} m<br />", format_number(lebar));
    }

    let surfaces = surface_breakdown(props);
    if !surfaces.is_empty() {
        html.push_str("<br /><strong>Tipe Perkerasan:</strong><br />");
        html.push_str(&surfaces.join("<br />"));
    }

    html.push_str("</div></div>");
    html
}

/// Positive surface lengths as `• Hotmix: 1.2 km` lines.
fn surface_breakdown(props: &RoadProperties) -> Vec<String> {
    [
        ("Hotmix", props.hotmix_km),
        ("Kerikil", props.kerikil_km),
        ("Tanah", props.tanah_km),
    ]
    .into_iter()
    .filter_map(|(label, km)| {
        km.filter(|v| *v > 0.0)
            .map(|v| format!("• {}: {} km", label, format_number(v)))
    })
    .collect()
}

/// Icon markup of an endpoint marker: a pin plus the road number label.
pub fn marker_icon(record: &RoadRecord, endpoint: Endpoint) -> String {
    let label = if record.no_ruas().is_empty() {
        record.properties.name.as_deref().unwrap_or(FALLBACK_LABEL)
    } else {
        record.no_ruas()
    };
    let tooltip = format!(
        "{} (Titik {})",
        record.properties.name.as_deref().unwrap_or(FALLBACK_LABEL),
        endpoint.label()
    );

    format!(
        "<div class=\"marker-container\" title=\"{tooltip}\"><div class=\"marker-pin {class}\"></div><div class=\"marker-label {class}\">{label}</div></div>",
        tooltip = escape_html(&tooltip),
        class = endpoint.slug(),
        label = escape_html(label),
    )
}

/// Element id of an endpoint popup; the detail toggle targets `{id}-detail`.
pub fn marker_popup_id(record: &RoadRecord, endpoint: Endpoint) -> String {
    let no_ruas: String = record
        .no_ruas()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    format!("popup-{}-{}", endpoint.slug(), no_ruas)
}

/// Popup of an endpoint marker with a collapsible detail section.
pub fn marker_popup(record: &RoadRecord, endpoint: Endpoint, position: LonLat) -> String {
    let props = &record.properties;
    let popup_id = marker_popup_id(record, endpoint);
    let or_dash = |value: Option<String>| value.filter(|s| !s.is_empty()).unwrap_or_else(|| "-".to_string());
    let number = |value: Option<f64>| value.filter(|v| *v != 0.0).map(format_number);

    format!(
        concat!(
            "<div class=\"popup-simple\" id=\"{id}\">",
            "<div class=\"popup-field\"><span class=\"popup-label\">No</span>: {no}</div>",
            "<div class=\"popup-field\"><span class=\"popup-label\">Nama</span>: {name} (Titik {jenis})</div>",
            "<a class=\"detail-link\" data-detail=\"{id}-detail\">Detail</a>",
            "<div class=\"detail-content\" id=\"{id}-detail\">",
            "<strong>Kapanewon:</strong> {kapanewon}<br />",
            "<strong>Kalurahan:</strong> {kalurahan}<br />",
            "<strong>Panjang:</strong> {panjang} km<br />",
            "<strong>Lebar:</strong> {lebar} m<br />",
            "<br /><strong>Koordinat:</strong><br />",
            "Latitude: {lat:.6}<br />",
            "Longitude: {lon:.6}",
            "</div></div>"
        ),
        id = popup_id,
        no = escape_html(record.no_ruas()),
        name = escape_html(record.display_name()),
        jenis = endpoint.label(),
        kapanewon = escape_html(&or_dash(props.kapanewon.clone())),
        kalurahan = escape_html(&or_dash(props.kalurahan.clone())),
        panjang = or_dash(number(props.panjang_km)),
        lebar = or_dash(number(props.lebar_m)),
        lat = position.lat,
        lon = position.lon,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(props: RoadProperties) -> RoadRecord {
        RoadRecord::new(
            0,
            props,
            vec![LonLat::new(110.123456789, -7.8), LonLat::new(110.2, -7.9)],
        )
        .unwrap()
    }

    fn full_props() -> RoadProperties {
        RoadProperties {
            no_ruas: Some("242.1".to_string()),
            name: Some("Wates - Kenteng".to_string()),
            kapanewon: Some("Wates".to_string()),
            kalurahan: Some("Bendungan".to_string()),
            panjang_km: Some(2.5),
            lebar_m: Some(4.0),
            hotmix_km: Some(1.5),
            kerikil_km: Some(0.0),
            tanah_km: Some(1.0),
        }
    }

    #[test]
    fn test_road_popup_contents() {
        let html = road_popup(&full_props());
        assert!(html.contains("<div class=\"popup-title\">Wates - Kenteng</div>"));
        assert!(html.contains("<strong>No Ruas:</strong> 242.1<br />"));
        assert!(html.contains("<strong>Kalurahan:</strong> Bendungan"));
        assert!(html.contains("<strong>Panjang:</strong> 2.5 km"));
        assert!(html.contains("<strong>Lebar:</strong> 4 m"));
        assert!(html.contains("• Hotmix: 1.5 km<br />• Tanah: 1 km"));
        assert!(!html.contains("Kerikil"));
        assert!(html.ends_with("</div></div>"));
    }

    #[test]
    fn test_road_popup_minimal() {
        let html = road_popup(&RoadProperties::default());
        assert!(html.contains("Ruas Jalan"));
        assert!(!html.contains("No Ruas"));
        assert!(!html.contains("Tipe Perkerasan"));
    }

    #[test]
    fn test_marker_icon_label_and_tooltip() {
        let mut props = full_props();
        props.name = Some("Jl. \"Baru\"".to_string());
        let icon = marker_icon(&record(props), Endpoint::Ujung);
        assert!(icon.contains("title=\"Jl. &quot;Baru&quot; (Titik Ujung)\""));
        assert!(icon.contains("marker-pin ujung"));
        assert!(icon.contains(">242.1</div>"));

        let icon = marker_icon(&record(RoadProperties::default()), Endpoint::Pangkal);
        assert!(icon.contains(">Ruas</div>"));
        assert!(icon.contains("title=\"Ruas (Titik Pangkal)\""));
    }

    #[test]
    fn test_marker_popup() {
        let r = record(full_props());
        let html = marker_popup(&r, Endpoint::Pangkal, r.start());
        assert!(html.contains("id=\"popup-pangkal-242.1\""));
        assert!(html.contains("id=\"popup-pangkal-242.1-detail\""));
        assert!(html.contains("Wates - Kenteng (Titik Pangkal)"));
        assert!(html.contains("Latitude: -7.800000<br />"));
        assert!(html.contains("Longitude: 110.123457"));

        let bare = record(RoadProperties::default());
        let html = marker_popup(&bare, Endpoint::Ujung, bare.end());
        assert!(html.contains("<strong>Kapanewon:</strong> -<br />"));
        assert!(html.contains("<strong>Panjang:</strong> - km"));
    }

    #[test]
    fn test_popup_id_sanitized() {
        let mut props = full_props();
        props.no_ruas = Some("12 A/b".to_string());
        assert_eq!(marker_popup_id(&record(props), Endpoint::Ujung), "popup-ujung-12_A_b");
    }
}
