//! Road identifier ("nomor ruas") normalization and matching.
//!
//! Road numbers use a base segment number with an optional decimal
//! sub-segment suffix: `242` is the road, `242.1` and `242.2` are its
//! sub-segments and `242.0` is the explicit form of the base segment.
//! A bare base query selects the whole group, a qualified variant query
//! selects exactly that variant.

use std::fmt;

use serde::Serialize;

/// Canonicalizes a raw identifier: missing input becomes `""`, every
/// whitespace character is removed and the result is lower-cased.
///
/// # Examples
///
/// ```
/// use ruas_map::ruas::normalize;
///
/// assert_eq!(normalize(Some(" 242.1 ")), "242.1");
/// assert_eq!(normalize(Some("24 2.A")), "242.a");
/// assert_eq!(normalize(None), "");
/// ```
pub fn normalize(raw: Option<&str>) -> String {
    raw.unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Returns the portion of a normalized identifier before its first `.`.
///
/// ```
/// use ruas_map::ruas::base_of;
///
/// assert_eq!(base_of("242.1"), "242");
/// assert_eq!(base_of("242"), "242");
/// assert_eq!(base_of(".5"), "");
/// ```
pub fn base_of(id: &str) -> &str {
    id.split_once('.').map_or(id, |(base, _)| base)
}

/// Decides whether a dataset identifier and a query identifier denote the
/// same road. Both inputs must already be normalized.
///
/// Rules, first applicable wins:
/// 1. identical non-empty strings match;
/// 2. a query with a decimal suffix other than `.0` is a specific variant
///    query and matches nothing else;
/// 3. otherwise the bases must be equal and non-empty.
///
/// # Examples
///
/// ```
/// use ruas_map::ruas::matches;
///
/// assert!(matches("242.1", "242"));
/// assert!(matches("242.1", "242.0"));
/// assert!(!matches("242.2", "242.1"));
/// assert!(!matches("124", "24"));
/// assert!(!matches("", ""));
/// ```
pub fn matches(dataset_id: &str, query_id: &str) -> bool {
    if !query_id.is_empty() && dataset_id == query_id {
        return true;
    }

    let dataset_base = base_of(dataset_id);
    let query_base = base_of(query_id);

    let query_has_decimal = query_id.contains('.');
    let query_is_base_zero = &query_id[query_base.len()..] == ".0";
    if query_has_decimal && !query_is_base_zero {
        return false;
    }

    !dataset_base.is_empty() && dataset_base == query_base
}

/// A road identifier as found on a dataset record.
///
/// Keeps the original text for display next to its normalized form, so
/// matching never has to re-normalize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RoadIdentifier {
    raw: String,
    #[serde(skip)]
    normalized: String,
}

impl RoadIdentifier {
    /// Creates an identifier from raw dataset text.
    ///
    /// Returns `None` when nothing is left after normalization; such
    /// records never match a query.
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let normalized = normalize(Some(&raw));
        if normalized.is_empty() {
            None
        } else {
            Some(Self { raw, normalized })
        }
    }

    /// Original dataset text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

impl fmt::Display for RoadIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The identifier a caller asked to focus on, normalized once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryIdentifier {
    raw: String,
    normalized: String,
}

impl QueryIdentifier {
    /// Builds a query from an already URL-decoded request parameter.
    ///
    /// `+` is read as a space, the value is trimmed and normalized. A
    /// value that ends up empty is treated as no query at all.
    ///
    /// ```
    /// use ruas_map::ruas::QueryIdentifier;
    ///
    /// let query = QueryIdentifier::from_param(" 242.1+ ").unwrap();
    /// assert_eq!(query.normalized(), "242.1");
    /// assert!(QueryIdentifier::from_param("  + ").is_none());
    /// ```
    pub fn from_param(param: &str) -> Option<Self> {
        let raw = param.replace('+', " ").trim().to_string();
        let normalized = normalize(Some(&raw));
        if normalized.is_empty() {
            None
        } else {
            Some(Self { raw, normalized })
        }
    }

    /// Trimmed caller text, used in log output.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Whether a drawable carrying `identifier` belongs to this query.
    pub fn admits(&self, identifier: Option<&RoadIdentifier>) -> bool {
        identifier.is_some_and(|id| matches(id.normalized(), &self.normalized))
    }
}

impl fmt::Display for QueryIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Visibility decision for an object: everything is shown without a
/// query, only matching objects with one.
pub fn is_shown(query: Option<&QueryIdentifier>, identifier: Option<&RoadIdentifier>) -> bool {
    query.map_or(true, |q| q.admits(identifier))
}
