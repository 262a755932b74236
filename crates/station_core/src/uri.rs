//! Resource locator routing.
//!
//! Locators look like `content://<authority>/<table>` for the whole
//! collection and `content://<authority>/<table>/<id>` for one row. Empty
//! path segments, the query string and the fragment are ignored when
//! matching.

use crate::model::station::StationId;

pub const CONTENT_SCHEME: &str = "content";
pub const COLLECTION_CONTENT_TYPE: &str = "vnd.android.cursor.dir/vnd.sofiapublictransport.station";
pub const ITEM_CONTENT_TYPE: &str = "vnd.android.cursor.item/vnd.sofiapublictransport.station";

/// Classification of a recognized locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriMatch {
    Collection,
    Item(StationId),
}

impl UriMatch {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Collection => COLLECTION_CONTENT_TYPE,
            Self::Item(_) => ITEM_CONTENT_TYPE,
        }
    }
}

/// Matches locators against the collection and item patterns of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriRouter {
    authority: String,
    table: String,
    collection_uri: String,
}

impl UriRouter {
    pub fn new(authority: impl Into<String>, table: impl Into<String>) -> Self {
        let authority = authority.into();
        let table = table.into();
        let collection_uri = format!("{CONTENT_SCHEME}://{authority}/{table}");
        Self {
            authority,
            table,
            collection_uri,
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn collection_uri(&self) -> &str {
        &self.collection_uri
    }

    /// Builds the locator of one row: collection locator plus id.
    pub fn item_uri(&self, id: StationId) -> String {
        format!("{}/{id}", self.collection_uri)
    }

    /// Returns `None` when `uri` matches neither pattern.
    pub fn classify(&self, uri: &str) -> Option<UriMatch> {
        let segments = uri_segments(uri)?;
        let (scheme, rest) = segments.split_first()?;
        let (authority, path) = rest.split_first()?;
        if *scheme != CONTENT_SCHEME || *authority != self.authority {
            return None;
        }

        match path {
            [table] if *table == self.table => Some(UriMatch::Collection),
            [table, id] if *table == self.table => parse_id(id).map(UriMatch::Item),
            _ => None,
        }
    }
}

/// Splits a locator into `[scheme, authority, path segments...]`.
///
/// Returns `None` when the locator has no `scheme://` prefix.
pub(crate) fn uri_segments(uri: &str) -> Option<Vec<&str>> {
    let without_fragment = uri.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    let (scheme, rest) = without_query.split_once("://")?;
    if scheme.is_empty() {
        return None;
    }

    let mut segments = vec![scheme];
    segments.extend(rest.split('/').filter(|segment| !segment.is_empty()));
    Some(segments)
}

fn parse_id(segment: &str) -> Option<StationId> {
    if segment.is_empty() || !segment.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::{uri_segments, UriMatch, UriRouter, COLLECTION_CONTENT_TYPE, ITEM_CONTENT_TYPE};

    fn router() -> UriRouter {
        UriRouter::new("eu.tanov.android.StationProvider", "stations")
    }

    #[test]
    fn classifies_collection_and_item() {
        let router = router();
        assert_eq!(
            router.classify("content://eu.tanov.android.StationProvider/stations"),
            Some(UriMatch::Collection)
        );
        assert_eq!(
            router.classify("content://eu.tanov.android.StationProvider/stations/17"),
            Some(UriMatch::Item(17))
        );
    }

    #[test]
    fn ignores_empty_segments_query_and_fragment() {
        let router = router();
        assert_eq!(
            router.classify("content://eu.tanov.android.StationProvider/stations/"),
            Some(UriMatch::Collection)
        );
        assert_eq!(
            router.classify("content://eu.tanov.android.StationProvider//stations/4?x=1#top"),
            Some(UriMatch::Item(4))
        );
    }

    #[test]
    fn rejects_other_shapes() {
        let router = router();
        for uri in [
            "",
            "stations",
            "content://eu.tanov.android.StationProvider",
            "content://other.authority/stations",
            "http://eu.tanov.android.StationProvider/stations",
            "content://eu.tanov.android.StationProvider/routes",
            "content://eu.tanov.android.StationProvider/stations/abc",
            "content://eu.tanov.android.StationProvider/stations/-5",
            "content://eu.tanov.android.StationProvider/stations/+5",
            "content://eu.tanov.android.StationProvider/stations/5/extra",
            "content://eu.tanov.android.StationProvider/stations/99999999999999999999",
        ] {
            assert_eq!(router.classify(uri), None, "{uri} should not match");
        }
    }

    #[test]
    fn item_uri_round_trips_through_classify() {
        let router = router();
        let uri = router.item_uri(42);
        assert_eq!(
            uri,
            "content://eu.tanov.android.StationProvider/stations/42"
        );
        assert_eq!(router.classify(&uri), Some(UriMatch::Item(42)));
    }

    #[test]
    fn content_types_follow_match_kind() {
        assert_eq!(UriMatch::Collection.content_type(), COLLECTION_CONTENT_TYPE);
        assert_eq!(UriMatch::Item(1).content_type(), ITEM_CONTENT_TYPE);
    }

    #[test]
    fn segments_split_scheme_authority_and_path() {
        assert_eq!(
            uri_segments("content://a.b/stations/3").unwrap(),
            vec!["content", "a.b", "stations", "3"]
        );
        assert!(uri_segments("no-scheme/stations").is_none());
    }
}
