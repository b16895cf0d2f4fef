//! Campus links: the operator-maintained links document and the built-in
//! directory of campus sites, plus site search.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use url::Url;

use crate::{errors::FeedError, store::DocumentStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampusLink {
    pub label: String,
    #[serde(serialize_with = "serialize_url")]
    pub url: Url,
}

fn serialize_url<S: Serializer>(url: &Url, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(url.as_str())
}

impl CampusLink {
    fn parse(label: &str, raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        Some(Self {
            label: label.to_string(),
            url,
        })
    }
}

const DEFAULT_DIRECTORY: &[(&str, &str)] = &[
    ("Campus Events", "https://gustavus.edu/events/"),
    ("Student Clubs", "https://gustavus.edu/studentorgs/organizations/"),
    ("Dining Services", "https://gustavus.edu/diningservices/"),
    ("Bookstore Deals", "https://www.bookmark.gustavus.edu/"),
    ("Gus Bus", "https://gustavus.edu/safety/shuttle/"),
    ("Tutoring Hours", "https://gustavus.edu/asc/"),
    ("Athletic Games", "https://athletics.gustavus.edu/"),
    ("Career Services", "https://gustavus.edu/careercenter/"),
    ("Campus Map", "https://gustavus.edu/virtualtour/"),
    ("Library Info", "https://gustavus.edu/library/"),
];

/// Links from a links document: every string field whose value starts with
/// `http` and parses as a URL, sorted by label ignoring case.
pub fn links_from_document(document: &Map<String, Value>) -> Vec<CampusLink> {
    let mut links: Vec<CampusLink> = document
        .iter()
        .filter_map(|(label, value)| match value {
            Value::String(raw) if raw.starts_with("http") => {
                let link = CampusLink::parse(label, raw);
                if link.is_none() {
                    log::warn!("ignoring link {label:?}: invalid URL {raw:?}");
                }
                link
            }
            _ => None,
        })
        .collect();
    links.sort_by(|a, b| {
        a.label
            .to_lowercase()
            .cmp(&b.label.to_lowercase())
            .then_with(|| a.label.cmp(&b.label))
    });
    links
}

/// Reads the links document from `store`. A missing document yields no links.
pub async fn load_links<S: DocumentStore>(store: &S) -> Result<Vec<CampusLink>, FeedError> {
    match store.links_document().await? {
        Some(document) => Ok(links_from_document(&document)),
        None => {
            log::warn!("links document not found");
            Ok(Vec::new())
        }
    }
}

/// The built-in directory of campus sites, in display order.
pub fn default_directory() -> Vec<CampusLink> {
    DEFAULT_DIRECTORY
        .iter()
        .filter_map(|(label, raw)| CampusLink::parse(label, raw))
        .collect()
}

/// Links whose label contains `query`, ignoring case.
pub fn filter_links<'a>(links: &'a [CampusLink], query: &str) -> Vec<&'a CampusLink> {
    let needle = query.to_lowercase();
    links
        .iter()
        .filter(|link| link.label.to_lowercase().contains(&needle))
        .collect()
}

/// Site search URL for `query`; `None` for a blank query.
pub fn site_search_url(base: &str, query: &str) -> Result<Option<Url>, FeedError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(None);
    }
    let mut url = Url::parse(base).map_err(|err| FeedError::Config {
        message: format!("invalid site search URL {base:?}: {err}"),
    })?;
    url.query_pairs_mut().append_pair("q", query);
    Ok(Some(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_keeps_http_strings_sorted() {
        let document = json!({
            "moodle": "https://moodle.gustavus.edu/",
            "GusMail": "https://mail.google.com/mail/u/0/",
            "Phone": "507-933-8000",
            "Count": 3,
            "Broken": "http://",
        });
        let links = links_from_document(document.as_object().unwrap());
        let labels: Vec<&str> = links.iter().map(|link| link.label.as_str()).collect();
        assert_eq!(labels, ["GusMail", "moodle"]);
    }

    #[test]
    fn filter_ignores_case() {
        let directory = default_directory();
        assert_eq!(directory.len(), DEFAULT_DIRECTORY.len());
        let hits = filter_links(&directory, "CAMPUS");
        let labels: Vec<&str> = hits.iter().map(|link| link.label.as_str()).collect();
        assert_eq!(labels, ["Campus Events", "Campus Map"]);
        assert_eq!(filter_links(&directory, "").len(), directory.len());
    }

    #[test]
    fn link_serializes_url_as_string() {
        let link = CampusLink::parse("Moodle", "https://moodle.gustavus.edu/").unwrap();
        assert_eq!(
            serde_json::to_value(&link).unwrap(),
            json!({ "label": "Moodle", "url": "https://moodle.gustavus.edu/" })
        );
    }

    #[test]
    fn search_url_encodes_trimmed_query() {
        let url = site_search_url("https://gustavus.edu/search/", "  dining hours ")
            .unwrap()
            .unwrap();
        assert_eq!(url.as_str(), "https://gustavus.edu/search/?q=dining+hours");
        assert!(site_search_url("https://gustavus.edu/search/", "   ").unwrap().is_none());
    }
}
