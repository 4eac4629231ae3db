//! Read-only views over stored articles.
//!
//! Backs the `list` and `show` subcommands. Dates are rendered for display
//! in the fixed `day.month.year hour:minute:second` format; everything else is
//! passed through from the record.

use crate::models::{ArticleRecord, RecordId};
use crate::store::{RecordStore, StoreError};
use serde::Serialize;
use thiserror::Error;

/// Display format for publication dates.
pub const DISPLAY_DATE_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// The requested article id is not in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Article with id {0} does not exist.")]
pub struct NotFound(pub RecordId);

/// A stored article prepared for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleView {
    pub id: RecordId,
    pub url: String,
    pub title: String,
    pub html_content: String,
    pub plain_text: String,
    pub publish_date: String,
}

impl From<&ArticleRecord> for ArticleView {
    fn from(record: &ArticleRecord) -> Self {
        Self {
            id: record.id,
            url: record.url.clone(),
            title: record.title.clone(),
            html_content: record.html_content.clone(),
            plain_text: record.plain_text.clone(),
            publish_date: record.publish_date.format(DISPLAY_DATE_FORMAT).to_string(),
        }
    }
}

/// Look up one article by id.
pub fn find_by_id<S: RecordStore>(store: &S, id: RecordId) -> Result<Option<ArticleView>, StoreError> {
    Ok(store.get(id)?.as_ref().map(ArticleView::from))
}

/// Articles whose URL contains `source`, ignoring case. `None` lists everything.
pub fn filter_by_source<S: RecordStore>(
    store: &S,
    source: Option<&str>,
) -> Result<Vec<ArticleView>, StoreError> {
    let needle = source.map(str::to_lowercase);
    Ok(store
        .all()?
        .iter()
        .filter(|r| match &needle {
            Some(n) => r.url.to_lowercase().contains(n.as_str()),
            None => true,
        })
        .map(ArticleView::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewArticle;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::default();
        for (url, title) in [
            ("https://news.example.com/a", "A"),
            ("https://blog.Example.org/b", "B"),
            ("https://other.net/c", "C"),
        ] {
            store
                .insert(NewArticle {
                    url: url.to_string(),
                    title: title.to_string(),
                    html_content: "<article></article>".to_string(),
                    plain_text: String::new(),
                    publish_date: NaiveDate::from_ymd_opt(2024, 10, 14)
                        .unwrap()
                        .and_hms_opt(8, 5, 9)
                        .unwrap(),
                })
                .unwrap();
        }
        store
    }

    #[test]
    fn test_view_formats_date() {
        let view = find_by_id(&store(), RecordId(1)).unwrap().unwrap();
        assert_eq!(view.publish_date, "14.10.2024 08:05:09");
        assert_eq!(view.title, "A");
    }

    #[test]
    fn test_find_missing_id() {
        assert!(find_by_id(&store(), RecordId(42)).unwrap().is_none());
        assert_eq!(
            NotFound(RecordId(42)).to_string(),
            "Article with id 42 does not exist."
        );
    }

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let views = filter_by_source(&store(), Some("EXAMPLE")).unwrap();
        let titles: Vec<_> = views.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_no_filter_lists_all() {
        assert_eq!(filter_by_source(&store(), None).unwrap().len(), 3);
        assert!(filter_by_source(&store(), Some("nowhere")).unwrap().is_empty());
    }

    #[test]
    fn test_view_serializes() {
        let view = find_by_id(&store(), RecordId(3)).unwrap().unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["publish_date"], "14.10.2024 08:05:09");
    }
}
