//! Data models for extracted and stored articles.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Extraction`]: Transient result of running the extractor over a rendered page
//! - [`NewArticle`]: Insert payload handed to a record store
//! - [`ArticleRecord`]: A stored article with its store-assigned [`RecordId`]

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by a record store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fields pulled out of one rendered page.
///
/// Every field is optional: `None` means the extractor could not find it.
/// When the page has no article container all four fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Text of the `<title>` or `<h1>` element, depending on preference.
    pub title: Option<String>,
    /// Outer HTML of the article container.
    pub html_content: Option<String>,
    /// Whitespace-normalized text of the article container.
    pub plain_text: Option<String>,
    /// Inferred publication moment.
    pub publish_date: Option<NaiveDateTime>,
}

impl Extraction {
    /// `true` when no field was found at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.html_content.is_none()
            && self.plain_text.is_none()
            && self.publish_date.is_none()
    }
}

/// An article ready to be inserted into a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArticle {
    pub url: String,
    pub title: String,
    pub html_content: String,
    pub plain_text: String,
    pub publish_date: NaiveDateTime,
}

/// A persisted article.
///
/// Records are immutable once created; `url` is unique within a store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleRecord {
    /// Store-assigned identifier.
    pub id: RecordId,
    /// The URL the article was ingested from.
    pub url: String,
    /// Article title; empty when none was found and strict mode was off.
    pub title: String,
    /// Serialized markup of the article container.
    pub html_content: String,
    /// Plain text of the article container.
    pub plain_text: String,
    /// Publication moment, timezone-naive (UTC when the source had an offset).
    pub publish_date: NaiveDateTime,
}

impl ArticleRecord {
    /// Attach a store id to an insert payload.
    pub fn from_new(id: RecordId, article: NewArticle) -> Self {
        Self {
            id,
            url: article.url,
            title: article.title,
            html_content: article.html_content,
            plain_text: article.plain_text,
            publish_date: article.publish_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_extraction_default_is_empty() {
        assert!(Extraction::default().is_empty());

        let partial = Extraction {
            title: Some("Title".to_string()),
            ..Default::default()
        };
        assert!(!partial.is_empty());
    }

    #[test]
    fn test_record_from_new() {
        let record = ArticleRecord::from_new(
            RecordId(7),
            NewArticle {
                url: "https://example.com/a".to_string(),
                title: "A".to_string(),
                html_content: "<article>a</article>".to_string(),
                plain_text: "a".to_string(),
                publish_date: sample_date(),
            },
        );

        assert_eq!(record.id, RecordId(7));
        assert_eq!(record.url, "https://example.com/a");
        assert_eq!(record.publish_date, sample_date());
    }

    #[test]
    fn test_record_serialization() {
        let record = ArticleRecord {
            id: RecordId(3),
            url: "https://example.com/story".to_string(),
            title: "Story".to_string(),
            html_content: "<article><p>Body</p></article>".to_string(),
            plain_text: "Body".to_string(),
            publish_date: sample_date(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"id\":3"));
        assert!(json.contains("2025-01-15T10:30:00"));

        let back: ArticleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
