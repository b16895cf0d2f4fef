//! Feed data model: stored post documents, the rendered post view,
//! categories and comment bundles.

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

use crate::format::format_post_date;

/// Label of the pseudo-category that disables filtering.
pub const ALL_CATEGORIES: &str = "All";

/// Closed set of post categories, with a bucket for values outside it.
///
/// Unrecognized strings are kept verbatim in [`Category::Unknown`] so that
/// they round-trip through the store unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Library,
    Sports,
    StudentOrgs,
    Events,
    Unknown(String),
}

impl Category {
    /// Recognized categories in display order.
    pub fn known() -> [Category; 4] {
        [Category::Library, Category::Sports, Category::StudentOrgs, Category::Events]
    }

    /// Case-sensitive parse; anything unrecognized lands in `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Library" => Category::Library,
            "Sports" => Category::Sports,
            "Student Orgs" => Category::StudentOrgs,
            "Events" => Category::Events,
            other => Category::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Library => "Library",
            Category::Sports => "Sports",
            Category::StudentOrgs => "Student Orgs",
            Category::Events => "Events",
            Category::Unknown(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Unknown(_))
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match Category::parse(&value) {
            Category::Unknown(_) => Category::Unknown(value),
            known => known,
        }
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        match value {
            Category::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category selection applied by the filter stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// `"All"` selects everything; any other label selects that exact category.
    pub fn from_label(label: &str) -> Self {
        if label == ALL_CATEGORIES {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(Category::parse(label))
        }
    }

    pub fn matches(&self, category: &Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(selected) => selected.as_str() == category.as_str(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CategoryFilter::All => ALL_CATEGORIES,
            CategoryFilter::Only(category) => category.as_str(),
        }
    }
}

/// A post document as stored in the backing collection.
///
/// The id is the document key and is filled in by the store when reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub author: String,
    pub category: Category,
    #[serde(rename = "dateCreated")]
    pub date_created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: i64,
}

impl PostRecord {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|liker| liker == user_id)
    }
}

/// Render-ready view of a post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub id: String,
    pub author: String,
    /// Creation time in display form, or the raw stored value if unparsable.
    pub created_at: String,
    pub location: String,
    pub image_url: Option<String>,
    pub text: String,
    pub tags: Vec<String>,
    /// Cardinality of the like-set in the snapshot this post came from.
    pub likes: usize,
    /// Denormalized counter; may drift from the comment bundle length.
    pub comments: i64,
    pub category: Category,
}

impl From<&PostRecord> for Post {
    fn from(record: &PostRecord) -> Self {
        Self {
            id: record.id.clone(),
            author: record.author.clone(),
            created_at: format_post_date(&record.date_created),
            location: record.location.clone(),
            image_url: record.image.clone(),
            text: record.text.clone(),
            tags: record.tags.clone(),
            likes: record.likes.len(),
            comments: record.comments,
            category: record.category.clone(),
        }
    }
}

/// A post's comments as two index-aligned sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentBundle {
    #[serde(rename = "author", default)]
    pub authors: Vec<String>,
    #[serde(rename = "comment", default)]
    pub comments: Vec<String>,
}

impl CommentBundle {
    pub const EMPTY: CommentBundle = CommentBundle {
        authors: Vec::new(),
        comments: Vec::new(),
    };

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// True when both sequences have the same length.
    pub fn is_aligned(&self) -> bool {
        self.authors.len() == self.comments.len()
    }

    /// `(author, comment)` pairs; a missing author renders as an empty string.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.comments.iter().enumerate().map(|(idx, comment)| {
            let author = self.authors.get(idx).map(String::as_str).unwrap_or("");
            (author, comment.as_str())
        })
    }

    /// Union-append of one `(author, comment)` pair. Returns false when the
    /// exact pair is already present, so a retried append is a no-op.
    pub fn append_unique(&mut self, author: &str, comment: &str) -> bool {
        if self.entries().any(|(a, c)| a == author && c == comment) {
            return false;
        }
        self.authors.push(author.to_string());
        self.comments.push(comment.to_string());
        true
    }
}

/// One full, ordered view of the post collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    pub records: Vec<PostRecord>,
}

impl FeedSnapshot {
    /// Orders records by `dateCreated` descending (string order, as stored),
    /// ties broken by id ascending.
    pub fn from_unordered(mut records: Vec<PostRecord>) -> Self {
        records.sort_by(|a, b| match b.date_created.cmp(&a.date_created) {
            Ordering::Equal => a.id.cmp(&b.id),
            other => other,
        });
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
