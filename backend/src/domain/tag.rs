//! Tag reference data and the grouped catalogue shown to artists.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validation errors raised when parsing a [`TagId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagIdValidationError {
    /// The identifier was empty after trimming.
    Empty,
    /// The identifier was not in canonical lowercase form.
    NotCanonical,
    /// The identifier contained a path separator.
    ContainsSlash,
}

impl fmt::Display for TagIdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "tag id must not be empty"),
            Self::NotCanonical => write!(f, "tag id must be trimmed lowercase"),
            Self::ContainsSlash => write!(f, "tag id must not contain '/'"),
        }
    }
}

impl std::error::Error for TagIdValidationError {}

/// Tag identifier: the lowercase canonical name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagId(String);

impl TagId {
    /// Validate an identifier that is already canonical.
    pub fn new(id: impl Into<String>) -> Result<Self, TagIdValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TagIdValidationError::Empty);
        }
        if id.contains('/') {
            return Err(TagIdValidationError::ContainsSlash);
        }
        if id.trim() != id || id.to_lowercase() != id {
            return Err(TagIdValidationError::NotCanonical);
        }
        Ok(Self(id))
    }

    /// Derive the canonical identifier from a display name.
    ///
    /// # Examples
    /// ```
    /// use zinezone::domain::TagId;
    ///
    /// let id = TagId::canonicalise("  Risograph ").expect("valid tag");
    /// assert_eq!(id.as_str(), "risograph");
    /// ```
    pub fn canonicalise(display_name: &str) -> Result<Self, TagIdValidationError> {
        Self::new(display_name.trim().to_lowercase())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for TagId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<TagId> for String {
    fn from(value: TagId) -> Self {
        value.0
    }
}

impl TryFrom<String> for TagId {
    type Error = TagIdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Classification bucket used to group tags for presentation.
///
/// Variant order is the order groups are presented in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCategory {
    /// Subject matter, e.g. comics or poetry.
    Genre,
    /// Production technique, e.g. risograph.
    Medium,
    /// Recurring themes.
    Theme,
    /// Anything not otherwise classified.
    Other,
}

/// A tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Canonical identifier.
    pub id: TagId,
    /// Label shown to users.
    pub display_name: String,
    /// Classification bucket.
    pub category: TagCategory,
    /// Server-assigned creation time.
    pub created_at: Option<DateTime<Utc>>,
}

impl Tag {
    fn builtin(display_name: &str, category: TagCategory) -> Option<Self> {
        let id = TagId::canonicalise(display_name).ok()?;
        Some(Self {
            id,
            display_name: display_name.to_owned(),
            category,
            created_at: None,
        })
    }
}

const BUILTIN_TAGS: &[(&str, TagCategory)] = &[
    ("Comics", TagCategory::Genre),
    ("Poetry", TagCategory::Genre),
    ("Photography", TagCategory::Genre),
    ("Illustration", TagCategory::Genre),
    ("Perzine", TagCategory::Genre),
    ("Risograph", TagCategory::Medium),
    ("Collage", TagCategory::Medium),
    ("Photocopy", TagCategory::Medium),
    ("Hand-drawn", TagCategory::Medium),
    ("Queer", TagCategory::Theme),
    ("Music", TagCategory::Theme),
    ("Activism", TagCategory::Theme),
    ("Travel", TagCategory::Theme),
    ("Experimental", TagCategory::Other),
];

/// Fixed tag set used when the backend has none.
pub fn builtin_tags() -> Vec<Tag> {
    BUILTIN_TAGS
        .iter()
        .filter_map(|(name, category)| Tag::builtin(name, *category))
        .collect()
}

/// Where the tags in a [`TagCatalogue`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagSource {
    /// Loaded from the backend `tags` collection.
    Backend,
    /// The built-in fallback set.
    BuiltIn,
}

/// Tags of a single category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroup {
    /// Category shared by every tag in the group.
    pub category: TagCategory,
    /// Tags ordered by display name.
    pub tags: Vec<Tag>,
}

/// Tags grouped by category for the upload form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCatalogue {
    /// Non-empty groups in [`TagCategory`] order.
    pub groups: Vec<TagGroup>,
    /// Origin of the tags.
    pub source: TagSource,
}

impl TagCatalogue {
    /// Group `tags`, substituting the built-in set when `tags` is empty and
    /// `fallback` is enabled.
    ///
    /// # Examples
    /// ```
    /// use zinezone::domain::{TagCatalogue, TagSource};
    ///
    /// let catalogue = TagCatalogue::from_tags(Vec::new(), true);
    /// assert_eq!(catalogue.source, TagSource::BuiltIn);
    /// assert!(!catalogue.groups.is_empty());
    /// ```
    pub fn from_tags(tags: Vec<Tag>, fallback: bool) -> Self {
        let (tags, source) = if tags.is_empty() && fallback {
            (builtin_tags(), TagSource::BuiltIn)
        } else {
            (tags, TagSource::Backend)
        };

        let mut grouped: BTreeMap<TagCategory, Vec<Tag>> = BTreeMap::new();
        for tag in tags {
            grouped.entry(tag.category).or_default().push(tag);
        }
        let groups = grouped
            .into_iter()
            .map(|(category, mut tags)| {
                tags.sort_by(|a, b| a.display_name.cmp(&b.display_name));
                TagGroup { category, tags }
            })
            .collect();

        Self { groups, source }
    }

    /// Total number of tags across all groups.
    pub fn len(&self) -> usize {
        self.groups.iter().map(|group| group.tags.len()).sum()
    }

    /// Return `true` when the catalogue has no tags.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
