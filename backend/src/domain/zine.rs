//! Zine data model.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{UserId, ZineId};
use super::tag::TagId;

/// Default `type` stored on newly created zines.
pub const DEFAULT_ZINE_KIND: &str = "digital";

/// A published zine.
///
/// ## Invariants
/// - `artist_id` is set once from the creating principal and never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zine {
    /// Document identifier.
    pub id: ZineId,
    /// Title shown on the cover card.
    pub title: String,
    /// Longer blurb.
    pub description: String,
    /// Download URL of the cover image.
    pub cover_image_url: String,
    /// Owning user.
    pub artist_id: UserId,
    /// Server-assigned creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Page count declared by the artist.
    pub pages: Option<u32>,
    /// Publication date declared by the artist.
    pub published_at: Option<DateTime<Utc>>,
    /// Tags attached at creation.
    pub tags: BTreeSet<TagId>,
    /// Distribution kind, e.g. `digital`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// External link.
    pub link: Option<String>,
}

/// Artist-supplied fields for a new zine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewZine {
    /// Title; must not be blank.
    pub title: String,
    /// Longer blurb.
    pub description: String,
    /// Page count.
    pub pages: Option<u32>,
    /// Publication date.
    pub published_at: Option<DateTime<Utc>>,
    /// Tags to attach.
    pub tags: BTreeSet<TagId>,
}

impl NewZine {
    /// Start a new zine with the given title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the page count.
    #[must_use]
    pub fn pages(mut self, pages: u32) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Set the publication date.
    #[must_use]
    pub fn published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    /// Attach a tag.
    #[must_use]
    pub fn tag(mut self, tag: TagId) -> Self {
        self.tags.insert(tag);
        self
    }
}
