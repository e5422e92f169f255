//! Tag reference data.

use super::AggregationService;
use super::documents::decode_tag;
use crate::domain::ports::{Collection, DocumentStore, ObjectStore, Query};
use crate::domain::{Error, Tag, TagCatalogue};

impl<D, O> AggregationService<D, O>
where
    D: DocumentStore,
    O: ObjectStore,
{
    /// Every stored tag, ordered by category then display name.
    pub async fn list_tags(&self) -> Vec<Tag> {
        Self::degrade("list_tags", self.fetch_tags().await)
    }

    /// Tags grouped by category, falling back to the built-in set when the
    /// backend has none and fallback is enabled.
    pub async fn tag_catalogue(&self) -> TagCatalogue {
        TagCatalogue::from_tags(self.list_tags().await, self.options.tag_fallback)
    }

    async fn fetch_tags(&self) -> Result<Vec<Tag>, Error> {
        let snapshots = self
            .documents
            .query(&Query::new(Collection::Tags))
            .await
            .map_err(Self::map_store_error)?;
        let mut tags = Self::decode_all(&snapshots, decode_tag);
        tags.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.display_name.cmp(&b.display_name))
        });
        Ok(tags)
    }
}
