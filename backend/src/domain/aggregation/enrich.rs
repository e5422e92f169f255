//! Multi-collection joins.
//!
//! Each distinct referenced id is fetched once per call, concurrently. A
//! reference that cannot be loaded leaves the corresponding field of the
//! enriched value empty.

use std::collections::{BTreeSet, HashMap};

use futures_util::future::join_all;
use futures_util::join;
use tracing::warn;

use super::AggregationService;
use super::documents::decode_zine;
use crate::domain::enrichment::{
    distinct_artist_ids, distinct_sender_ids, distinct_zine_ids, join_flowers,
    join_zines_with_artists,
};
use crate::domain::ports::{DocumentStore, ObjectStore};
use crate::domain::{
    EnrichedFlower, EnrichedZine, Flower, UserId, UserProfile, Zine, ZineId,
};

impl<D, O> AggregationService<D, O>
where
    D: DocumentStore,
    O: ObjectStore,
{
    /// Attach each zine's artist profile.
    pub async fn enrich_zines_with_artists(&self, zines: Vec<Zine>) -> Vec<EnrichedZine> {
        let artists = self.fetch_profiles(distinct_artist_ids(&zines)).await;
        join_zines_with_artists(zines, &artists)
    }

    /// Attach each flower's sender profile and target zine.
    pub async fn enrich_flowers(&self, flowers: Vec<Flower>) -> Vec<EnrichedFlower> {
        let (senders, zines) = join!(
            self.fetch_profiles(distinct_sender_ids(&flowers)),
            self.fetch_zines_map(distinct_zine_ids(&flowers)),
        );
        join_flowers(flowers, &senders, &zines)
    }

    /// The home feed: every zine with its artist, newest first.
    pub async fn list_enriched_zines(&self) -> Vec<EnrichedZine> {
        let zines = self.list_zines().await;
        self.enrich_zines_with_artists(zines).await
    }

    /// Flowers a user received, with senders and target zines.
    pub async fn list_enriched_flowers_for_user(&self, user_id: &UserId) -> Vec<EnrichedFlower> {
        let flowers = self.list_flowers_for_user(user_id).await;
        self.enrich_flowers(flowers).await
    }

    async fn fetch_profiles(&self, ids: BTreeSet<UserId>) -> HashMap<UserId, UserProfile> {
        let lookups = ids.into_iter().map(|id| async move {
            let result = self.get_user_profile(&id).await;
            (id, result)
        });

        let mut profiles = HashMap::new();
        for (id, result) in join_all(lookups).await {
            match result {
                Ok(Some(profile)) => {
                    profiles.insert(id, profile);
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(user_id = %id, error = %error, "profile lookup failed during enrichment");
                }
            }
        }
        profiles
    }

    async fn fetch_zines_map(&self, ids: BTreeSet<ZineId>) -> HashMap<ZineId, Zine> {
        let ids: Vec<ZineId> = ids.into_iter().collect();
        match self.fetch_zines_by_id(&ids).await {
            Ok(snapshots) => Self::decode_all(&snapshots, decode_zine)
                .into_iter()
                .map(|zine| (zine.id.clone(), zine))
                .collect(),
            Err(error) => {
                warn!(zines = ids.len(), error = %error, "zine lookup failed during enrichment");
                HashMap::new()
            }
        }
    }
}
