//! Denormalised views assembled from several collections.
//!
//! These aggregates are built per request and owned by the caller. The
//! join functions are pure: fetching the referenced documents is the
//! aggregation service's job.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use super::flower::Flower;
use super::ids::{UserId, ZineId};
use super::user::UserProfile;
use super::zine::Zine;

/// A zine with its artist's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedZine {
    /// The zine.
    pub zine: Zine,
    /// The artist, when their profile could be loaded.
    pub artist: Option<UserProfile>,
}

/// A flower with its sender and target zine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedFlower {
    /// The flower.
    pub flower: Flower,
    /// The sender, when their profile could be loaded.
    pub sender: Option<UserProfile>,
    /// The target zine; absent once it has been deleted.
    pub zine: Option<Zine>,
}

/// Distinct artists referenced by `zines`.
pub fn distinct_artist_ids(zines: &[Zine]) -> BTreeSet<UserId> {
    zines.iter().map(|zine| zine.artist_id.clone()).collect()
}

/// Distinct senders referenced by `flowers`.
pub fn distinct_sender_ids(flowers: &[Flower]) -> BTreeSet<UserId> {
    flowers
        .iter()
        .map(|flower| flower.from_user_id.clone())
        .collect()
}

/// Distinct target zines referenced by `flowers`.
pub fn distinct_zine_ids(flowers: &[Flower]) -> BTreeSet<ZineId> {
    flowers
        .iter()
        .map(|flower| flower.to_zine_id.clone())
        .collect()
}

/// Attach artist profiles to zines, preserving input order.
pub fn join_zines_with_artists(
    zines: Vec<Zine>,
    artists: &HashMap<UserId, UserProfile>,
) -> Vec<EnrichedZine> {
    zines
        .into_iter()
        .map(|zine| {
            let artist = artists.get(&zine.artist_id).cloned();
            EnrichedZine { zine, artist }
        })
        .collect()
}

/// Attach sender profiles and target zines to flowers, preserving input
/// order.
pub fn join_flowers(
    flowers: Vec<Flower>,
    senders: &HashMap<UserId, UserProfile>,
    zines: &HashMap<ZineId, Zine>,
) -> Vec<EnrichedFlower> {
    flowers
        .into_iter()
        .map(|flower| EnrichedFlower {
            sender: senders.get(&flower.from_user_id).cloned(),
            zine: zines.get(&flower.to_zine_id).cloned(),
            flower,
        })
        .collect()
}
