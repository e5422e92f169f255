//! The principal's saved-zines set.
//!
//! Ids live in the `savedZines` array of the profile document and are only
//! mutated with array-union/array-remove, so repeated saves never create
//! duplicates. Successful mutations publish
//! [`Topic::SAVED_ZINES_CHANGED`].

use serde_json::Value;
use tracing::{debug, warn};

use super::AggregationService;
use super::documents::{SAVED_ZINES, decode_zine, saved_zine_ids};
use crate::domain::ports::{Collection, DocumentStore, DocumentWrite, ObjectStore};
use crate::domain::{Error, Session, Topic, UserId, Zine, ZineId};

#[derive(Debug, Clone, Copy)]
enum SavedMutation {
    Save,
    Unsave,
}

impl<D, O> AggregationService<D, O>
where
    D: DocumentStore,
    O: ObjectStore,
{
    /// Zines in the principal's saved set, in unspecified order.
    ///
    /// Empty when anonymous, when the profile is missing, or when the set is
    /// empty; in the last case no zine query is issued.
    pub async fn list_saved_zines(&self, session: &Session) -> Vec<Zine> {
        let Some(principal) = session.principal_opt() else {
            debug!("anonymous session has no saved zines");
            return Vec::new();
        };
        Self::degrade("list_saved_zines", self.fetch_saved_zines(principal).await)
    }

    /// Add `zine_id` to the principal's saved set.
    ///
    /// Saving an id that is already present leaves the set unchanged.
    ///
    /// # Errors
    /// `Unauthenticated` without a principal, `NotFound` when the principal
    /// has no profile yet, and backend errors.
    pub async fn save_zine(&self, session: &Session, zine_id: &ZineId) -> Result<(), Error> {
        self.mutate_saved(session, zine_id, SavedMutation::Save).await
    }

    /// Remove `zine_id` from the principal's saved set.
    ///
    /// # Errors
    /// As [`save_zine`](Self::save_zine).
    pub async fn unsave_zine(&self, session: &Session, zine_id: &ZineId) -> Result<(), Error> {
        self.mutate_saved(session, zine_id, SavedMutation::Unsave)
            .await
    }

    /// Whether `zine_id` is in the principal's saved set.
    ///
    /// `false` when anonymous, without a profile, or when the lookup fails.
    pub async fn is_zine_saved(&self, session: &Session, zine_id: &ZineId) -> bool {
        let Some(principal) = session.principal_opt() else {
            return false;
        };
        match self.documents.get(Collection::Users, principal.as_str()).await {
            Ok(Some(profile)) => saved_zine_ids(&profile).contains(zine_id),
            Ok(None) => false,
            Err(error) => {
                warn!(user_id = %principal, zine_id = %zine_id, error = %error, "saved lookup failed");
                false
            }
        }
    }

    async fn fetch_saved_zines(&self, principal: &UserId) -> Result<Vec<Zine>, Error> {
        let Some(profile) = self
            .documents
            .get(Collection::Users, principal.as_str())
            .await
            .map_err(Self::map_store_error)?
        else {
            return Ok(Vec::new());
        };

        let ids = saved_zine_ids(&profile);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let snapshots = self.fetch_zines_by_id(&ids).await?;
        Ok(Self::decode_all(&snapshots, decode_zine))
    }

    async fn mutate_saved(
        &self,
        session: &Session,
        zine_id: &ZineId,
        mutation: SavedMutation,
    ) -> Result<(), Error> {
        let principal = session.principal()?;
        let element = vec![Value::from(zine_id.as_str())];
        let write = match mutation {
            SavedMutation::Save => DocumentWrite::new().array_union(SAVED_ZINES, element),
            SavedMutation::Unsave => DocumentWrite::new().array_remove(SAVED_ZINES, element),
        };
        self.documents
            .update(Collection::Users, principal.as_str(), write)
            .await
            .map_err(Self::map_store_error)?;

        debug!(user_id = %principal, zine_id = %zine_id, ?mutation, "saved zines changed");
        self.bus.publish(&Topic::SAVED_ZINES_CHANGED);
        Ok(())
    }
}
