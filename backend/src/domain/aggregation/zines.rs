//! Zine listing, creation and deletion.

use futures_util::join;
use serde_json::Value;
use tracing::{debug, warn};

use super::AggregationService;
use super::documents::{
    ARTIST_ID, CREATED_AT, SAVED_ZINES, decode_zine, zine_artist, zine_creation_write,
    zine_from_creation,
};
use crate::domain::ports::{
    Collection, Direction, DocumentStore, DocumentWrite, ObjectStore, Query, SetMode, WriteBatch,
};
use crate::domain::{Error, NewZine, Session, Topic, UserId, Zine, ZineId};

/// Largest number of writes committed in one batch.
const WRITE_BATCH_LIMIT: usize = 500;

/// Outcome of a successful [`AggregationService::delete_zine`].
///
/// The delete itself has succeeded whenever this value is returned; the
/// remaining fields describe the best-effort cleanup that followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZineDeletion {
    /// The deleted zine.
    pub zine_id: ZineId,
    /// Whether the cover blob was removed.
    pub cover_removed: bool,
    /// Profiles whose saved set no longer references the zine.
    pub saved_references_removed: usize,
    /// `false` when any cleanup step failed and left stale data behind.
    pub cleanup_complete: bool,
}

impl<D, O> AggregationService<D, O>
where
    D: DocumentStore,
    O: ObjectStore,
{
    /// All zines, newest first.
    pub async fn list_zines(&self) -> Vec<Zine> {
        let query = Query::new(Collection::Zines).order_by(CREATED_AT, Direction::Descending);
        Self::degrade("list_zines", self.run_zine_query(&query).await)
    }

    /// Zines owned by `artist_id`, newest first.
    pub async fn list_zines_by_artist(&self, artist_id: &UserId) -> Vec<Zine> {
        let query = Query::new(Collection::Zines)
            .where_equal(ARTIST_ID, artist_id.as_str())
            .order_by(CREATED_AT, Direction::Descending);
        Self::degrade("list_zines_by_artist", self.run_zine_query(&query).await)
    }

    /// The signed-in principal's own uploads; empty when anonymous.
    pub async fn list_own_zines(&self, session: &Session) -> Vec<Zine> {
        match session.principal_opt() {
            Some(principal) => self.list_zines_by_artist(principal).await,
            None => {
                debug!("anonymous session has no uploads");
                Vec::new()
            }
        }
    }

    /// Point lookup of a single zine.
    pub async fn get_zine(&self, zine_id: &ZineId) -> Result<Option<Zine>, Error> {
        let snapshot = self
            .documents
            .get(Collection::Zines, zine_id.as_str())
            .await
            .map_err(Self::map_store_error)?;
        snapshot
            .map(|snapshot| decode_zine(&snapshot).map_err(Self::map_store_error))
            .transpose()
    }

    /// Owner of a zine, if it exists.
    ///
    /// Only `artistId` is decoded, so ownership checks still work on zines
    /// whose other fields are malformed.
    pub(super) async fn get_zine_artist(&self, zine_id: &ZineId) -> Result<Option<UserId>, Error> {
        let snapshot = self
            .documents
            .get(Collection::Zines, zine_id.as_str())
            .await
            .map_err(Self::map_store_error)?;
        snapshot
            .map(|snapshot| zine_artist(&snapshot).map_err(Self::map_store_error))
            .transpose()
    }

    /// Upload a cover and publish a new zine owned by the principal.
    ///
    /// The cover is uploaded first; the document is only written once the
    /// upload and URL lookup have succeeded. A failed document write leaves
    /// the uploaded cover orphaned, which is logged.
    ///
    /// # Errors
    /// `Unauthenticated` without a principal, `InvalidRequest` for a blank
    /// title, and backend errors from either store.
    pub async fn create_zine(
        &self,
        session: &Session,
        fields: NewZine,
        cover: Vec<u8>,
    ) -> Result<Zine, Error> {
        let artist = session.principal()?;
        if fields.title.trim().is_empty() {
            return Err(Error::invalid_request("zine title must not be empty"));
        }

        let zine_id = ZineId::random();
        let cover_path = self.options.cover_path(&zine_id);
        self.objects
            .put(&cover_path, cover)
            .await
            .map_err(Self::map_object_error)?;
        let cover_url = match self.objects.download_url(&cover_path).await {
            Ok(url) => url,
            Err(error) => {
                warn!(zine_id = %zine_id, cover_path = %cover_path, error = %error, "cover uploaded but its URL is unavailable; blob is orphaned");
                return Err(Self::map_object_error(error));
            }
        };

        let write = zine_creation_write(artist, &fields, &cover_url);
        if let Err(error) = self
            .documents
            .set(Collection::Zines, zine_id.as_str(), write, SetMode::Overwrite)
            .await
        {
            warn!(zine_id = %zine_id, cover_path = %cover_path, error = %error, "zine write failed; cover blob is orphaned");
            return Err(Self::map_store_error(error));
        }
        debug!(zine_id = %zine_id, artist_id = %artist, "zine created");

        match self.get_zine(&zine_id).await {
            Ok(Some(stored)) => Ok(stored),
            Ok(None) | Err(_) => Ok(zine_from_creation(zine_id, artist, fields, &cover_url)),
        }
    }

    /// Delete a zine owned by the principal.
    ///
    /// Success is decided by the document delete alone. Removing the cover
    /// and clearing saved references run afterwards, concurrently, and only
    /// log their failures.
    ///
    /// # Errors
    /// `Unauthenticated` without a principal, `NotFound` when the zine does
    /// not exist, `Unauthorized` when the principal is not its artist, and
    /// backend errors from the lookup or delete.
    pub async fn delete_zine(
        &self,
        session: &Session,
        zine_id: &ZineId,
    ) -> Result<ZineDeletion, Error> {
        let principal = session.principal()?;
        let artist = self
            .get_zine_artist(zine_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("zine {zine_id} does not exist")))?;
        if &artist != principal {
            return Err(Error::unauthorized("only the artist may delete a zine"));
        }

        self.documents
            .delete(Collection::Zines, zine_id.as_str())
            .await
            .map_err(Self::map_store_error)?;
        debug!(zine_id = %zine_id, "zine deleted");

        let (cover_removed, saved_cleanup) =
            join!(self.remove_cover(zine_id), self.clear_saved_references(zine_id));
        let (saved_references_removed, saved_complete) = saved_cleanup;
        if saved_references_removed > 0 {
            self.bus.publish(&Topic::SAVED_ZINES_CHANGED);
        }

        Ok(ZineDeletion {
            zine_id: zine_id.clone(),
            cover_removed,
            saved_references_removed,
            cleanup_complete: cover_removed && saved_complete,
        })
    }

    async fn run_zine_query(&self, query: &Query) -> Result<Vec<Zine>, Error> {
        let snapshots = self
            .documents
            .query(query)
            .await
            .map_err(Self::map_store_error)?;
        Ok(Self::decode_all(&snapshots, decode_zine))
    }

    async fn remove_cover(&self, zine_id: &ZineId) -> bool {
        let cover_path = self.options.cover_path(zine_id);
        match self.objects.delete(&cover_path).await {
            Ok(()) => true,
            Err(error) => {
                warn!(zine_id = %zine_id, cover_path = %cover_path, error = %error, "failed to delete zine cover");
                false
            }
        }
    }

    /// Remove `zine_id` from every profile's saved set.
    ///
    /// Returns how many profiles were updated and whether every batch
    /// committed.
    async fn clear_saved_references(&self, zine_id: &ZineId) -> (usize, bool) {
        let query =
            Query::new(Collection::Users).where_array_contains(SAVED_ZINES, zine_id.as_str());
        let holders = match self.documents.query(&query).await {
            Ok(holders) => holders,
            Err(error) => {
                warn!(zine_id = %zine_id, error = %error, "failed to find profiles saving deleted zine");
                return (0, false);
            }
        };

        let mut removed = 0;
        for chunk in holders.chunks(WRITE_BATCH_LIMIT) {
            let mut batch = WriteBatch::new();
            for holder in chunk {
                batch.update(
                    Collection::Users,
                    holder.id.as_str(),
                    DocumentWrite::new()
                        .array_remove(SAVED_ZINES, vec![Value::from(zine_id.as_str())]),
                );
            }
            if let Err(error) = self.documents.commit(batch).await {
                warn!(zine_id = %zine_id, removed, error = %error, "failed to clear saved references");
                return (removed, false);
            }
            removed += chunk.len();
        }
        (removed, true)
    }
}
