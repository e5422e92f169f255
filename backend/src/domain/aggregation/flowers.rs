//! Flowers given to zines.

use tracing::debug;

use super::AggregationService;
use super::documents::{CREATED_AT, TO_USER_ID, TO_ZINE_ID, decode_flower, flower_creation_write};
use crate::domain::ports::{Collection, Direction, DocumentStore, ObjectStore, Query};
use crate::domain::{Error, Flower, FlowerAsset, FlowerId, Session, UserId, ZineId};

impl<D, O> AggregationService<D, O>
where
    D: DocumentStore,
    O: ObjectStore,
{
    /// Give a flower to a zine.
    ///
    /// The recipient is the zine's artist at the time of giving. The same
    /// sender may give any number of flowers to the same zine; each call
    /// writes a new document.
    ///
    /// # Errors
    /// `Unauthenticated` without a principal, `TargetNotFound` when the zine
    /// does not exist, and backend errors.
    pub async fn give_flower(
        &self,
        session: &Session,
        zine_id: &ZineId,
        assets_type: FlowerAsset,
        message: &str,
    ) -> Result<FlowerId, Error> {
        let sender = session.principal()?;
        let recipient = self
            .get_zine_artist(zine_id)
            .await?
            .ok_or_else(|| Error::target_not_found(format!("zine {zine_id} does not exist")))?;

        let write = flower_creation_write(sender, zine_id, &recipient, assets_type, message);
        let raw_id = self
            .documents
            .add(Collection::Flowers, write)
            .await
            .map_err(Self::map_store_error)?;
        let flower_id = FlowerId::new(&raw_id)
            .map_err(|err| Error::internal(format!("store generated invalid flower id: {err}")))?;

        debug!(flower_id = %flower_id, zine_id = %zine_id, sender = %sender, "flower given");
        Ok(flower_id)
    }

    /// Flowers given to `zine_id`, newest first.
    pub async fn list_flowers_for_zine(&self, zine_id: &ZineId) -> Vec<Flower> {
        let query = Query::new(Collection::Flowers)
            .where_equal(TO_ZINE_ID, zine_id.as_str())
            .order_by(CREATED_AT, Direction::Descending);
        Self::degrade("list_flowers_for_zine", self.run_flower_query(&query).await)
    }

    /// Flowers received by `user_id`, newest first.
    pub async fn list_flowers_for_user(&self, user_id: &UserId) -> Vec<Flower> {
        let query = Query::new(Collection::Flowers)
            .where_equal(TO_USER_ID, user_id.as_str())
            .order_by(CREATED_AT, Direction::Descending);
        Self::degrade("list_flowers_for_user", self.run_flower_query(&query).await)
    }

    async fn run_flower_query(&self, query: &Query) -> Result<Vec<Flower>, Error> {
        let snapshots = self
            .documents
            .query(query)
            .await
            .map_err(Self::map_store_error)?;
        Ok(Self::decode_all(&snapshots, decode_flower))
    }
}
