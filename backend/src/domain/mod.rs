//! Domain primitives, aggregates and the aggregation service.
//!
//! Purpose: Define strongly typed entities for zines, profiles, flowers and
//! tags, the explicit session context, the invalidation bus, and the
//! service that joins the document collections into the views the
//! presentation layer renders. Types document their invariants and serde
//! contracts in their own Rustdoc.
//!
//! Public surface:
//! - Error (alias to `error::Error`): error payload with a stable code.
//! - AggregationService (alias to `aggregation::AggregationService`):
//!   entity operations and composite views over the ports.
//! - InvalidationBus (alias to `invalidation::InvalidationBus`): topic
//!   broadcast for stale-view notifications.
//! - Session (alias to `session::Session`): the caller's principal.

pub mod aggregation;
pub mod enrichment;
pub mod error;
pub mod flower;
pub mod ids;
pub mod invalidation;
pub mod ports;
pub mod session;
pub mod tag;
pub mod user;
pub mod zine;

pub use self::aggregation::{AggregationService, ServiceOptions, ZineDeletion};
pub use self::enrichment::{EnrichedFlower, EnrichedZine};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::flower::{Flower, FlowerAsset, FlowerAssetError};
pub use self::ids::{FlowerId, IdValidationError, UserId, ZineId};
pub use self::invalidation::{
    InvalidationBus, QueuedSubscription, Subscription, SubscriptionId, Topic,
};
pub use self::session::Session;
pub use self::tag::{
    Tag, TagCatalogue, TagCategory, TagGroup, TagId, TagIdValidationError, TagSource,
    builtin_tags,
};
pub use self::user::{ProfileProvisioning, ProfileSeed, ProfileUpdate, UserProfile};
pub use self::zine::{DEFAULT_ZINE_KIND, NewZine, Zine};
