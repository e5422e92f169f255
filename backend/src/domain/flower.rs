//! Flower (reaction) data model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{FlowerId, UserId, ZineId};

/// Error raised when a flower asset variant is out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowerAssetError(pub u8);

impl fmt::Display for FlowerAssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "flower asset type must be between {} and {}, got {}",
            FlowerAsset::MIN,
            FlowerAsset::MAX,
            self.0
        )
    }
}

impl std::error::Error for FlowerAssetError {}

/// Visual variant of a flower, `1..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FlowerAsset(u8);

impl FlowerAsset {
    /// Lowest valid variant.
    pub const MIN: u8 = 1;
    /// Highest valid variant.
    pub const MAX: u8 = 3;

    /// Validate a raw variant number.
    pub fn new(value: u8) -> Result<Self, FlowerAssetError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(FlowerAssetError(value))
        }
    }

    /// Raw variant number.
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for FlowerAsset {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl From<FlowerAsset> for u8 {
    fn from(value: FlowerAsset) -> Self {
        value.0
    }
}

impl TryFrom<u8> for FlowerAsset {
    type Error = FlowerAssetError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// A flower given to a zine.
///
/// `to_user_id` is the zine's artist at the time the flower was given and
/// is not kept in sync afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flower {
    /// Document identifier.
    pub id: FlowerId,
    /// Sender.
    pub from_user_id: UserId,
    /// Target zine.
    pub to_zine_id: ZineId,
    /// Recipient snapshot.
    pub to_user_id: UserId,
    /// Visual variant.
    pub assets_type: FlowerAsset,
    /// Message; may be empty.
    pub message: String,
    /// Server-assigned creation time.
    pub created_at: Option<DateTime<Utc>>,
}
