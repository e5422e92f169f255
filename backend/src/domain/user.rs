//! User profile data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::UserId;

/// Public profile of a user.
///
/// The saved-zines set lives on the same backend document but is not part
/// of this type; it is read and mutated only through the aggregation
/// service's save/unsave operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Owner of the profile; equal to the principal id.
    pub id: UserId,
    /// Name shown next to the user's zines and flowers.
    pub display_name: String,
    /// Free-form biography.
    pub about_me: String,
    /// Download URL of the avatar image, when one was uploaded.
    pub avatar: Option<String>,
    /// Instagram handle.
    pub social_ig: Option<String>,
    /// Twitter handle.
    pub social_twi: Option<String>,
    /// Personal website.
    pub social_web: Option<String>,
    /// Server-assigned creation time.
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Empty profile for `id`, as created on first sign-in.
    pub fn placeholder(id: UserId) -> Self {
        Self {
            id,
            display_name: String::new(),
            about_me: String::new(),
            avatar: None,
            social_ig: None,
            social_twi: None,
            social_web: None,
            created_at: None,
        }
    }
}

/// Partial profile edit.
///
/// Only fields set to `Some` are written; everything else on the stored
/// document is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// New biography.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about_me: Option<String>,
    /// New avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// New Instagram handle.
    #[serde(rename = "social_ig", skip_serializing_if = "Option::is_none")]
    pub social_ig: Option<String>,
    /// New Twitter handle.
    #[serde(rename = "social_twi", skip_serializing_if = "Option::is_none")]
    pub social_twi: Option<String>,
    /// New website.
    #[serde(rename = "social_web", skip_serializing_if = "Option::is_none")]
    pub social_web: Option<String>,
}

impl ProfileUpdate {
    /// Return `true` when no field would be written.
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.about_me.is_none()
            && self.avatar.is_none()
            && self.social_ig.is_none()
            && self.social_twi.is_none()
            && self.social_web.is_none()
    }
}

/// Values the identity provider knows about a freshly signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSeed {
    /// Display name reported by the sign-in provider.
    pub display_name: Option<String>,
    /// Email reported by the sign-in provider.
    pub email: Option<String>,
}

/// Outcome of [`ensure_own_profile`](crate::domain::AggregationService::ensure_own_profile).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileProvisioning {
    /// The principal already had a profile.
    Existing(UserProfile),
    /// A profile with empty defaults was written.
    Created(UserProfile),
}

impl ProfileProvisioning {
    /// Borrow the profile regardless of how it was obtained.
    pub fn profile(&self) -> &UserProfile {
        match self {
            Self::Existing(profile) | Self::Created(profile) => profile,
        }
    }

    /// Return `true` when this call created the profile.
    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}
