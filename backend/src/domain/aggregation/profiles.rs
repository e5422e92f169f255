//! User profiles and avatar uploads.

use tracing::debug;
use url::Url;

use super::AggregationService;
use super::documents::{decode_profile, profile_creation_write};
use crate::domain::ports::{Collection, DocumentStore, DocumentWrite, ObjectStore, SetMode};
use crate::domain::{
    Error, ProfileProvisioning, ProfileSeed, ProfileUpdate, Session, UserId, UserProfile,
};

impl<D, O> AggregationService<D, O>
where
    D: DocumentStore,
    O: ObjectStore,
{
    /// Point lookup of any user's profile.
    pub async fn get_user_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, Error> {
        let snapshot = self
            .documents
            .get(Collection::Users, user_id.as_str())
            .await
            .map_err(Self::map_store_error)?;
        snapshot
            .map(|snapshot| decode_profile(&snapshot).map_err(Self::map_store_error))
            .transpose()
    }

    /// The principal's own profile.
    ///
    /// `Ok(None)` is normal for a principal who has just registered.
    ///
    /// # Errors
    /// `Unauthenticated` without a principal, and backend errors.
    pub async fn get_own_profile(&self, session: &Session) -> Result<Option<UserProfile>, Error> {
        let principal = session.principal()?;
        self.get_user_profile(principal).await
    }

    /// Merge `update` into the principal's profile.
    ///
    /// Fields left as `None` are not written. An empty update does nothing.
    ///
    /// # Errors
    /// `Unauthenticated` without a principal, and backend errors.
    pub async fn update_own_profile(
        &self,
        session: &Session,
        update: &ProfileUpdate,
    ) -> Result<(), Error> {
        let principal = session.principal()?;
        if update.is_empty() {
            debug!(user_id = %principal, "empty profile update skipped");
            return Ok(());
        }
        let write = DocumentWrite::from_serializable(update).map_err(Self::map_store_error)?;
        self.documents
            .set(Collection::Users, principal.as_str(), write, SetMode::Merge)
            .await
            .map_err(Self::map_store_error)?;
        debug!(user_id = %principal, "profile updated");
        Ok(())
    }

    /// Create the principal's profile on first sign-in.
    ///
    /// An existing profile is returned untouched.
    ///
    /// # Errors
    /// `Unauthenticated` without a principal, and backend errors.
    pub async fn ensure_own_profile(
        &self,
        session: &Session,
        seed: ProfileSeed,
    ) -> Result<ProfileProvisioning, Error> {
        let principal = session.principal()?;
        if let Some(existing) = self.get_user_profile(principal).await? {
            return Ok(ProfileProvisioning::Existing(existing));
        }

        self.documents
            .set(
                Collection::Users,
                principal.as_str(),
                profile_creation_write(&seed),
                SetMode::Overwrite,
            )
            .await
            .map_err(Self::map_store_error)?;
        debug!(user_id = %principal, "profile created");

        let created = match self.get_user_profile(principal).await {
            Ok(Some(profile)) => profile,
            Ok(None) | Err(_) => {
                let mut profile = UserProfile::placeholder(principal.clone());
                profile.display_name = seed.display_name.unwrap_or_default();
                profile
            }
        };
        Ok(ProfileProvisioning::Created(created))
    }

    /// Upload the principal's avatar and return its download URL.
    ///
    /// The profile is not modified; pass the URL to
    /// [`update_own_profile`](Self::update_own_profile) to use it.
    ///
    /// # Errors
    /// `Unauthenticated` without a principal, and object store errors.
    pub async fn upload_avatar(&self, session: &Session, image: Vec<u8>) -> Result<Url, Error> {
        let principal = session.principal()?;
        let path = self.options.avatar_path(principal);
        self.objects
            .put(&path, image)
            .await
            .map_err(Self::map_object_error)?;
        self.objects
            .download_url(&path)
            .await
            .map_err(Self::map_object_error)
    }
}
