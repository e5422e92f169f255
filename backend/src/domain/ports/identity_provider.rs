//! Port for the authentication provider.

use async_trait::async_trait;

use crate::domain::UserId;

/// Reports who is signed in.
///
/// Sign-in flows live outside this crate; the service only needs the
/// current principal's id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in principal, if any.
    async fn current_principal(&self) -> Option<UserId>;
}
