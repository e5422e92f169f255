//! Explicit principal context threaded into service operations.

use super::Error;
use super::ids::UserId;
use super::ports::IdentityProvider;

/// The caller of a service operation.
///
/// Resolve one per request from the identity provider, or build it
/// directly in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    principal: Option<UserId>,
}

impl Session {
    /// Session for a signed-in principal.
    pub fn authenticated(principal: UserId) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    /// Session with no principal.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Snapshot the identity provider's current principal.
    pub async fn resolve<P>(provider: &P) -> Self
    where
        P: IdentityProvider + ?Sized,
    {
        Self {
            principal: provider.current_principal().await,
        }
    }

    /// The principal, or [`ErrorCode::Unauthenticated`](super::ErrorCode::Unauthenticated).
    pub fn principal(&self) -> Result<&UserId, Error> {
        self.principal
            .as_ref()
            .ok_or_else(|| Error::unauthenticated("sign in required"))
    }

    /// The principal, if any.
    pub fn principal_opt(&self) -> Option<&UserId> {
        self.principal.as_ref()
    }

    /// Return `true` when a principal is present.
    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockIdentityProvider;
    use rstest::rstest;

    #[rstest]
    fn anonymous_session_is_unauthenticated() {
        let session = Session::anonymous();
        let err = session.principal().expect_err("no principal");
        assert_eq!(err.code(), ErrorCode::Unauthenticated);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn resolve_reads_current_principal() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_current_principal()
            .times(1)
            .return_once(|| Some(UserId::new("u1").expect("valid id")));

        let session = Session::resolve(&provider).await;
        assert_eq!(session.principal().map(UserId::as_str), Ok("u1"));
    }
}
