//! Identity provider with a settable principal.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::UserId;
use crate::domain::ports::IdentityProvider;

/// Reports whichever principal was last signed in.
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    principal: RwLock<Option<UserId>>,
}

impl StaticIdentityProvider {
    /// Provider with `principal` signed in.
    pub fn signed_in(principal: UserId) -> Self {
        Self {
            principal: RwLock::new(Some(principal)),
        }
    }

    /// Provider with nobody signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Replace the signed-in principal.
    pub fn sign_in(&self, principal: UserId) {
        *self
            .principal
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(principal);
    }

    /// Clear the signed-in principal.
    pub fn sign_out(&self) {
        *self
            .principal
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn current_principal(&self) -> Option<UserId> {
        self.principal
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
