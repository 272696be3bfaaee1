//! Explicit session handed to backend implementations.
//!
//! The token and profile are produced by whatever login flow the host
//! application runs; this crate only carries them.

use serde::{Deserialize, Serialize};

use invoiceflow_core::{TenantId, UserId};

/// Cached profile of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    tenant_id: TenantId,
    token: Option<String>,
    user: Option<UserProfile>,
}

impl Session {
    /// Session without credentials.
    pub fn anonymous(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            token: None,
            user: None,
        }
    }

    pub fn with_token(tenant_id: TenantId, token: impl Into<String>) -> Self {
        Self {
            tenant_id,
            token: Some(token.into()),
            user: None,
        }
    }

    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.user = Some(user);
        self
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Forget the token and profile (logout).
    pub fn sign_out(&mut self) {
        self.token = None;
        self.user = None;
    }
}

// Never print the bearer token.
impl core::fmt::Debug for Session {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("tenant_id", &self.tenant_id)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_token() {
        let session = Session::with_token(TenantId::new(), "secret-token");
        let printed = format!("{session:?}");
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn sign_out_clears_credentials() {
        let user = UserProfile {
            id: UserId::new(),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
        };
        let mut session = Session::with_token(TenantId::new(), "t").with_user(user);
        assert!(session.is_authenticated());
        assert!(session.user().is_some());

        session.sign_out();
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
    }

    #[test]
    fn empty_token_is_not_authenticated() {
        assert!(!Session::with_token(TenantId::new(), "").is_authenticated());
        assert!(!Session::anonymous(TenantId::new()).is_authenticated());
    }
}
