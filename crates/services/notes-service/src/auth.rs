//! Source of the current user identity.
//!
//! Sign-in itself happens elsewhere; the repository only asks who is signed
//! in right now, once per operation.

use tokio::sync::watch;

use common::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Authenticator trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait Authenticator: Send + Sync {
    /// Id of the signed-in user, or `Unauthorized` when nobody is signed in
    fn current_user_id(&self) -> AppResult<String>;
}

/// Authenticator bound to one fixed user.
#[derive(Debug, Clone)]
pub struct StaticAuthenticator {
    user_id: String,
}

impl StaticAuthenticator {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl Authenticator for StaticAuthenticator {
    fn current_user_id(&self) -> AppResult<String> {
        Ok(self.user_id.clone())
    }
}

/// Authenticator whose user can change over time.
pub struct SessionAuthenticator {
    session: watch::Sender<Option<String>>,
}

impl SessionAuthenticator {
    /// Create a signed-out session
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self { session }
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        tracing::debug!(user_id = %user_id, "Session signed in");
        self.session.send_replace(Some(user_id));
    }

    pub fn sign_out(&self) {
        tracing::debug!("Session signed out");
        self.session.send_replace(None);
    }

    /// Observe sign-in and sign-out events
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.session.subscribe()
    }
}

impl Default for SessionAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl Authenticator for SessionAuthenticator {
    fn current_user_id(&self) -> AppResult<String> {
        self.session.borrow().clone().ok_or(AppError::Unauthorized)
    }
}
