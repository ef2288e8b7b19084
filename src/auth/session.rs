//! Session Manager
//!
//! `unresolved -> resolved(user) | resolved(anonymous)`. The manager holds the
//! single subscription to the provider's auth state for its whole lifetime.

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::error::AuthError;
use super::provider::{IdentityProvider, ProviderError, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    /// True until the provider first reports the auth state
    pub loading: bool,
}

impl Session {
    pub fn unresolved() -> Self {
        Self { user: None, loading: true }
    }

    pub fn anonymous() -> Self {
        Self { user: None, loading: false }
    }

    pub fn signed_in(user: User) -> Self {
        Self {
            user: Some(user),
            loading: false,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.uid.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    state: Arc<watch::Sender<Session>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Subscribe to `provider` and start tracking the session.
    /// Must be called within a Tokio runtime.
    pub fn start(provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(Session::unresolved());
        let state = Arc::new(state);

        let mut changes = provider.subscribe();
        let sink = state.clone();
        let listener = tokio::spawn(async move {
            while let Some(user) = changes.next().await {
                match &user {
                    Some(u) => tracing::info!(uid = %u.uid, "session resolved: signed in"),
                    None => tracing::info!("session resolved: anonymous"),
                }
                sink.send_replace(Session { user, loading: false });
            }
        });

        Self {
            provider,
            state,
            listener: Mutex::new(Some(listener)),
        }
    }

    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn watch(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Resolves once the provider has reported the auth state
    pub async fn resolved(&self) -> Session {
        let mut rx = self.watch();
        let resolved = match rx.wait_for(|s| !s.loading).await {
            Ok(session) => session.clone(),
            Err(_) => self.session(),
        };
        resolved
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.provider
            .create_user(email, password)
            .await
            .map_err(|e| normalize("register", e))
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.provider
            .sign_in(email, password)
            .await
            .map_err(|e| normalize("authenticate", e))
    }

    pub async fn end_session(&self) -> Result<(), AuthError> {
        self.provider.sign_out().await.map_err(|e| normalize("end_session", e))
    }

    /// Drop the auth-state subscription
    pub fn shutdown(&self) {
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn normalize(op: &str, err: ProviderError) -> AuthError {
    let normalized = AuthError::from(err.clone());
    tracing::warn!(op, code = %err.code, detail = %err.message, "auth request failed");
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryIdentityProvider;

    #[tokio::test]
    async fn test_resolves_anonymous_then_follows_sign_in() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let manager = SessionManager::start(provider.clone());

        let session = manager.resolved().await;
        assert_eq!(session, Session::anonymous());

        let user = manager.register("a@b.co", "123456").await.unwrap();
        let mut rx = manager.watch();
        let session = rx.wait_for(|s| s.is_authenticated()).await.unwrap().clone();
        assert_eq!(session.user_id(), Some(user.uid.as_str()));

        manager.end_session().await.unwrap();
        rx.wait_for(|s| !s.is_authenticated()).await.unwrap();
        assert!(!manager.loading());
    }

    #[tokio::test]
    async fn test_resolves_to_existing_user() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let user = provider.create_user("a@b.co", "123456").await.unwrap();

        let manager = SessionManager::start(provider);
        assert!(manager.loading());
        let session = manager.resolved().await;
        assert_eq!(session, Session::signed_in(user.clone()));
        assert_eq!(manager.user(), Some(user));
    }

    #[tokio::test]
    async fn test_errors_are_normalized() {
        let manager = SessionManager::start(Arc::new(MemoryIdentityProvider::new()));
        assert_eq!(manager.register("bad", "123456").await.unwrap_err(), AuthError::InvalidEmail);
        assert_eq!(manager.authenticate("a@b.co", "123456").await.unwrap_err(), AuthError::UserNotFound);
        assert_eq!(
            manager.register("a@b.co", "123").await.unwrap_err().message(),
            "Password must be at least 6 characters."
        );
    }

    #[tokio::test]
    async fn test_shutdown_stops_following_provider() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let manager = SessionManager::start(provider.clone());
        manager.resolved().await;
        manager.shutdown();

        provider.create_user("a@b.co", "123456").await.unwrap();
        tokio::task::yield_now().await;
        assert_eq!(manager.session(), Session::anonymous());
    }
}
