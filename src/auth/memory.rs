//! In-Memory Identity Provider
//!
//! Email/password accounts held in process memory. Passwords are stored as
//! salted BLAKE3 digests. Repeated failed sign-ins for one email are
//! throttled until a successful sign-in clears the counter.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

use super::provider::{codes, AuthStateStream, IdentityProvider, ProviderError, User};

/// Failed attempts allowed before sign-in is refused
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

const MIN_PASSWORD_CHARS: usize = 6;

struct Account {
    user: User,
    salt: String,
    digest: String,
}

#[derive(Default)]
struct Accounts {
    by_email: HashMap<String, Account>,
    failures: HashMap<String, u32>,
}

struct Shared {
    accounts: Mutex<Accounts>,
    current: watch::Sender<Option<User>>,
}

#[derive(Clone)]
pub struct MemoryIdentityProvider {
    shared: Arc<Shared>,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                accounts: Mutex::new(Accounts::default()),
                current,
            }),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.shared.current.borrow().clone()
    }

    fn set_current(&self, user: Option<User>) {
        self.shared.current.send_replace(user);
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// `local@domain.tld`, no whitespace
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_user(&self, email: &str, password: &str) -> Result<User, ProviderError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(ProviderError::new(codes::INVALID_EMAIL, "malformed email"));
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ProviderError::new(codes::WEAK_PASSWORD, "password too short"));
        }

        let user = {
            let mut accounts = self.shared.accounts.lock();
            if accounts.by_email.contains_key(&email) {
                return Err(ProviderError::new(codes::EMAIL_ALREADY_IN_USE, "account exists"));
            }
            let salt = Uuid::new_v4().to_string();
            let user = User {
                uid: Uuid::new_v4().to_string(),
                email: email.clone(),
            };
            accounts.by_email.insert(
                email,
                Account {
                    user: user.clone(),
                    digest: digest(&salt, password),
                    salt,
                },
            );
            user
        };

        self.set_current(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, ProviderError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(ProviderError::new(codes::INVALID_EMAIL, "malformed email"));
        }
        if password.is_empty() {
            return Err(ProviderError::new(codes::INVALID_CREDENTIAL, "empty password"));
        }

        let user = {
            let mut accounts = self.shared.accounts.lock();
            if accounts.failures.get(&email).copied().unwrap_or(0) >= MAX_FAILED_ATTEMPTS {
                return Err(ProviderError::new(codes::TOO_MANY_REQUESTS, "sign-in throttled"));
            }
            let verified = match accounts.by_email.get(&email) {
                None => return Err(ProviderError::new(codes::USER_NOT_FOUND, "no such account")),
                Some(account) => {
                    (digest(&account.salt, password) == account.digest).then(|| account.user.clone())
                }
            };
            match verified {
                Some(user) => {
                    accounts.failures.remove(&email);
                    user
                }
                None => {
                    *accounts.failures.entry(email).or_insert(0) += 1;
                    return Err(ProviderError::new(codes::WRONG_PASSWORD, "password mismatch"));
                }
            }
        };

        self.set_current(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.set_current(None);
        Ok(())
    }

    fn subscribe(&self) -> AuthStateStream {
        let changes = self.shared.current.subscribe();
        stream::unfold((changes, true), |(mut changes, first)| async move {
            if !first && changes.changed().await.is_err() {
                return None;
            }
            let user = changes.borrow_and_update().clone();
            Some((user, (changes, false)))
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_sign_in() {
        let provider = MemoryIdentityProvider::new();
        let created = provider.create_user("Ada@Example.com", "secret1").await.unwrap();
        assert_eq!(created.email, "ada@example.com");
        assert_eq!(provider.current_user(), Some(created.clone()));

        provider.sign_out().await.unwrap();
        assert_eq!(provider.current_user(), None);

        let signed_in = provider.sign_in("ada@example.com", "secret1").await.unwrap();
        assert_eq!(signed_in, created);
    }

    #[tokio::test]
    async fn test_validation_codes() {
        let provider = MemoryIdentityProvider::new();
        let code = |r: Result<User, ProviderError>| r.unwrap_err().code;

        assert_eq!(code(provider.create_user("not-an-email", "secret1").await), codes::INVALID_EMAIL);
        assert_eq!(code(provider.create_user("a@b.co", "12345").await), codes::WEAK_PASSWORD);
        provider.create_user("a@b.co", "123456").await.unwrap();
        assert_eq!(code(provider.create_user("A@B.co", "123456").await), codes::EMAIL_ALREADY_IN_USE);
        assert_eq!(code(provider.sign_in("x@b.co", "123456").await), codes::USER_NOT_FOUND);
        assert_eq!(code(provider.sign_in("a@b.co", "").await), codes::INVALID_CREDENTIAL);
        assert_eq!(code(provider.sign_in("a@b.co", "wrong!").await), codes::WRONG_PASSWORD);
    }

    #[tokio::test]
    async fn test_repeated_failures_are_throttled() {
        let provider = MemoryIdentityProvider::new();
        provider.create_user("a@b.co", "123456").await.unwrap();

        for _ in 0..MAX_FAILED_ATTEMPTS {
            let err = provider.sign_in("a@b.co", "nope!!").await.unwrap_err();
            assert_eq!(err.code, codes::WRONG_PASSWORD);
        }
        let err = provider.sign_in("a@b.co", "123456").await.unwrap_err();
        assert_eq!(err.code, codes::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_subscribe_reports_current_then_changes() {
        let provider = MemoryIdentityProvider::new();
        let mut states = provider.subscribe();
        assert_eq!(states.next().await, Some(None));

        let user = provider.create_user("a@b.co", "123456").await.unwrap();
        assert_eq!(states.next().await, Some(Some(user)));

        provider.sign_out().await.unwrap();
        assert_eq!(states.next().await, Some(None));
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@@b.co"));
        assert!(!is_valid_email("a b@c.co"));
        assert!(!is_valid_email("a@b..co"));
    }
}
