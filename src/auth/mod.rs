//! Authentication
//!
//! The session manager follows an identity provider's auth state and turns
//! provider failures into a small set of user-facing errors.

mod error;
mod memory;
mod provider;
mod session;

pub use error::AuthError;
pub use memory::MemoryIdentityProvider;
pub use provider::{codes, AuthStateStream, IdentityProvider, ProviderError, User};
pub use session::{Session, SessionManager};
