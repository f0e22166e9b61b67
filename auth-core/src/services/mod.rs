//! Services layer: caller-facing facade, credential signing, sessions and
//! the supporting cache, policy and notification seams.

pub mod auth;
pub mod cache;
pub mod error;
pub mod jwt;
pub mod notifier;
pub mod policy;
pub mod session;

pub use auth::AuthService;
pub use cache::{CacheError, EphemeralCache, MemoryCache, RedisCache};
pub use error::AuthError;
pub use jwt::JwtService;
pub use notifier::{LogNotifier, MockNotifier, ResetCodeNotifier};
pub use policy::{PasswordPolicy, PolicyError};
pub use session::SessionIssuer;
