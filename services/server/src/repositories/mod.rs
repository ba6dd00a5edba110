//! User persistence
//!
//! [`UserStore`] is the seam between the authentication strategies and the
//! storage backend. [`PgUserRepository`] backs production deployments and
//! [`MemoryUserRepository`] backs `STORE_BACKEND=memory`.

use async_trait::async_trait;
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{NewUser, Provider, User};

pub mod memory;
pub mod user;

pub use memory::MemoryUserRepository;
pub use user::PgUserRepository;

/// Storage operations required by the credential verifier and OAuth delegate
///
/// Email uniqueness is enforced by the store itself: `create` must fail with
/// [`DatabaseError::UniqueViolation`](common::error::DatabaseError::UniqueViolation)
/// when the email is taken, whatever the caller checked beforehand.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by (normalized) email
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>>;

    /// Create a new user
    async fn create(&self, new_user: &NewUser) -> DatabaseResult<User>;

    /// Return the user linked to an OAuth identity, creating an account when
    /// the email is new
    ///
    /// An existing account with the same email is linked only if it has no
    /// password and no other identity from this provider. Otherwise the call
    /// fails with [`DatabaseError::UniqueViolation`](common::error::DatabaseError::UniqueViolation).
    async fn upsert_oauth(
        &self,
        provider: Provider,
        provider_id: &str,
        email: &str,
    ) -> DatabaseResult<User>;
}
