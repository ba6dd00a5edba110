//! Data models shared by the stores, strategies and handlers

pub mod provider;
pub mod session;
pub mod user;

// Re-export for convenience
pub use provider::Provider;
pub use session::{PendingOAuth, SessionData};
pub use user::{LoginCredentials, NewUser, User, UserInfo};
