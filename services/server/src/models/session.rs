//! Session model and related functionality

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Provider;

/// Server-side session record, stored under the cookie identifier
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    /// Authenticated user, if any
    #[serde(default)]
    pub user_id: Option<Uuid>,
    /// Where to send the browser after the next successful login
    #[serde(default)]
    pub return_to: Option<String>,
    /// OAuth handshake started by this browser and not yet completed
    #[serde(default)]
    pub oauth: Option<PendingOAuth>,
}

/// State kept between the redirect to a provider and its callback
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingOAuth {
    pub provider: Provider,
    pub csrf_state: String,
    pub pkce_verifier: String,
}
