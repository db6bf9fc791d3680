//! Client-side session management for the marketplace.
//! Keep the public surface thin and split implementation across sub-modules.

mod manager;
mod models;
mod transport;
pub mod expiry;

pub use manager::SessionManager;
pub use models::{AuthHeader, DeliveryAgentHeaders, SessionState, TokenPair, UserProfile, CSRF_HEADER, JSON_CONTENT_TYPE};
pub use transport::{AuthTransport, HttpAuthTransport, CSRF_PATH, REFRESH_PATH};
