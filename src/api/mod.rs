//! Typed wrappers over the marketplace REST API.
//!
//! Each area gets a borrowed facade off [`ApiClient`]: `users()`, `products()`,
//! `moderator()`, `delivery_agent()`. Authentication flows through the shared
//! [`SessionManager`](crate::session::SessionManager); the wrappers never
//! redirect or notify, they surface `ApiError` and let the caller decide
//! (`ApiError::requires_login`).

mod client;
mod delivery_agent;
mod moderator;
mod products;
mod users;
pub mod models;

pub use client::ApiClient;
pub use delivery_agent::DeliveryAgentApi;
pub use moderator::ModeratorApi;
pub use products::ProductsApi;
pub use users::UsersApi;
