//! Web boundary for hoard.
//!
//! A thin HTTP layer over the [`crate::service::StorageService`] facade:
//! it parses and type-checks incoming requests, forwards already-typed
//! inputs to the core, and renders the core's typed results into
//! transport status codes. No authentication or session handling lives
//! here; an optional opaque owner id is passed through as-is.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
