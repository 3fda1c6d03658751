//! # Data Retrieval Module
//!
//! The one place HTTP happens. Both the Bugzilla tracker and the Smartsheet
//! destination are thin typed layers over [`ApiClient`].
//!
//! ## Contained Modules:
//!
//! - **`api_client`**: a generic `ApiClient` built on `reqwest` and
//!   `reqwest-middleware`, retrying transient failures with exponential
//!   backoff, joining relative paths onto a base URL and injecting a Bearer
//!   token.

/// Generic HTTP API client with retry middleware.
pub mod api_client;

pub use api_client::{ApiClient, ApiResponse, RetrieveError};
