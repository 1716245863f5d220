//! Seams for dependency injection.
//!
//! - [`HttpClient`] - GET/POST transport
//! - [`TokenStore`] - the persisted bearer token slot

pub mod http;
pub mod token_store;

pub use http::{Headers, HttpClient, HttpError, Response};
pub use token_store::{TokenStore, TokenStoreError, TOKEN_KEY};
