//! Test doubles for the trait seams.
//!
//! - [`MockHttpClient`] - configurable responses, request recording
//! - [`InMemoryTokenStore`] - token slot in memory, failure toggles

pub mod http;
pub mod token_store;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use token_store::InMemoryTokenStore;
