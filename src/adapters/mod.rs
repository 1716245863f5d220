//! Concrete implementations of the trait seams in `crate::traits`.
//!
//! - [`ReqwestHttpClient`] - HTTP over reqwest
//! - [`FileTokenStore`] - token slot in `~/.memberpass/storage.json`
//!
//! The [`mock`] submodule holds the test doubles.

pub mod file_token_store;
pub mod mock;
pub mod reqwest_http;

pub use file_token_store::FileTokenStore;
pub use mock::{InMemoryTokenStore, MockHttpClient, MockResponse};
pub use reqwest_http::ReqwestHttpClient;
