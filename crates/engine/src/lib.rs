//! Async HTTP core: streaming downloads and redirect resolution

mod error;
pub mod filename;
mod http;

pub use error::FetchError;
pub use http::{FetchConfig, Fetcher, Resolved};
