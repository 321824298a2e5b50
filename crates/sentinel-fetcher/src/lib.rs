//! Single-attempt HTML retrieval for the analysis pipeline.

pub mod client;
pub mod error;

pub use client::{HtmlFetcher, MAX_BODY_BYTES};
pub use error::FetchError;
