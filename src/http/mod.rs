//! HTTP client module used to stream source archives to disk.

mod client;
mod status;

pub use client::HttpClient;
pub use status::{USER_AGENT, classify_error};
