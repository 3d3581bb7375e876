//! Query documents in buckets.
//!
//! You're probably looking for [`Client::query`](crate::Client::query), which
//! plans, deduplicates and converts whole panel queries. This module is the
//! raw access to the `_query` and `_aggregate` endpoints.
mod client;
mod model;

pub use client::Client;
pub use model::*;
