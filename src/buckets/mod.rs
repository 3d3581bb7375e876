//! List the buckets of a tenant.
//!
//! The listing is fetched once and kept for the lifetime of the client.
//! Concurrent callers share a single in-flight request.
//!
//! # Examples
//! ```no_run
//! use baas_datasource::{Client, Error};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let client = Client::new()?;
//!
//!     for bucket in client.buckets.list().await {
//!         println!("{}", bucket.text);
//!     }
//!
//!     Ok(())
//! }
//! ```
mod client;
mod model;

pub use client::Client;
pub use model::*;
