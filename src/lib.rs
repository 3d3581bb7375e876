//! A dashboard datasource for document buckets of a BaaS backend.
//!
//! Panels describe what they want to see as targets: a bucket, one or more
//! dotted field paths, an optional aggregation pipeline and a time series or
//! table presentation. The [`Client`] turns a panel's targets into as few
//! backend requests as possible and reshapes the returned documents into
//! chart data.
//!
//! # Examples
//! ```no_run
//! use baas_datasource::{query::QueryOptions, Client};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .with_url("https://baas.example.com/api")
//!         .with_tenant_id("tenant1")
//!         .with_app_id("my-app")
//!         .with_app_key("my-key")
//!         .build()?;
//!
//!     // Offer the buckets in a variable picker
//!     let buckets = client.metric_find_query("buckets").await;
//!     dbg!(buckets);
//!
//!     // Query a panel
//!     let options: QueryOptions = serde_json::from_value(json!({
//!         "range": { "from": "2018-01-01T00:00:00Z", "to": "2018-02-01T00:00:00Z" },
//!         "maxDataPoints": 500,
//!         "targets": [
//!             { "target": "sensors.payload.temperature@payload.timestamp" },
//!             { "bucket": "sensors", "dataField": [{ "fieldName": "payload.humidity" }] }
//!         ]
//!     }))?;
//!     let results = client.query(&options).await?;
//!     println!("{}", serde_json::to_string_pretty(&results.data)?);
//!
//!     Ok(())
//! }
//! ```
pub mod client;
pub mod error;
mod http;
mod serde;

pub mod buckets;
pub mod completion;
pub mod convert;
pub mod objects;
pub mod path;
pub mod query;
pub mod target;
pub mod template;

pub use client::{Builder, Client, TestResult, TestStatus};
pub use error::{BaasError, Error, Result};
pub use template::TemplateSrv;

#[cfg(all(feature = "default-tls", feature = "native-tls"))]
compile_error!("Feature \"default-tls\" and \"native-tls\" cannot be enabled at the same time");

#[cfg(all(feature = "native-tls", feature = "rustls-tls"))]
compile_error!("Feature \"native-tls\" and \"rustls-tls\" cannot be enabled at the same time");

#[cfg(all(feature = "rustls-tls", feature = "default-tls"))]
compile_error!("Feature \"rustls-tls\" and \"default-tls\" cannot be enabled at the same time");
