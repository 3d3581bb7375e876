use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::serde::deserialize_null_default;

/// A document returned by the backend. Arbitrarily nested, any field may be
/// absent or null.
pub type Document = Value;

/// The field the backend stamps on every write.
pub static UPDATED_AT_FIELD: &str = "updatedAt";

/// Body of a filtered list query (`_query`).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    /// The filter documents have to match.
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Sort field, prefixed with `-` for descending order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    /// Maximum number of documents to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

/// Body of an aggregation query (`_aggregate`).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AggregateRequest {
    /// The stages, executed in order.
    pub pipeline: Vec<Value>,
}

/// A request against one of the two object endpoints.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ObjectRequest {
    Query(QueryRequest),
    Aggregate(AggregateRequest),
}

impl ObjectRequest {
    /// The path of the endpoint, relative to the base URL.
    #[must_use]
    pub fn path(&self, tenant_id: &str, bucket: &str) -> String {
        let endpoint = match self {
            ObjectRequest::Query(_) => "_query",
            ObjectRequest::Aggregate(_) => "_aggregate",
        };
        format!("/1/{tenant_id}/objects/{bucket}/{endpoint}")
    }
}

/// The backend's answer to a query or aggregation.
#[derive(Serialize, Deserialize, Debug, Default)]
pub(crate) struct Results {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub(crate) results: Vec<Document>,
}
