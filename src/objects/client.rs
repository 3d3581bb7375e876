use std::fmt::Debug as FmtDebug;
use tracing::{instrument, warn};

use crate::{
    error::Result,
    http,
    objects::model::*,
};

/// Provides methods to query the documents of a bucket.
#[derive(Debug, Clone)]
pub struct Client {
    http_client: http::Client,
    tenant_id: String,
}

impl Client {
    pub(crate) fn new(http_client: http::Client, tenant_id: String) -> Self {
        Self {
            http_client,
            tenant_id,
        }
    }

    /// Run a filtered list query against a bucket.
    #[instrument(skip(self))]
    pub async fn query<N>(&self, bucket: N, req: QueryRequest) -> Result<Vec<Document>>
    where
        N: AsRef<str> + FmtDebug,
    {
        self.execute(bucket.as_ref(), &ObjectRequest::Query(req))
            .await
    }

    /// Run an aggregation pipeline against a bucket.
    #[instrument(skip(self))]
    pub async fn aggregate<N>(&self, bucket: N, req: AggregateRequest) -> Result<Vec<Document>>
    where
        N: AsRef<str> + FmtDebug,
    {
        self.execute(bucket.as_ref(), &ObjectRequest::Aggregate(req))
            .await
    }

    /// Get the most recently updated document of a bucket.
    ///
    /// Returns an empty object if the bucket is empty or the request fails.
    #[instrument(skip(self))]
    pub async fn latest<N>(&self, bucket: N) -> Document
    where
        N: AsRef<str> + FmtDebug,
    {
        let req = QueryRequest {
            filter: None,
            order: Some(format!("-{UPDATED_AT_FIELD}")),
            limit: Some(1),
        };
        match self.query(bucket, req).await {
            Ok(mut docs) if docs.len() == 1 => docs.remove(0),
            Ok(_) => Document::Object(Default::default()),
            Err(e) => {
                warn!(error = %e, "failed to fetch latest document");
                Document::Object(Default::default())
            }
        }
    }

    pub(crate) async fn execute(&self, bucket: &str, req: &ObjectRequest) -> Result<Vec<Document>> {
        let results: Results = self
            .http_client
            .post(req.path(&self.tenant_id, bucket), req)
            .await?
            .json()
            .await?;
        Ok(results.results)
    }
}
