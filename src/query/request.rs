use serde_json::{json, Value};

use super::TimeRange;
use crate::{
    objects::{AggregateRequest, ObjectRequest, QueryRequest},
    serde::iso_millis,
    target::QueryTarget,
};

/// One distinct backend call, shared by every target that would issue the
/// same request.
///
/// Equality is structural: pipelines and filters compare as parsed JSON, so
/// whitespace and key order in the saved target don't matter.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub bucket: String,
    /// The timestamp field, with the default already applied.
    pub timestamp_field: String,
    pub pipeline: Option<Vec<Value>>,
    pub filter: Option<Value>,
}

impl ResolvedRequest {
    /// The request `target` issues.
    #[must_use]
    pub fn for_target(target: &QueryTarget) -> Self {
        Self {
            bucket: target.bucket.clone(),
            timestamp_field: target.effective_timestamp_field().to_string(),
            pipeline: target.pipeline.clone(),
            filter: target.filter.clone(),
        }
    }

    /// Composes the request body for the given range.
    ///
    /// Without a pipeline this is a filtered list query ordered by the
    /// timestamp field. With one, a `$match` on the range is put before the
    /// caller's stages and a `$limit` after them.
    #[must_use]
    pub fn body(&self, range: &TimeRange, max_data_points: u64) -> ObjectRequest {
        let filter = self.range_filter(range);
        match &self.pipeline {
            None => ObjectRequest::Query(QueryRequest {
                filter: Some(filter),
                order: Some(self.timestamp_field.clone()),
                limit: Some(max_data_points),
            }),
            Some(stages) => {
                let mut pipeline = Vec::with_capacity(stages.len() + 2);
                pipeline.push(json!({ "$match": filter }));
                pipeline.extend(stages.iter().cloned());
                pipeline.push(json!({ "$limit": max_data_points }));
                ObjectRequest::Aggregate(AggregateRequest { pipeline })
            }
        }
    }

    fn range_filter(&self, range: &TimeRange) -> Value {
        let ts = &self.timestamp_field;
        let mut and = vec![
            json!({ ts: { "$gte": iso_millis(&range.from) } }),
            json!({ ts: { "$lte": iso_millis(&range.to) } }),
        ];
        if let Some(filter) = &self.filter {
            and.push(filter.clone());
        }
        json!({ "$and": and })
    }
}
