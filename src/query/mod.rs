//! Panel queries: from raw targets to converted results.
//!
//! A query runs in four steps. Raw targets are substituted, parsed and
//! filtered down to the visible, resolvable ones. Targets that would issue the
//! same backend request are grouped. The distinct requests run concurrently,
//! and each target's result is converted from its request's response.
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    convert::{self, QueryResult},
    error::Result,
    objects,
    target::{ParseTarget, QueryTarget, RawTarget},
    template::TemplateSrv,
};

mod dedupe;
mod request;

pub use dedupe::{dedupe, Deduped};
pub use request::ResolvedRequest;

/// The time range of a panel.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// The options the host passes to a query.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    pub range: TimeRange,
    /// Upper bound of documents per request.
    pub max_data_points: u64,
    #[serde(default)]
    pub targets: Vec<RawTarget>,
}

/// The converted results of a query, in target order.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct QueryResults {
    pub data: Vec<QueryResult>,
}

/// Substitutes and parses raw targets, dropping hidden and unresolvable
/// ones.
///
/// # Errors
/// If a visible target is malformed.
pub fn resolve_targets(
    targets: &[RawTarget],
    templates: &dyn TemplateSrv,
) -> Result<Vec<QueryTarget>> {
    let mut resolved = Vec::with_capacity(targets.len());
    for raw in targets.iter().filter(|t| !t.is_hidden()) {
        let target = raw.substitute(templates).parse()?;
        if target.hidden || !target.is_resolvable() {
            continue;
        }
        resolved.push(target);
    }
    Ok(resolved)
}

pub(crate) async fn execute(
    objects: &objects::Client,
    templates: &dyn TemplateSrv,
    infer_timestamps: bool,
    options: &QueryOptions,
) -> Result<QueryResults> {
    let targets = resolve_targets(&options.targets, templates)?;
    if targets.is_empty() {
        debug!("no targets to query");
        return Ok(QueryResults::default());
    }

    let deduped = dedupe(&targets);
    debug!(
        targets = targets.len(),
        requests = deduped.requests.len(),
        "planned query"
    );

    let responses = try_join_all(deduped.requests.iter().map(|req| {
        let body = req.body(&options.range, options.max_data_points);
        debug!(bucket = %req.bucket, body = ?body, "issuing request");
        async move { objects.execute(&req.bucket, &body).await }
    }))
    .await?;

    let data = targets
        .iter()
        .zip(&deduped.req_index)
        .flat_map(|(target, i)| {
            convert::convert(target, &responses[*i], &options.range, infer_timestamps)
        })
        .collect();

    Ok(QueryResults { data })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::template::Identity;

    fn raw(value: serde_json::Value) -> RawTarget {
        serde_json::from_value(value).expect("valid raw target")
    }

    #[test]
    fn test_resolve_drops_hidden_and_unresolvable() {
        let targets = vec![
            raw(json!({ "bucket": "b1", "dataField": [{ "fieldName": "f" }] })),
            raw(json!({ "bucket": "b1", "dataField": [{ "fieldName": "f" }], "hide": true })),
            raw(json!({ "bucket": "", "dataField": [{ "fieldName": "f" }] })),
            raw(json!({ "bucket": "b2", "dataField": [] })),
            raw(json!({ "bucket": "b2", "createDataWith": "seriesKey", "seriesNameKey": "n" })),
            raw(json!({ "target": "select metric" })),
            raw(json!({ "target": "b3.f", "hide": true })),
            raw(json!({ "target": "b4.f" })),
        ];
        let resolved = resolve_targets(&targets, &Identity).unwrap();
        let buckets: Vec<&str> = resolved.iter().map(|t| t.bucket.as_str()).collect();
        assert_eq!(buckets, vec!["b1", "b4"]);
    }

    #[test]
    fn test_hidden_targets_are_not_parsed() {
        let targets = vec![raw(json!({ "target": "broken", "hide": true }))];
        assert!(resolve_targets(&targets, &Identity).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_visible_target_fails() {
        let targets = vec![raw(json!({ "target": "broken" }))];
        assert!(matches!(
            resolve_targets(&targets, &Identity),
            Err(crate::Error::BadTarget(_))
        ));
    }

    #[test]
    fn test_templates_applied_before_resolving() {
        let targets = vec![raw(json!({ "bucket": "$b", "dataField": [{ "fieldName": "f" }] }))];
        let empty = |s: &str| s.replace("$b", "");
        assert!(resolve_targets(&targets, &empty).unwrap().is_empty());
        let named = |s: &str| s.replace("$b", "sensors");
        assert_eq!(resolve_targets(&targets, &named).unwrap()[0].bucket, "sensors");
    }

    #[test]
    fn test_options_from_host_json() {
        let options: QueryOptions = serde_json::from_value(json!({
            "range": { "from": "2018-01-01T00:00:00.000Z", "to": "2018-02-01T00:00:00.000Z" },
            "maxDataPoints": 500,
            "targets": [{ "target": "bucket1.field1@tsfield" }]
        }))
        .unwrap();
        assert_eq!(options.max_data_points, 500);
        assert_eq!(options.range.to.timestamp_millis(), 1_517_443_200_000);
        assert_eq!(options.targets.len(), 1);
    }
}
