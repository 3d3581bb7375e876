use super::request::ResolvedRequest;
use crate::target::QueryTarget;

/// The distinct requests for a set of targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Deduped {
    /// Distinct requests, in order of first use.
    pub requests: Vec<ResolvedRequest>,
    /// For each input target, the index of its request.
    pub req_index: Vec<usize>,
}

/// Groups targets that would issue the same request.
///
/// Each target is assigned the request of the first earlier target with an
/// equal key, or a new request if there is none. This only saves requests:
/// every target still gets exactly the response its own request would have
/// produced.
#[must_use]
pub fn dedupe(targets: &[QueryTarget]) -> Deduped {
    let mut requests: Vec<ResolvedRequest> = Vec::new();
    let req_index = targets
        .iter()
        .map(|target| {
            let request = ResolvedRequest::for_target(target);
            match requests.iter().position(|r| *r == request) {
                Some(i) => i,
                None => {
                    requests.push(request);
                    requests.len() - 1
                }
            }
        })
        .collect();

    Deduped {
        requests,
        req_index,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::target::{DataField, ParseTarget, StructuredTarget};

    fn target(bucket: &str, ts: Option<&str>, aggr: Option<&str>) -> QueryTarget {
        StructuredTarget {
            bucket: bucket.to_string(),
            data_field: vec![DataField::new("field1")],
            ts_field: ts.map(String::from),
            aggr: aggr.map(String::from),
            ..StructuredTarget::default()
        }
        .parse()
        .expect("valid target")
    }

    #[test]
    fn test_same_request_is_shared() {
        let deduped = dedupe(&[
            target("bucket1", Some("ts"), None),
            target("bucket1", Some("ts"), None),
        ]);
        assert_eq!(deduped.requests.len(), 1);
        assert_eq!(deduped.req_index, vec![0, 0]);
    }

    #[test]
    fn test_first_seen_wins() {
        let deduped = dedupe(&[
            target("bucket1", None, None),
            target("bucket2", None, None),
            target("bucket1", None, None),
            target("bucket1", Some("createdAt"), None),
            target("bucket2", None, None),
        ]);
        assert_eq!(deduped.requests.len(), 3);
        assert_eq!(deduped.req_index, vec![0, 1, 0, 2, 1]);
        assert_eq!(deduped.requests[2].timestamp_field, "createdAt");
    }

    #[test]
    fn test_default_timestamp_matches_explicit() {
        let deduped = dedupe(&[
            target("bucket1", None, None),
            target("bucket1", Some("updatedAt"), None),
        ]);
        assert_eq!(deduped.req_index, vec![0, 0]);
    }

    #[test]
    fn test_aggregation_compared_structurally() {
        let deduped = dedupe(&[
            target("bucket1", None, Some(r#"[{"$sort":{"a":1,"b":-1}}]"#)),
            target("bucket1", None, Some("[ { \"$sort\": { \"b\": -1, \"a\": 1 } } ]")),
            target("bucket1", None, Some(r#"[{"$sort":{"a":-1,"b":-1}}]"#)),
            target("bucket1", None, None),
        ]);
        assert_eq!(deduped.requests.len(), 3);
        assert_eq!(deduped.req_index, vec![0, 0, 1, 2]);
    }

    #[test]
    fn test_filter_is_part_of_the_key() {
        let mut filtered = target("bucket1", None, None);
        filtered.filter = Some(json!({ "status": "ok" }));
        let deduped = dedupe(&[target("bucket1", None, None), filtered]);
        assert_eq!(deduped.req_index, vec![0, 1]);
    }

    #[test]
    fn test_every_index_points_to_an_equal_request() {
        let targets = vec![
            target("a", None, None),
            target("b", Some("t1"), None),
            target("a", Some("t1"), Some("[]")),
            target("b", Some("t1"), None),
            target("a", None, Some("[ ]")),
            target("a", Some("updatedAt"), None),
        ];
        let deduped = dedupe(&targets);
        for (target, i) in targets.iter().zip(&deduped.req_index) {
            assert_eq!(deduped.requests[*i], ResolvedRequest::for_target(target));
        }
        assert_eq!(deduped.requests.len(), 4);
    }

    #[test]
    fn test_empty() {
        let deduped = dedupe(&[]);
        assert!(deduped.requests.is_empty());
        assert!(deduped.req_index.is_empty());
    }
}
