use serde::{Deserialize, Serialize};

use crate::serde::deserialize_null_default;

/// A bucket as reported by the backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    /// The name of the bucket.
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub(crate) struct BucketList {
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub(crate) results: Vec<Bucket>,
}

/// An entry offered by the host's variable and bucket pickers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MetricFindValue {
    pub text: String,
    pub value: String,
}

impl From<Bucket> for MetricFindValue {
    fn from(bucket: Bucket) -> Self {
        Self {
            text: bucket.name.clone(),
            value: bucket.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_bucket_list() {
        let list: BucketList = serde_json::from_value(json!({
            "results": [{ "name": "sensors", "acl": {} }, { "name": "logs" }]
        }))
        .unwrap();
        let values: Vec<MetricFindValue> = list.results.into_iter().map(Into::into).collect();
        assert_eq!(
            serde_json::to_value(values).unwrap(),
            json!([
                { "text": "sensors", "value": "sensors" },
                { "text": "logs", "value": "logs" }
            ])
        );
    }
}
