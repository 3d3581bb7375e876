use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use super::{pipeline_stages, DataField, DataSelection, OutputMode, ParseTarget, QueryTarget};
use crate::{
    error::{Error, Result},
    template::TemplateSrv,
};

/// The query editor's placeholder for an unset target.
static PLACEHOLDER: &str = "select metric";

// target%aggr?where@ts, only the leading target part is mandatory.
static TARGET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(.*?)(?:%(.*?))?(?:\?(.*?))?(?:@(.*))?$").expect("target pattern is valid")
});

/// A parsed compact target string, `bucket.field[.field...][%aggr][?where][@ts]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSpec {
    /// Name of the bucket, everything before the first dot.
    pub bucket_name: String,
    /// The dotted field path after the bucket.
    pub field_name: String,
    /// The aggregation JSON, if given.
    pub aggr: Option<Value>,
    /// The filter JSON, if given.
    pub filter: Option<Value>,
    /// The timestamp field, if given.
    pub ts_field: Option<String>,
}

impl FromStr for TargetSpec {
    type Err = Error;

    fn from_str(target: &str) -> Result<Self> {
        let caps = TARGET_RE
            .captures(target)
            .ok_or_else(|| Error::BadTarget(target.to_string()))?;

        let path = caps.get(1).map_or("", |m| m.as_str());
        let aggr = parse_json(caps.get(2).map(|m| m.as_str()), "aggr")?;
        let filter = parse_json(caps.get(3).map(|m| m.as_str()), "where")?;
        let ts_field = caps
            .get(4)
            .map(|m| m.as_str().to_string())
            .filter(|ts| !ts.is_empty());

        let (bucket_name, field_name) = path
            .split_once('.')
            .ok_or_else(|| Error::BadTarget(target.to_string()))?;

        Ok(Self {
            bucket_name: bucket_name.to_string(),
            field_name: field_name.to_string(),
            aggr,
            filter,
            ts_field,
        })
    }
}

/// Empty or absent JSON is `None`, not an empty object.
fn parse_json(json: Option<&str>, field: &'static str) -> Result<Option<Value>> {
    match json.map(str::trim) {
        None | Some("") => Ok(None),
        Some(json) => serde_json::from_str::<Value>(json)
            .map(|value| Some(value).filter(|v| !v.is_null()))
            .map_err(|source| Error::InvalidJson { field, source }),
    }
}

/// A target saved in the compact string form.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompactTarget {
    /// `bucket.field%aggr?where@ts`
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(default, deserialize_with = "crate::serde::deserialize_null_default")]
    pub hide: bool,
    #[serde(rename = "type", default, deserialize_with = "crate::serde::deserialize_null_default")]
    pub output: OutputMode,
}

impl CompactTarget {
    /// Creates a visible time series target.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }
}

impl ParseTarget for CompactTarget {
    fn is_hidden(&self) -> bool {
        self.hide || self.target == PLACEHOLDER
    }

    fn substitute(&self, templates: &dyn TemplateSrv) -> Self {
        Self {
            target: templates.replace(&self.target),
            ..self.clone()
        }
    }

    fn parse(&self) -> Result<QueryTarget> {
        let parsed: TargetSpec = self.target.parse()?;
        let pipeline = parsed.aggr.map(pipeline_stages).transpose()?.flatten();

        Ok(QueryTarget {
            ref_id: self.ref_id.clone(),
            bucket: parsed.bucket_name,
            timestamp_field: parsed.ts_field,
            pipeline,
            filter: parsed.filter,
            output: self.output,
            selection: DataSelection::Fields(vec![DataField::new(parsed.field_name)]),
            hidden: self.hide,
        })
    }
}
