//! Panel query targets.
//!
//! The host hands over targets in one of two shapes: the compact string form
//! (`bucket.field%aggr?where@ts`) saved by older dashboards, or the structured
//! object form. Both are parsed into the same [`QueryTarget`], and nothing
//! downstream ever looks at the raw shapes again.
//!
//! # Examples
//! ```
//! use baas_datasource::target::{ParseTarget, RawTarget};
//! use serde_json::json;
//!
//! let raw: RawTarget = serde_json::from_value(json!({
//!     "target": "sensors.payload.temperature@payload.timestamp"
//! }))?;
//! let target = raw.parse()?;
//! assert_eq!(target.bucket, "sensors");
//! assert_eq!(target.timestamp_field.as_deref(), Some("payload.timestamp"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::Result,
    path::{TimestampLookup, DEFAULT_TIMESTAMP_FIELD},
    template::TemplateSrv,
};

mod compact;
mod structured;

pub use compact::{CompactTarget, TargetSpec};
pub use structured::{CreateDataWith, StructuredTarget};

/// How a target's results are presented.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One `[value, epoch-ms]` series per field or series key.
    #[serde(rename = "timeserie")]
    TimeSeries,
    /// Columns and rows.
    #[serde(rename = "table")]
    Table,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::TimeSeries
    }
}

/// One declared field of a target.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DataField {
    /// Dotted path of the value in each document.
    #[serde(default)]
    pub field_name: String,
    /// Display name, defaults to `bucket.fieldName`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl DataField {
    /// Creates a field without an alias.
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            alias: None,
        }
    }

    /// Sets the alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The series label or column name of this field.
    #[must_use]
    pub fn label(&self, bucket: &str) -> String {
        match self.alias.as_deref() {
            Some(alias) if !alias.is_empty() => alias.to_string(),
            _ => format!("{}.{}", bucket, self.field_name),
        }
    }
}

/// Which values of a document end up in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSelection {
    /// Each declared field is one series or column.
    Fields(Vec<DataField>),
    /// The value of `name_field` names the series, `value_field` holds the
    /// value.
    SeriesKey {
        name_field: String,
        value_field: String,
    },
}

/// A normalized panel query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTarget {
    /// The host's identifier of the query row, if any.
    pub ref_id: Option<String>,
    /// The bucket to query.
    pub bucket: String,
    /// The timestamp field, `None` meaning "use the default".
    pub timestamp_field: Option<String>,
    /// Parsed aggregation stages. Switches the request to the aggregate
    /// endpoint.
    pub pipeline: Option<Vec<Value>>,
    /// Additional filter and-ed to the time range.
    pub filter: Option<Value>,
    /// Time series or table output.
    pub output: OutputMode,
    /// Field list or series-by-key selection.
    pub selection: DataSelection,
    /// Hidden targets are never requested.
    pub hidden: bool,
}

impl QueryTarget {
    /// Creates a visible time series target for the given bucket and fields.
    pub fn new(bucket: impl Into<String>, fields: Vec<DataField>) -> Self {
        Self {
            ref_id: None,
            bucket: bucket.into(),
            timestamp_field: None,
            pipeline: None,
            filter: None,
            output: OutputMode::TimeSeries,
            selection: DataSelection::Fields(fields),
            hidden: false,
        }
    }

    /// Whether the target can be turned into a request.
    ///
    /// Unresolvable targets are skipped, they are not an error.
    #[must_use]
    pub fn is_resolvable(&self) -> bool {
        if self.bucket.is_empty() {
            return false;
        }
        match &self.selection {
            DataSelection::Fields(fields) => fields.iter().any(|f| !f.field_name.is_empty()),
            DataSelection::SeriesKey {
                name_field,
                value_field,
            } => !name_field.is_empty() && !value_field.is_empty(),
        }
    }

    /// The timestamp field requests are filtered and ordered on.
    #[must_use]
    pub fn effective_timestamp_field(&self) -> &str {
        self.timestamp_field
            .as_deref()
            .unwrap_or(DEFAULT_TIMESTAMP_FIELD)
    }

    /// How document timestamps are located for this target.
    pub(crate) fn timestamp_lookup(&self, infer: bool) -> TimestampLookup<'_> {
        match self.timestamp_field.as_deref() {
            Some(field) => TimestampLookup::Field(field),
            None if infer => TimestampLookup::Infer,
            None => TimestampLookup::Field(DEFAULT_TIMESTAMP_FIELD),
        }
    }
}

/// A parse front-end producing a [`QueryTarget`].
pub trait ParseTarget: Sized {
    /// Whether the raw target is switched off and must not be parsed.
    fn is_hidden(&self) -> bool;

    /// Applies template substitution to every string the target carries.
    #[must_use]
    fn substitute(&self, templates: &dyn TemplateSrv) -> Self;

    /// Parses the (already substituted) target.
    ///
    /// # Errors
    /// If the target is malformed or carries invalid JSON.
    fn parse(&self) -> Result<QueryTarget>;
}

/// A target as saved by the dashboard, in either shape.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawTarget {
    /// `{"target": "bucket.field%aggr?where@ts"}`
    Compact(CompactTarget),
    /// Explicit bucket, fields and options.
    Structured(StructuredTarget),
}

impl From<CompactTarget> for RawTarget {
    fn from(target: CompactTarget) -> Self {
        RawTarget::Compact(target)
    }
}

impl From<StructuredTarget> for RawTarget {
    fn from(target: StructuredTarget) -> Self {
        RawTarget::Structured(target)
    }
}

impl ParseTarget for RawTarget {
    fn is_hidden(&self) -> bool {
        match self {
            RawTarget::Compact(t) => t.is_hidden(),
            RawTarget::Structured(t) => t.is_hidden(),
        }
    }

    fn substitute(&self, templates: &dyn TemplateSrv) -> Self {
        match self {
            RawTarget::Compact(t) => RawTarget::Compact(t.substitute(templates)),
            RawTarget::Structured(t) => RawTarget::Structured(t.substitute(templates)),
        }
    }

    fn parse(&self) -> Result<QueryTarget> {
        match self {
            RawTarget::Compact(t) => t.parse(),
            RawTarget::Structured(t) => t.parse(),
        }
    }
}

/// Reads an aggregation value as a list of pipeline stages.
///
/// Accepts a stage array or the older `{"pipeline": [...]}` wrapper. JSON
/// `null` means no aggregation.
pub(crate) fn pipeline_stages(value: Value) -> Result<Option<Vec<Value>>> {
    match value {
        Value::Null => Ok(None),
        Value::Array(stages) => Ok(Some(stages)),
        Value::Object(mut map) => match map.remove("pipeline") {
            Some(Value::Array(stages)) if map.is_empty() => Ok(Some(stages)),
            Some(other) => {
                map.insert("pipeline".to_string(), other);
                Err(crate::Error::InvalidPipeline(Value::Object(map).to_string()))
            }
            None => Err(crate::Error::InvalidPipeline(Value::Object(map).to_string())),
        },
        other => Err(crate::Error::InvalidPipeline(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::Error;

    #[test]
    fn test_resolvable() {
        let mut target = QueryTarget::new("bucket1", vec![DataField::new("field1")]);
        assert!(target.is_resolvable());

        target.selection = DataSelection::Fields(vec![DataField::new("")]);
        assert!(!target.is_resolvable());

        target.selection = DataSelection::Fields(vec![]);
        assert!(!target.is_resolvable());

        target.selection = DataSelection::SeriesKey {
            name_field: "name".to_string(),
            value_field: "value".to_string(),
        };
        assert!(target.is_resolvable());

        target.selection = DataSelection::SeriesKey {
            name_field: "name".to_string(),
            value_field: String::new(),
        };
        assert!(!target.is_resolvable());

        let target = QueryTarget::new("", vec![DataField::new("field1")]);
        assert!(!target.is_resolvable());
    }

    #[test]
    fn test_timestamp_default_only_when_requested() {
        let mut target = QueryTarget::new("bucket1", vec![DataField::new("field1")]);
        assert_eq!(target.timestamp_field, None);
        assert_eq!(target.effective_timestamp_field(), "updatedAt");
        assert_eq!(target.timestamp_lookup(true), TimestampLookup::Infer);
        assert_eq!(
            target.timestamp_lookup(false),
            TimestampLookup::Field("updatedAt")
        );

        target.timestamp_field = Some("ts".to_string());
        assert_eq!(target.effective_timestamp_field(), "ts");
        assert_eq!(target.timestamp_lookup(true), TimestampLookup::Field("ts"));
    }

    #[test]
    fn test_label() {
        assert_eq!(DataField::new("a.b").label("bucket"), "bucket.a.b");
        assert_eq!(DataField::new("a.b").with_alias("Temp").label("bucket"), "Temp");
        assert_eq!(DataField::new("a.b").with_alias("").label("bucket"), "bucket.a.b");
    }

    #[test]
    fn test_pipeline_stages() {
        assert_eq!(pipeline_stages(json!(null)).unwrap(), None);
        assert_eq!(
            pipeline_stages(json!([{ "$sort": { "a": 1 } }])).unwrap(),
            Some(vec![json!({ "$sort": { "a": 1 } })])
        );
        assert_eq!(
            pipeline_stages(json!({ "pipeline": [] })).unwrap(),
            Some(vec![])
        );
        assert!(matches!(
            pipeline_stages(json!({ "pipeline": 1 })),
            Err(Error::InvalidPipeline(_))
        ));
        assert!(matches!(
            pipeline_stages(json!({ "stages": [] })),
            Err(Error::InvalidPipeline(_))
        ));
        assert!(matches!(
            pipeline_stages(json!("$match")),
            Err(Error::InvalidPipeline(_))
        ));
    }

    #[test]
    fn test_raw_target_shapes() {
        let compact: RawTarget =
            serde_json::from_value(json!({ "target": "bucket1.field1", "refId": "A" })).unwrap();
        assert!(matches!(compact, RawTarget::Compact(_)));

        let structured: RawTarget = serde_json::from_value(json!({
            "refId": "B",
            "bucket": "bucket1",
            "dataField": [{ "fieldName": "field1" }]
        }))
        .unwrap();
        assert!(matches!(structured, RawTarget::Structured(_)));
    }
}
