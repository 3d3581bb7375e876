//! Reshaping backend documents into chart data.
//!
//! A target's response becomes either time series (`[value, epoch-ms]`
//! pairs) or a table. Missing and null values never fail a conversion, each
//! mode has its own rule for what to do with them:
//!
//! | mode                   | null value        | no timestamp          |
//! |------------------------|-------------------|-----------------------|
//! | series, field list     | point skipped     | end of range          |
//! | series, by series key  | document skipped  | end of range          |
//! | table, field list      | null cell         | null time cell        |
//! | table, by series key   | document skipped  | null time cell        |
//!
//! A table row of a field list target is only kept if one of its data cells
//! is non-null. A table gets its leading `Time` column as soon as any
//! document has a non-null timestamp value, even one that doesn't parse; that
//! document's time cell is then null.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    objects::Document,
    query::TimeRange,
    target::{OutputMode, QueryTarget},
};

mod series;
mod table;

pub use series::convert_to_series;
pub use table::{convert_to_table, TIME_COLUMN};

/// A `[value, epoch-ms]` sample.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DataPoint(pub Value, pub i64);

/// A labelled series of data points.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeSeries {
    /// The label of the series.
    pub target: String,
    pub datapoints: Vec<DataPoint>,
}

impl TimeSeries {
    /// Creates an empty series.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            datapoints: Vec::new(),
        }
    }
}

/// A table column.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub text: String,
}

/// Columns and rows, serialized with `"type": "table"`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(tag = "type", rename = "table")]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Whether a column with this name exists.
    #[must_use]
    pub fn has_column(&self, text: &str) -> bool {
        self.columns.iter().any(|c| c.text == text)
    }

    /// Adds a column unless one with the same name exists.
    pub fn add_column_once(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !self.has_column(&text) {
            self.columns.push(Column { text });
        }
    }

    /// Adds a column even if one with the same name exists.
    pub fn add_column(&mut self, text: impl Into<String>) {
        self.columns.push(Column { text: text.into() });
    }
}

/// One converted result fragment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum QueryResult {
    Table(Table),
    TimeSeries(TimeSeries),
}

/// Converts the response of a target's request according to its output
/// mode.
#[must_use]
pub fn convert(
    target: &QueryTarget,
    docs: &[Document],
    range: &TimeRange,
    infer_timestamps: bool,
) -> Vec<QueryResult> {
    match target.output {
        OutputMode::TimeSeries => convert_to_series(target, docs, range, infer_timestamps)
            .into_iter()
            .map(QueryResult::TimeSeries)
            .collect(),
        OutputMode::Table => vec![QueryResult::Table(convert_to_table(
            target,
            docs,
            None,
            infer_timestamps,
        ))],
    }
}

/// The label of a series named by a document value.
pub(crate) fn series_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
