use super::{series_name, DataPoint, TimeSeries};
use crate::{
    objects::Document,
    path::{extract_timestamp, extract_value},
    query::TimeRange,
    target::{DataField, DataSelection, QueryTarget},
};

/// Converts a response into time series.
///
/// A field list target yields one series per field, in declaration order. A
/// series key target yields one series per distinct name, in order of first
/// appearance. Points whose document has no timestamp are placed at the end
/// of the range.
#[must_use]
pub fn convert_to_series(
    target: &QueryTarget,
    docs: &[Document],
    range: &TimeRange,
    infer_timestamps: bool,
) -> Vec<TimeSeries> {
    let lookup = target.timestamp_lookup(infer_timestamps);
    let fallback = range.to.timestamp_millis();
    let time_of = |doc: &Document| {
        extract_timestamp(doc, lookup).map_or(fallback, |ts| ts.timestamp_millis())
    };

    match &target.selection {
        DataSelection::Fields(fields) => fields
            .iter()
            .map(|field| field_series(&target.bucket, field, docs, &time_of))
            .collect(),
        DataSelection::SeriesKey {
            name_field,
            value_field,
        } => keyed_series(name_field, value_field, docs, &time_of),
    }
}

fn field_series(
    bucket: &str,
    field: &DataField,
    docs: &[Document],
    time_of: &dyn Fn(&Document) -> i64,
) -> TimeSeries {
    let datapoints = docs
        .iter()
        .filter_map(|doc| {
            let value = extract_value(doc, &field.field_name)?;
            Some(DataPoint(value.clone(), time_of(doc)))
        })
        .collect();

    TimeSeries {
        target: field.label(bucket),
        datapoints,
    }
}

fn keyed_series(
    name_field: &str,
    value_field: &str,
    docs: &[Document],
    time_of: &dyn Fn(&Document) -> i64,
) -> Vec<TimeSeries> {
    let mut series: Vec<TimeSeries> = Vec::new();
    for doc in docs {
        let name = match extract_value(doc, name_field) {
            Some(name) => series_name(name),
            None => continue,
        };
        let value = match extract_value(doc, value_field) {
            Some(value) => value.clone(),
            None => continue,
        };
        let point = DataPoint(value, time_of(doc));

        match series.iter_mut().find(|s| s.target == name) {
            Some(existing) => existing.datapoints.push(point),
            None => {
                let mut new = TimeSeries::new(name);
                new.datapoints.push(point);
                series.push(new);
            }
        }
    }
    series
}
