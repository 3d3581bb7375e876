use serde_json::Value;

use super::{Column, Table};
use crate::{
    objects::Document,
    path::{extract_timestamp, extract_value, timestamp_value},
    target::{DataField, DataSelection, QueryTarget},
};

/// The name of the time column.
pub static TIME_COLUMN: &str = "Time";

/// Converts a response into a table.
///
/// If `table` is given, columns and rows are added to it instead of a fresh
/// table. A leading `Time` column is added only if some document has a
/// non-null value at the timestamp field, and never twice. A value that
/// doesn't parse as a time becomes a `null` time cell.
#[must_use]
pub fn convert_to_table(
    target: &QueryTarget,
    docs: &[Document],
    table: Option<Table>,
    infer_timestamps: bool,
) -> Table {
    let mut table = table.unwrap_or_default();
    let lookup = target.timestamp_lookup(infer_timestamps);
    let times: Vec<Value> = docs
        .iter()
        .map(|doc| {
            extract_timestamp(doc, lookup)
                .map_or(Value::Null, |ts| Value::from(ts.timestamp_millis()))
        })
        .collect();

    if docs.iter().any(|doc| timestamp_value(doc, lookup).is_some()) {
        add_time_column(&mut table);
    }

    match &target.selection {
        DataSelection::Fields(fields) => {
            field_rows(&mut table, &target.bucket, fields, docs, &times);
        }
        DataSelection::SeriesKey {
            name_field,
            value_field,
        } => keyed_rows(&mut table, name_field, value_field, docs, &times),
    }
    table
}

// Time is always the first column. Rows added before it existed get a null
// time cell.
fn add_time_column(table: &mut Table) {
    if table.has_column(TIME_COLUMN) {
        return;
    }
    table.columns.insert(
        0,
        Column {
            text: TIME_COLUMN.to_string(),
        },
    );
    for row in &mut table.rows {
        row.insert(0, Value::Null);
    }
}

fn field_rows(
    table: &mut Table,
    bucket: &str,
    fields: &[DataField],
    docs: &[Document],
    times: &[Value],
) {
    for field in fields {
        table.add_column_once(field.label(bucket));
    }
    let with_time = table.has_column(TIME_COLUMN);

    for (doc, time) in docs.iter().zip(times) {
        let cells: Vec<Value> = fields
            .iter()
            .map(|f| extract_value(doc, &f.field_name).cloned().unwrap_or(Value::Null))
            .collect();
        if cells.iter().all(Value::is_null) {
            continue;
        }

        let mut row = Vec::with_capacity(cells.len() + 1);
        if with_time {
            row.push(time.clone());
        }
        row.extend(cells);
        table.rows.push(row);
    }
}

// One row per series name, the last document of a name wins.
fn keyed_rows(
    table: &mut Table,
    name_field: &str,
    value_field: &str,
    docs: &[Document],
    times: &[Value],
) {
    table.add_column(name_field);
    table.add_column(value_field);
    let with_time = table.has_column(TIME_COLUMN) && table.columns.len() >= 3;
    let name_at = table.columns.len() - 2;

    for (doc, time) in docs.iter().zip(times) {
        let (name, value) = match (
            extract_value(doc, name_field),
            extract_value(doc, value_field),
        ) {
            (Some(name), Some(value)) => (name.clone(), value.clone()),
            _ => continue,
        };

        let mut row = Vec::with_capacity(3);
        if with_time {
            row.push(time.clone());
        }
        row.push(name);
        row.push(value);

        let existing = table
            .rows
            .iter()
            .position(|r| r.len() > name_at && r[name_at] == row[row.len() - 2]);
        match existing {
            Some(i) => table.rows[i] = row,
            None => table.rows.push(row),
        }
    }
}
