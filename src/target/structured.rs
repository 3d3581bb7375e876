use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{pipeline_stages, DataField, DataSelection, OutputMode, ParseTarget, QueryTarget};
use crate::{
    error::{Error, Result},
    serde::deserialize_null_default,
    template::TemplateSrv,
};

/// Selects how a structured target picks values out of documents.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CreateDataWith {
    /// Use the declared `dataField` list.
    DataField,
    /// Use `seriesNameKey` / `seriesValueKey`.
    SeriesKey,
}

impl Default for CreateDataWith {
    fn default() -> Self {
        CreateDataWith::DataField
    }
}

/// A target saved in the structured form by the query editor.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StructuredTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub hide: bool,
    #[serde(rename = "type", default, deserialize_with = "deserialize_null_default")]
    pub output: OutputMode,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub bucket: String,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub data_field: Vec<DataField>,
    /// Single field of targets saved before `dataField` existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    /// Alias of `fieldName`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts_field: Option<String>,
    /// JSON-encoded aggregation pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggr: Option<String>,
    #[serde(default, deserialize_with = "deserialize_null_default")]
    pub create_data_with: CreateDataWith,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_name_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_value_key: Option<String>,
}

impl StructuredTarget {
    /// Moves a legacy `fieldName`/`alias` pair into `dataField`.
    ///
    /// Applied once when the target is parsed; everything downstream only
    /// sees `dataField`.
    #[must_use]
    pub fn migrate(mut self) -> Self {
        let field_name = self.field_name.take().filter(|name| !name.is_empty());
        let alias = self.alias.take().filter(|alias| !alias.is_empty());
        if self.data_field.is_empty() {
            if let Some(field_name) = field_name {
                self.data_field.push(DataField { field_name, alias });
            }
        }
        self
    }
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

impl ParseTarget for StructuredTarget {
    fn is_hidden(&self) -> bool {
        self.hide
    }

    fn substitute(&self, templates: &dyn TemplateSrv) -> Self {
        let replace = |s: &Option<String>| s.as_deref().map(|s| templates.replace(s));
        Self {
            ref_id: self.ref_id.clone(),
            hide: self.hide,
            output: self.output,
            bucket: templates.replace(&self.bucket),
            data_field: self
                .data_field
                .iter()
                .map(|f| DataField {
                    field_name: templates.replace(&f.field_name),
                    alias: replace(&f.alias),
                })
                .collect(),
            field_name: replace(&self.field_name),
            alias: replace(&self.alias),
            ts_field: replace(&self.ts_field),
            aggr: replace(&self.aggr),
            create_data_with: self.create_data_with,
            series_name_key: replace(&self.series_name_key),
            series_value_key: replace(&self.series_value_key),
        }
    }

    fn parse(&self) -> Result<QueryTarget> {
        let target = self.clone().migrate();

        let pipeline = match non_empty(&target.aggr) {
            Some(aggr) => {
                let value = serde_json::from_str::<Value>(&aggr)
                    .map_err(|source| Error::InvalidJson { field: "aggr", source })?;
                pipeline_stages(value)?
            }
            None => None,
        };

        let selection = match target.create_data_with {
            CreateDataWith::DataField => DataSelection::Fields(
                target
                    .data_field
                    .into_iter()
                    .filter(|f| !f.field_name.is_empty())
                    .map(|f| DataField {
                        field_name: f.field_name,
                        alias: f.alias.filter(|alias| !alias.is_empty()),
                    })
                    .collect(),
            ),
            CreateDataWith::SeriesKey => DataSelection::SeriesKey {
                name_field: target.series_name_key.unwrap_or_default(),
                value_field: target.series_value_key.unwrap_or_default(),
            },
        };

        Ok(QueryTarget {
            ref_id: target.ref_id,
            bucket: target.bucket,
            timestamp_field: non_empty(&target.ts_field),
            pipeline,
            filter: None,
            output: target.output,
            selection,
            hidden: target.hide,
        })
    }
}
