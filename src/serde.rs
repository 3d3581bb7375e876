use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{Deserialize, Deserializer};

/// Set `deserialize_with` to this fn to get the default if null.
/// See <https://github.com/serde-rs/serde/issues/1098#issuecomment-760711617>
pub(crate) fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    T: Default + Deserialize<'de>,
    D: Deserializer<'de>,
{
    let opt = Option::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

/// Formats a time the way the backend expects range bounds, e.g.
/// `2018-01-01T00:00:00.000Z`.
pub(crate) fn iso_millis(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
