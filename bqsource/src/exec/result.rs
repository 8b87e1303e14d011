// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query results in columnar form

use super::request::QueryFormat;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Name of the single frame produced per query
pub const FRAME_NAME: &str = "response";

/// Two parallel columns: row `i`'s timestamp pairs with row `i`'s value
///
/// The columns can only grow together, so their lengths are always equal.
/// Empty columns are a valid result (no matching rows).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    time: Vec<DateTime<Utc>>,
    values: Vec<f64>,
    #[serde(skip)]
    format: QueryFormat,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: QueryFormat) -> Self {
        self.format = format;
        self
    }

    /// Append one row
    pub fn push(&mut self, time: DateTime<Utc>, value: f64) {
        self.time.push(time);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[DateTime<Utc>] {
        &self.time
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn format(&self) -> QueryFormat {
        self.format
    }

    /// Rows in read order
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.time.iter().copied().zip(self.values.iter().copied())
    }

    /// Shape into the host's frame
    pub fn to_frame(&self) -> Frame {
        Frame {
            name: FRAME_NAME.to_string(),
            fields: vec![
                Field {
                    name: "Time".to_string(),
                    values: FieldValues::Time(self.time.clone()),
                },
                Field {
                    name: "Values".to_string(),
                    values: FieldValues::Number(self.values.clone()),
                },
            ],
            meta: Some(FrameMeta {
                preferred_visualisation_type: self.format.preferred_visualisation().to_string(),
            }),
        }
    }
}

impl FromIterator<(DateTime<Utc>, f64)> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = (DateTime<Utc>, f64)>>(iter: I) -> Self {
        let mut series = TimeSeries::new();
        for (time, value) in iter {
            series.push(time, value);
        }
        series
    }
}

/// Tabular result the host renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub name: String,
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<FrameMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub values: FieldValues,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValues {
    Time(Vec<DateTime<Utc>>),
    Number(Vec<f64>),
}

impl FieldValues {
    pub fn len(&self) -> usize {
        match self {
            FieldValues::Time(v) => v.len(),
            FieldValues::Number(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMeta {
    pub preferred_visualisation_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_columns_grow_together() {
        let t1 = Utc.timestamp_opt(100, 0).unwrap();
        let t2 = Utc.timestamp_opt(50, 0).unwrap();

        let mut series = TimeSeries::new();
        assert!(series.is_empty());
        series.push(t1, 5.0);
        series.push(t2, 7.0);

        assert_eq!(series.time().len(), series.values().len());
        assert_eq!(series.iter().collect::<Vec<_>>(), vec![(t1, 5.0), (t2, 7.0)]);
    }

    #[test]
    fn test_frame_shape() {
        let t1 = Utc.timestamp_opt(100, 0).unwrap();
        let series: TimeSeries = vec![(t1, 1.5)].into_iter().collect();
        let frame = series.with_format(QueryFormat::Table).to_frame();

        assert_eq!(frame.name, "response");
        assert_eq!(frame.fields[0].name, "Time");
        assert_eq!(frame.fields[1].name, "Values");
        assert_eq!(frame.fields[1].values, FieldValues::Number(vec![1.5]));
        assert_eq!(
            frame.meta.map(|m| m.preferred_visualisation_type),
            Some("table".to_string())
        );
    }

    #[test]
    fn test_empty_series_gives_empty_fields() {
        let frame = TimeSeries::new().to_frame();
        assert!(frame.fields.iter().all(|f| f.values.is_empty()));

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["fields"][0]["values"], serde_json::json!([]));
        assert_eq!(json["meta"]["preferredVisualisationType"], "graph");
    }
}
