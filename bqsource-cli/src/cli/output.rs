// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result formatting for CLI output

use super::commands::OutputFormat;
use bqsource::exec::{FieldValues, Frame};
use bqsource::{DataResponse, QueryDataResponse};
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};

/// Result formatter for different output formats
pub struct ResultFormatter;

impl ResultFormatter {
    /// Format a batch response in the specified format
    pub fn format(response: &QueryDataResponse, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::format_table(response),
            OutputFormat::Json => Self::format_json(response),
            OutputFormat::Csv => Self::format_csv(response),
        }
    }

    /// Format results as one table per query using comfy-table
    fn format_table(response: &QueryDataResponse) -> String {
        if response.is_empty() {
            return format!("{}\n", "No results returned".yellow());
        }

        let mut output = String::new();
        for (ref_id, result) in &response.results {
            output.push_str(&format!("{}\n", format!("Query {}", ref_id).bold().green()));

            if let Some(error) = &result.error {
                output.push_str(&format!("{}\n\n", format!("Error: {}", error).red()));
                continue;
            }

            let rows = Self::rows(result);
            if rows.is_empty() {
                output.push_str(&format!("{}\n\n", "No rows".yellow()));
                continue;
            }
            output.push_str(&format!("Rows returned: {}\n", rows.len()));

            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec![
                Cell::new("Time").fg(Color::Green),
                Cell::new("Values").fg(Color::Green),
            ]);
            for (time, value) in rows {
                table.add_row(vec![time, value]);
            }
            output.push_str(&table.to_string());
            output.push_str("\n\n");
        }
        output
    }

    /// Format results as JSON, in the host's response shape
    fn format_json(response: &QueryDataResponse) -> String {
        serde_json::to_string_pretty(response).unwrap_or_else(|_| {
            "{\"status\": \"error\", \"error\": \"Could not serialize results to JSON\"}".to_string()
        })
    }

    /// Format results as CSV, one line per row
    fn format_csv(response: &QueryDataResponse) -> String {
        let mut output = String::from("ref_id,time,value,error\n");
        for (ref_id, result) in &response.results {
            let ref_id = Self::csv_escape(ref_id);
            if let Some(error) = &result.error {
                output.push_str(&format!("{},,,{}\n", ref_id, Self::csv_escape(error)));
                continue;
            }
            for (time, value) in Self::rows(result) {
                output.push_str(&format!("{},{},{},\n", ref_id, time, value));
            }
        }
        output
    }

    /// Pair up the Time and Values columns of the first frame
    fn rows(result: &DataResponse) -> Vec<(String, String)> {
        let Some(frame) = result.frames.first() else {
            return Vec::new();
        };
        match (Self::field(frame, "Time"), Self::field(frame, "Values")) {
            (Some(FieldValues::Time(times)), Some(FieldValues::Number(values))) => times
                .iter()
                .zip(values)
                .map(|(time, value)| (time.to_rfc3339(), value.to_string()))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn field<'a>(frame: &'a Frame, name: &str) -> Option<&'a FieldValues> {
        frame
            .fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.values)
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bqsource::exec::TimeSeries;
    use bqsource::QueryError;

    fn response() -> QueryDataResponse {
        let mut series = TimeSeries::new();
        series.push("2024-01-01T00:00:00Z".parse().unwrap(), 1.5);
        series.push("2024-01-01T00:01:00Z".parse().unwrap(), 2.0);

        let mut response = QueryDataResponse::default();
        response
            .results
            .insert("A".to_string(), DataResponse::from(Ok(series)));
        response.results.insert(
            "B".to_string(),
            DataResponse::from(Err(QueryError::Parse("missing field, rawSql".to_string()))),
        );
        response
    }

    #[test]
    fn test_csv_lists_rows_and_errors() {
        let csv = ResultFormatter::format(&response(), OutputFormat::Csv);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "ref_id,time,value,error");
        assert_eq!(lines[1], "A,2024-01-01T00:00:00+00:00,1.5,");
        assert_eq!(lines[2], "A,2024-01-01T00:01:00+00:00,2,");
        assert_eq!(
            lines[3],
            "B,,,\"invalid query payload: missing field, rawSql\""
        );
    }

    #[test]
    fn test_json_keeps_host_shape() {
        let json = ResultFormatter::format(&response(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["results"]["A"]["frames"][0]["name"], "response");
        assert!(value["results"]["B"]["error"].is_string());
    }

    #[test]
    fn test_table_mentions_every_query() {
        colored::control::set_override(false);
        let table = ResultFormatter::format(&response(), OutputFormat::Table);

        assert!(table.contains("Query A"));
        assert!(table.contains("Rows returned: 2"));
        assert!(table.contains("Error: invalid query payload"));
    }
}
