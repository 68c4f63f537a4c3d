//! Table rendering using comfy-table

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use serde_json::{Map, Value};

use crate::error::FormatError;

fn create_table(headers: Vec<String>) -> Table {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL_CONDENSED);
	// Output is often piped; never wrap to the terminal width.
	table.set_content_arrangement(ContentArrangement::Disabled);
	table.set_header(headers);
	table
}

/// Text of one cell. Nested lists of scalars are joined, anything deeper is
/// shown as compact JSON.
fn cell(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s.clone(),
		Value::Bool(_) | Value::Number(_) => value.to_string(),
		Value::Array(items) if items.iter().all(|v| !v.is_array() && !v.is_object()) => {
			items.iter().map(cell).collect::<Vec<_>>().join(", ")
		}
		Value::Array(_) | Value::Object(_) => value.to_string(),
	}
}

fn records(data: &Value) -> Option<Vec<&Map<String, Value>>> {
	data.as_array()?.iter().map(Value::as_object).collect()
}

pub(super) fn render(data: &Value) -> Result<String, FormatError> {
	match data {
		Value::Array(items) if items.is_empty() => Ok(String::new()),
		Value::Array(_) => {
			let rows = records(data).ok_or_else(|| FormatError::Unsupported {
				format: "table".into(),
				shape: "a list containing non-record values".into(),
			})?;
			Ok(render_records(&rows))
		}
		Value::Object(record) => Ok(render_record(record)),
		scalar => Ok(cell(scalar)),
	}
}

/// Columns come from the first record; later records missing a column get
/// an empty cell and extra keys are not shown.
fn render_records(rows: &[&Map<String, Value>]) -> String {
	let columns: Vec<String> = rows.first().map(|r| r.keys().cloned().collect()).unwrap_or_default();
	let mut table = create_table(columns.clone());

	for row in rows {
		table.add_row(
			columns
				.iter()
				.map(|c| row.get(c).map(cell).unwrap_or_default())
				.collect::<Vec<_>>(),
		);
	}

	table.to_string()
}

fn render_record(record: &Map<String, Value>) -> String {
	let mut table = create_table(vec!["FIELD".into(), "VALUE".into()]);
	for (key, value) in record {
		table.add_row(vec![key.clone(), cell(value)]);
	}
	table.to_string()
}
