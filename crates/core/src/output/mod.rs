//! Command results and their rendering.
//!
//! Every command produces a [`CommandResult`]. [`render`] projects its
//! `data` into one of the [`OutputFormat`]s without touching the result:
//!
//! * `json` / `yaml`: structure-preserving, re-parses to the same value
//! * `table`: aligned columns for a list of records, field/value rows for a
//!   single record, a bare line for a scalar
//! * `toon`: compact token-oriented notation
//!
//! Failed results carry an [`ErrorDetail`] which callers print on stderr;
//! with `--format json` the whole envelope is also available:
//!
//! ```json
//! {
//!   "command": "add",
//!   "status": "failure",
//!   "data": null,
//!   "error": { "code": "MISSING_FIELD", "message": "missing required field: email" }
//! }
//! ```

mod table;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, ErrorDetail, FormatError};
use crate::request::Verb;

/// Output format for rendered results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
	#[default]
	Json,
	Yaml,
	Table,
	/// Token-efficient notation for LLM consumers.
	Toon,
}

impl std::str::FromStr for OutputFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"json" => Ok(OutputFormat::Json),
			"yaml" | "yml" => Ok(OutputFormat::Yaml),
			"table" => Ok(OutputFormat::Table),
			"toon" => Ok(OutputFormat::Toon),
			_ => Err(format!("unknown format: {s} (expected json, yaml, table or toon)")),
		}
	}
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Json => write!(f, "json"),
			OutputFormat::Yaml => write!(f, "yaml"),
			OutputFormat::Table => write!(f, "table"),
			OutputFormat::Toon => write!(f, "toon"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
	Success,
	Failure,
}

/// Outcome of one command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
	pub command: Verb,
	pub status: Status,
	pub data: Value,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorDetail>,
}

impl CommandResult {
	pub fn success(command: Verb, data: Value) -> Self {
		Self {
			command,
			status: Status::Success,
			data,
			error: None,
		}
	}

	pub fn failure(command: Verb, error: ErrorDetail) -> Self {
		Self {
			command,
			status: Status::Failure,
			data: Value::Null,
			error: Some(error),
		}
	}

	pub fn from_result(command: Verb, result: Result<Value, Error>) -> Self {
		match result {
			Ok(data) => Self::success(command, data),
			Err(err) => Self::failure(command, err.to_error_detail()),
		}
	}

	pub fn is_success(&self) -> bool {
		self.status == Status::Success
	}
}

/// Renders `result.data` in `format`. The output always ends with a newline
/// unless it is empty.
pub fn render(result: &CommandResult, format: OutputFormat) -> Result<Vec<u8>, FormatError> {
	let mut out = match format {
		OutputFormat::Json => {
			serde_json::to_vec_pretty(&result.data).map_err(|e| FormatError::Encode(e.to_string()))?
		}
		OutputFormat::Yaml => serde_yaml::to_string(&result.data)
			.map_err(|e| FormatError::Encode(e.to_string()))?
			.into_bytes(),
		OutputFormat::Table => table::render(&result.data)?.into_bytes(),
		OutputFormat::Toon => toon::encode(&result.data, None).into_bytes(),
	};
	if !out.is_empty() && !out.ends_with(b"\n") {
		out.push(b'\n');
	}
	Ok(out)
}
