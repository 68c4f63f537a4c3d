//! Printing command results.
//!
//! Rendered data goes to stdout. Errors always go to stderr as
//! `Error [CODE]: message`; with `--format json` the failure envelope is
//! printed to stdout as well so scripts can parse it.

use std::io::{self, Write};

use authdb::{CommandResult, Error, ErrorDetail, OutputFormat, render};
use colored::Colorize;

use crate::error::{EXIT_FAILURE, EXIT_OK};

/// Prints `result` in `format` and returns the process exit code.
pub fn emit(result: &CommandResult, format: OutputFormat) -> i32 {
	if let Some(ref error) = result.error {
		print_error_stderr(error);
		if format == OutputFormat::Json {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		return EXIT_FAILURE;
	}

	match render(result, format) {
		Ok(bytes) => {
			let mut stdout = io::stdout().lock();
			// A closed pipe (e.g. `| head`) is not a command failure.
			let _ = stdout.write_all(&bytes).and_then(|()| stdout.flush());
			EXIT_OK
		}
		Err(err) => {
			print_error_stderr(&Error::from(err).to_error_detail());
			EXIT_FAILURE
		}
	}
}

pub fn print_error_stderr(error: &ErrorDetail) {
	eprintln!("{} [{}]: {}", "Error".red().bold(), error.code, error.message);
}
