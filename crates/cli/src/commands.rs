//! Adapter from parsed flags to a core [`CommandRequest`].

use std::io::BufRead;
use std::sync::Arc;

use authdb::{Client, Command, CommandRequest, Credentials, HttpTransport, OutputFormat, Registry};
use tracing::debug;

use crate::cli::{Cli, Commands, ConnectArgs};
use crate::config::{CliConfig, Settings};
use crate::error::{CliError, Result};
use crate::output;

pub const PASSWORD_ENV: &str = "AUTHDBCTL_PASSWORD";

/// A command ready to run.
pub struct Prepared {
	pub client: Client,
	pub request: CommandRequest,
}

/// Resolves configuration, sources credentials and builds the client.
pub fn prepare(cli: Cli) -> Result<Prepared> {
	let config = CliConfig::load(cli.config.as_deref())?;
	let settings = Settings::resolve(&cli, config);
	debug!(portal = ?settings.portal, token_path = %settings.token_path.display(), "settings resolved");

	let command = match cli.command {
		Commands::Connect(ref args) => Command::Connect(credentials(args, &settings)?),
		Commands::Disconnect => Command::Disconnect,
		Commands::Metadata => Command::Metadata,
		Commands::Add(ref args) => Command::Add {
			resource: args.resource.clone(),
			payload: args.payload(),
		},
		Commands::List(ref args) => Command::List {
			resource: args.resource.clone(),
			payload: args.payload(),
		},
		Commands::Resources => Command::Resources,
	};

	let transport = HttpTransport::new(settings.timeout).map_err(|e| CliError::Transport(e.to_string()))?;
	let client = Client::new(
		settings.client_options(),
		Arc::new(transport),
		Arc::new(Registry::builtin()?),
	);

	Ok(Prepared {
		client,
		request: CommandRequest::new(command, settings.format),
	})
}

fn credentials(args: &ConnectArgs, settings: &Settings) -> Result<Credentials> {
	let username = settings
		.username
		.clone()
		.ok_or_else(|| CliError::Usage("no username, pass --username or set username in the config file".into()))?;

	let secret = if args.password_stdin {
		read_password(std::io::stdin().lock())?
	} else {
		std::env::var(PASSWORD_ENV)
			.map_err(|_| CliError::Usage(format!("no password, set {PASSWORD_ENV} or pass --password-stdin")))?
	};
	if secret.is_empty() {
		return Err(CliError::Usage("empty password".into()));
	}

	Ok(Credentials::new(username, secret))
}

/// First line of `input`, without its line ending.
fn read_password(mut input: impl BufRead) -> Result<String> {
	let mut line = String::new();
	input.read_line(&mut line).map_err(CliError::Password)?;
	Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Runs `cli` to completion and returns the process exit code.
pub async fn execute(cli: Cli) -> i32 {
	let fallback_format = cli.format.unwrap_or_default();
	let prepared = match prepare(cli) {
		Ok(prepared) => prepared,
		Err(err) => {
			report(&err, fallback_format);
			return err.exit_code();
		}
	};

	let format = prepared.request.format;
	let result = prepared.client.run(prepared.request).await;
	output::emit(&result, format)
}

fn report(err: &CliError, format: OutputFormat) {
	let detail = err.to_error_detail();
	output::print_error_stderr(&detail);
	if format == OutputFormat::Json {
		let envelope = serde_json::json!({ "status": "failure", "data": null, "error": detail });
		println!("{envelope:#}");
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn password_is_first_line_only() {
		let input = std::io::Cursor::new("s3cret\r\nignored\n");
		assert_eq!(read_password(input).unwrap(), "s3cret");
	}

	#[test]
	fn empty_stdin_gives_empty_password() {
		assert_eq!(read_password(std::io::Cursor::new("")).unwrap(), "");
	}
}
