#[cfg(test)]
mod tests;

use std::path::PathBuf;

use authdb::OutputFormat;
use clap::{Args, Parser, Subcommand};

use crate::styles::cli_styles;

/// Root CLI for authdbctl.
#[derive(Parser, Debug)]
#[command(name = "authdbctl")]
#[command(about = "AuthDB management client: sign in, inspect and manage users, roles and policies")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Config file [default: <config dir>/authdbctl/config.yaml]
	#[arg(short, long, global = true, env = "AUTHDBCTL_CONFIG_PATH", value_name = "PATH")]
	pub config: Option<PathBuf>,

	/// Token file [default: <config dir>/authdbctl/token.json]
	#[arg(long, global = true, env = "AUTHDBCTL_TOKEN_PATH", value_name = "PATH")]
	pub token_path: Option<PathBuf>,

	/// Output format: json (default), yaml, table or toon
	#[arg(short = 'f', long, global = true, env = "AUTHDBCTL_OUTPUT_FORMAT", value_name = "FORMAT")]
	pub format: Option<OutputFormat>,

	/// Portal base URL, e.g. https://auth.example.com/auth
	#[arg(long, global = true, env = "AUTHDBCTL_PORTAL_URL", value_name = "URL")]
	pub portal: Option<String>,

	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Debug logging, same as -vv
	#[arg(long, global = true)]
	pub debug: bool,

	#[command(subcommand)]
	pub command: Commands,
}

impl Cli {
	pub fn verbosity(&self) -> u8 {
		if self.debug { self.verbose.max(2) } else { self.verbose }
	}
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Sign in to the portal and store the session token.
	Connect(ConnectArgs),
	/// Remove the stored session token.
	Disconnect,
	/// Show portal metadata.
	Metadata,
	/// Create a record, e.g. `add user username=jsmith email=j@example.com`.
	Add(ResourceArgs),
	/// List every record of a resource.
	List(ResourceArgs),
	/// Show the resources this client knows and their fields.
	Resources,
}

#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
	/// Account name [default: username from the config file]
	#[arg(short, long, env = "AUTHDBCTL_USERNAME", value_name = "NAME")]
	pub username: Option<String>,

	/// Read the password from the first line of stdin instead of AUTHDBCTL_PASSWORD.
	#[arg(long)]
	pub password_stdin: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ResourceArgs {
	/// Resource name (see `authdbctl resources`).
	#[arg(value_name = "RESOURCE")]
	pub resource: String,

	/// Field assignments.
	#[arg(value_name = "KEY=VALUE", value_parser = parse_field)]
	pub fields: Vec<(String, String)>,

	/// Field assignment, repeatable. Same as a positional KEY=VALUE.
	#[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
	pub field: Vec<(String, String)>,
}

impl ResourceArgs {
	/// Positional and `--field` assignments, later ones winning.
	pub fn payload(&self) -> authdb::Payload {
		self.fields.iter().chain(&self.field).cloned().collect()
	}
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
	match raw.split_once('=') {
		Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
		_ => Err(format!("expected KEY=VALUE, got {raw:?}")),
	}
}
