//! Per-invocation command requests.

use std::fmt;

use crate::output::OutputFormat;
use crate::registry::Payload;
use crate::session::Credentials;

/// What the user asked for. Built once by the CLI adapter and consumed by
/// [`Client::run`](crate::client::Client::run).
#[derive(Debug, Clone)]
pub enum Command {
	/// Log in and persist a session.
	Connect(Credentials),
	/// Forget the persisted session.
	Disconnect,
	/// Fetch portal introspection data.
	Metadata,
	/// Create one record of `resource`.
	Add { resource: String, payload: Payload },
	/// Fetch every record of `resource`. The payload only fills path placeholders.
	List { resource: String, payload: Payload },
	/// Describe the registered resources. No portal call.
	Resources,
}

/// Discriminant of [`Command`], used as the command name in results and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
	Connect,
	Disconnect,
	Metadata,
	Add,
	List,
	Resources,
}

impl fmt::Display for Verb {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Verb::Connect => "connect",
			Verb::Disconnect => "disconnect",
			Verb::Metadata => "metadata",
			Verb::Add => "add",
			Verb::List => "list",
			Verb::Resources => "resources",
		})
	}
}

impl Command {
	pub fn verb(&self) -> Verb {
		match self {
			Command::Connect(_) => Verb::Connect,
			Command::Disconnect => Verb::Disconnect,
			Command::Metadata => Verb::Metadata,
			Command::Add { .. } => Verb::Add,
			Command::List { .. } => Verb::List,
			Command::Resources => Verb::Resources,
		}
	}

	/// Resource name for `add`/`list`.
	pub fn resource(&self) -> Option<&str> {
		match self {
			Command::Add { resource, .. } | Command::List { resource, .. } => Some(resource),
			_ => None,
		}
	}

	/// Whether the command needs a valid session before it runs.
	pub fn needs_session(&self) -> bool {
		matches!(self, Command::Metadata | Command::Add { .. } | Command::List { .. })
	}
}

#[derive(Debug, Clone)]
pub struct CommandRequest {
	pub command: Command,
	pub format: OutputFormat,
}

impl CommandRequest {
	pub fn new(command: Command, format: OutputFormat) -> Self {
		Self { command, format }
	}

	pub fn verb(&self) -> Verb {
		self.command.verb()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_portal_calls_need_a_session() {
		assert!(Command::Metadata.needs_session());
		assert!(
			Command::List {
				resource: "role".into(),
				payload: Payload::new()
			}
			.needs_session()
		);
		assert!(!Command::Resources.needs_session());
		assert!(!Command::Disconnect.needs_session());
		assert!(!Command::Connect(Credentials::new("u", "p")).needs_session());
	}

	#[test]
	fn verb_names() {
		let add = Command::Add {
			resource: "user".into(),
			payload: Payload::new(),
		};
		assert_eq!(add.verb().to_string(), "add");
		assert_eq!(add.resource(), Some("user"));
		assert_eq!(serde_json::to_value(Verb::Metadata).unwrap(), "metadata");
	}
}
