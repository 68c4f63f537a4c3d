use authdb::{ErrorCode, ErrorDetail, RegistryError};
use thiserror::Error;

/// Command completed.
pub const EXIT_OK: i32 = 0;
/// The command ran and failed (auth, session, dispatch or format error).
pub const EXIT_FAILURE: i32 = 1;
/// The command never ran: bad flags, config or missing input.
pub const EXIT_USAGE: i32 = 2;
/// Interrupted by the user (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

pub type Result<T> = std::result::Result<T, CliError>;

/// Failures raised by the adapter before a command reaches the core.
#[derive(Debug, Error)]
pub enum CliError {
	#[error("{0}")]
	Config(String),

	#[error("{0}")]
	Usage(String),

	#[error("failed to read password: {0}")]
	Password(#[source] std::io::Error),

	#[error("failed to set up HTTP client: {0}")]
	Transport(String),

	#[error(transparent)]
	Registry(#[from] RegistryError),
}

impl From<anyhow::Error> for CliError {
	fn from(err: anyhow::Error) -> Self {
		// Keep the whole context chain: "invalid config file x: <cause>".
		CliError::Config(format!("{err:#}"))
	}
}

impl CliError {
	pub fn exit_code(&self) -> i32 {
		match self {
			CliError::Transport(_) | CliError::Registry(_) => EXIT_FAILURE,
			_ => EXIT_USAGE,
		}
	}

	/// Convert this error to an [`ErrorDetail`] for structured output
	pub fn to_error_detail(&self) -> ErrorDetail {
		let code = match self {
			CliError::Config(_) => ErrorCode::InvalidConfig,
			CliError::Usage(_) | CliError::Password(_) => ErrorCode::InvalidRequest,
			CliError::Transport(_) => ErrorCode::PortalUnreachable,
			CliError::Registry(_) => ErrorCode::RegistryConflict,
		};
		ErrorDetail::new(code, self.to_string())
	}
}
