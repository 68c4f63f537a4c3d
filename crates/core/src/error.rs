//! Error taxonomy for session, dispatch and rendering failures.
//!
//! Each family is its own enum so callers can match on the part of the
//! pipeline that failed; [`Error`] wraps them for `?` propagation and maps
//! every variant onto a stable [`ErrorCode`] for structured output.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Login, expiry and reachability failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
	#[error("the portal rejected the credentials: {0}")]
	InvalidCredentials(String),

	#[error("session expired, run `authdbctl connect` to sign in again")]
	Expired,

	#[error("auth portal unreachable: {0}")]
	Unreachable(String),

	/// The portal answered 2xx with a body that is not a token response.
	#[error("unexpected token response from portal: {0}")]
	InvalidResponse(String),
}

/// Token store failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
	#[error("no session stored for {portal}, run `authdbctl connect` first")]
	NotFound { portal: String },

	#[error("token store {path} is unreadable: {reason}")]
	Corrupt { path: String, reason: String },

	#[error("failed to write token store {path}: {reason}")]
	Persist { path: String, reason: String },
}

/// Failures while building or executing a resource call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
	#[error("unknown resource: {0}")]
	UnknownResource(String),

	#[error("missing required field: {0}")]
	MissingField(String),

	#[error("field {field} is not accepted by resource {resource}")]
	UnknownField { resource: String, field: String },

	#[error("field {field} has an invalid value: {reason}")]
	InvalidField { field: String, reason: String },

	#[error("portal rejected the request ({status}): {message}")]
	ServerRejected { status: u16, message: String },

	#[error("transient network failure after {attempts} attempt(s): {message}")]
	Transient { attempts: u32, message: String },

	/// A 2xx answer whose body does not have the expected shape.
	#[error("unexpected response from portal: {0}")]
	InvalidResponse(String),

	#[error("{0} is not a portal call")]
	NotDispatchable(String),
}

/// Rendering failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormatError {
	#[error("cannot render {shape} as {format}")]
	Unsupported { format: String, shape: String },

	#[error("failed to encode output: {0}")]
	Encode(String),
}

/// Registry population failures. Fatal at startup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
	#[error("resource {0} is already registered")]
	Duplicate(String),

	#[error("resource {name} has an invalid path template: {reason}")]
	InvalidTemplate { name: String, reason: String },
}

/// Any failure surfaced by the core.
#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	Auth(#[from] AuthError),

	#[error(transparent)]
	Session(#[from] SessionError),

	#[error(transparent)]
	Dispatch(#[from] DispatchError),

	#[error(transparent)]
	Format(#[from] FormatError),

	#[error(transparent)]
	Registry(#[from] RegistryError),

	#[error("invalid portal url {url}: {reason}")]
	InvalidPortal { url: String, reason: String },
}

/// Standardized error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	InvalidCredentials,
	SessionExpired,
	PortalUnreachable,
	InvalidResponse,
	SessionNotFound,
	SessionCorrupt,
	SessionPersistFailed,
	UnknownResource,
	MissingField,
	UnknownField,
	InvalidField,
	ServerRejected,
	Transient,
	FormatUnsupported,
	EncodeFailed,
	RegistryConflict,
	InvalidPortal,
	InvalidRequest,
	InvalidConfig,
	Cancelled,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
			ErrorCode::SessionExpired => "SESSION_EXPIRED",
			ErrorCode::PortalUnreachable => "PORTAL_UNREACHABLE",
			ErrorCode::InvalidResponse => "INVALID_RESPONSE",
			ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
			ErrorCode::SessionCorrupt => "SESSION_CORRUPT",
			ErrorCode::SessionPersistFailed => "SESSION_PERSIST_FAILED",
			ErrorCode::UnknownResource => "UNKNOWN_RESOURCE",
			ErrorCode::MissingField => "MISSING_FIELD",
			ErrorCode::UnknownField => "UNKNOWN_FIELD",
			ErrorCode::InvalidField => "INVALID_FIELD",
			ErrorCode::ServerRejected => "SERVER_REJECTED",
			ErrorCode::Transient => "TRANSIENT",
			ErrorCode::FormatUnsupported => "FORMAT_UNSUPPORTED",
			ErrorCode::EncodeFailed => "ENCODE_FAILED",
			ErrorCode::RegistryConflict => "REGISTRY_CONFLICT",
			ErrorCode::InvalidPortal => "INVALID_PORTAL",
			ErrorCode::InvalidRequest => "INVALID_REQUEST",
			ErrorCode::InvalidConfig => "INVALID_CONFIG",
			ErrorCode::Cancelled => "CANCELLED",
		};
		f.write_str(s)
	}
}

/// Structured error carried by a failed [`CommandResult`](crate::output::CommandResult).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
	pub code: ErrorCode,

	/// Human-readable message.
	pub message: String,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

impl ErrorDetail {
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
			details: None,
		}
	}
}

impl Error {
	/// Whether the caller should re-run `connect` before retrying.
	pub fn needs_reconnect(&self) -> bool {
		matches!(
			self,
			Error::Auth(AuthError::Expired) | Error::Session(SessionError::NotFound { .. })
		)
	}

	/// Convert this error to an [`ErrorDetail`] for structured output.
	pub fn to_error_detail(&self) -> ErrorDetail {
		let (code, details) = match self {
			Error::Auth(err) => match err {
				AuthError::InvalidCredentials(_) => (ErrorCode::InvalidCredentials, None),
				AuthError::Expired => (ErrorCode::SessionExpired, None),
				AuthError::Unreachable(_) => (ErrorCode::PortalUnreachable, None),
				AuthError::InvalidResponse(_) => (ErrorCode::InvalidResponse, None),
			},
			Error::Session(err) => match err {
				SessionError::NotFound { portal } => {
					(ErrorCode::SessionNotFound, Some(serde_json::json!({ "portal": portal })))
				}
				SessionError::Corrupt { path, .. } => {
					(ErrorCode::SessionCorrupt, Some(serde_json::json!({ "path": path })))
				}
				SessionError::Persist { path, .. } => {
					(ErrorCode::SessionPersistFailed, Some(serde_json::json!({ "path": path })))
				}
			},
			Error::Dispatch(err) => match err {
				DispatchError::UnknownResource(name) => {
					(ErrorCode::UnknownResource, Some(serde_json::json!({ "resource": name })))
				}
				DispatchError::MissingField(field) => {
					(ErrorCode::MissingField, Some(serde_json::json!({ "field": field })))
				}
				DispatchError::UnknownField { resource, field } => (
					ErrorCode::UnknownField,
					Some(serde_json::json!({ "resource": resource, "field": field })),
				),
				DispatchError::InvalidField { field, .. } => {
					(ErrorCode::InvalidField, Some(serde_json::json!({ "field": field })))
				}
				DispatchError::ServerRejected { status, .. } => {
					(ErrorCode::ServerRejected, Some(serde_json::json!({ "status": status })))
				}
				DispatchError::Transient { attempts, .. } => {
					(ErrorCode::Transient, Some(serde_json::json!({ "attempts": attempts })))
				}
				DispatchError::InvalidResponse(_) => (ErrorCode::InvalidResponse, None),
				DispatchError::NotDispatchable(verb) => {
					(ErrorCode::InvalidRequest, Some(serde_json::json!({ "verb": verb })))
				}
			},
			Error::Format(err) => match err {
				FormatError::Unsupported { format, .. } => {
					(ErrorCode::FormatUnsupported, Some(serde_json::json!({ "format": format })))
				}
				FormatError::Encode(_) => (ErrorCode::EncodeFailed, None),
			},
			Error::Registry(_) => (ErrorCode::RegistryConflict, None),
			Error::InvalidPortal { url, .. } => {
				(ErrorCode::InvalidPortal, Some(serde_json::json!({ "url": url })))
			}
		};

		ErrorDetail {
			code,
			message: self.to_string(),
			details,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn error_code_display_matches_serde() {
		for code in [ErrorCode::SessionExpired, ErrorCode::UnknownResource, ErrorCode::FormatUnsupported] {
			let via_serde = serde_json::to_value(code).unwrap();
			assert_eq!(via_serde.as_str().unwrap(), code.to_string());
		}
	}

	#[test]
	fn unknown_resource_detail_names_the_resource() {
		let err: Error = DispatchError::UnknownResource("widget".into()).into();
		let detail = err.to_error_detail();
		assert_eq!(detail.code, ErrorCode::UnknownResource);
		assert_eq!(detail.message, "unknown resource: widget");
		assert_eq!(detail.details.unwrap()["resource"], "widget");
	}

	#[test]
	fn expired_and_missing_sessions_need_reconnect() {
		assert!(Error::from(AuthError::Expired).needs_reconnect());
		assert!(Error::from(SessionError::NotFound { portal: "https://a".into() }).needs_reconnect());
		assert!(!Error::from(DispatchError::MissingField("email".into())).needs_reconnect());
	}
}
