//! Login and refresh exchange with the auth portal.
//!
//! The exchange is a single round trip:
//!
//! 1. Client sends [`LoginRequest`] to `POST /login`
//! 2. Portal answers with [`TokenResponse`] on success, or an [`ErrorBody`]
//!    with a 4xx status when the credentials are rejected
//!
//! Renewal uses the same response shape: the client sends
//! [`RefreshRequest`] to `POST /refresh` with the refresh token it received
//! at login time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Credentials posted to `/login`.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
	/// Account name or email address.
	pub username: String,
	/// Account secret. Never logged.
	pub password: String,
}

impl fmt::Debug for LoginRequest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LoginRequest")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Body posted to `/refresh`.
#[derive(Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
	pub refresh_token: String,
}

impl fmt::Debug for RefreshRequest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RefreshRequest")
			.field("refresh_token", &"<redacted>")
			.finish()
	}
}

/// Successful answer to a login or refresh call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
	/// Opaque bearer token (usually a JWT).
	#[serde(alias = "access_token")]
	pub token: String,
	/// Lifetime in seconds, counted from the moment the response is received.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_in: Option<u64>,
	/// Present only when the portal supports silent renewal.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_type: Option<String>,
}

/// Error payload returned by the portal with a non-2xx status.
///
/// Portals disagree on the key name, so both `message` and `error` are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl ErrorBody {
	/// Best-effort human message extracted from a raw error body.
	pub fn describe(body: &serde_json::Value) -> Option<String> {
		if let Some(text) = body.as_str() {
			return (!text.is_empty()).then(|| text.to_string());
		}
		let parsed: ErrorBody = serde_json::from_value(body.clone()).ok()?;
		parsed.message.or(parsed.error)
	}
}
