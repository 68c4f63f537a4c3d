//! Session lifecycle: acquisition, persistence, expiry and renewal.
//!
//! * [`Session`]: an issued bearer token plus its validity window
//! * [`Credentials`]: transient login material, never persisted
//! * [`TokenStore`]: the on-disk token file, replaced atomically
//! * [`SessionManager`]: `connect`, `load_session` and `ensure_valid`

use std::fmt;

use authdb_protocol::{TokenResponse, time_claims};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::portal::Portal;

mod manager;
pub mod store;

pub use manager::{DEFAULT_REFRESH_DEADLINE, SessionManager};
pub use store::TokenStore;

/// Username and secret used for a single login exchange.
///
/// Deliberately not `Serialize`; the secret is dropped with the value.
#[derive(Clone)]
pub struct Credentials {
	pub username: String,
	secret: String,
}

impl Credentials {
	pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
		Self {
			username: username.into(),
			secret: secret.into(),
		}
	}

	pub fn secret(&self) -> &str {
		&self.secret
	}
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("username", &self.username)
			.field("secret", &"<redacted>")
			.finish()
	}
}

/// Validity of a session at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Valid,
	Expired,
}

/// A bearer token issued by the portal.
///
/// Sessions are immutable: renewal produces a new value which replaces the
/// stored one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	pub token: String,
	pub issued_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
	pub portal_url: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("portal_url", &self.portal_url)
			.field("refreshable", &self.refresh_token.is_some())
			.finish()
	}
}

impl Session {
	/// Builds a session from a login/refresh answer received at `now`.
	///
	/// Expiry comes from `expires_in` when present, otherwise from the JWT
	/// `exp` claim, in which case a past `iat` claim becomes the issue time.
	/// A response with neither, or with a lifetime that is not strictly
	/// positive or not representable, is rejected.
	pub fn from_token_response(
		portal: &Portal,
		response: TokenResponse,
		now: DateTime<Utc>,
	) -> Result<Self, AuthError> {
		if response.token.is_empty() {
			return Err(AuthError::InvalidResponse("empty token".into()));
		}

		let (issued_at, expires_at) = match response.expires_in {
			Some(secs) => {
				let expires_at = i64::try_from(secs)
					.ok()
					.and_then(Duration::try_seconds)
					.and_then(|lifetime| now.checked_add_signed(lifetime))
					.ok_or_else(|| AuthError::InvalidResponse(format!("expires_in out of range: {secs}")))?;
				(now, expires_at)
			}
			None => {
				let claims = time_claims(&response.token).unwrap_or_default();
				let expires_at = claims
					.exp
					.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
					.ok_or_else(|| AuthError::InvalidResponse("token carries no expiry".into()))?;
				let issued_at = claims
					.iat
					.and_then(|iat| Utc.timestamp_opt(iat, 0).single())
					.filter(|iat| *iat <= now && *iat < expires_at)
					.unwrap_or(now);
				(issued_at, expires_at)
			}
		};

		if expires_at <= now {
			return Err(AuthError::InvalidResponse(format!(
				"token already expired at {}",
				expires_at.to_rfc3339()
			)));
		}

		Ok(Self {
			token: response.token,
			issued_at,
			expires_at,
			portal_url: portal.as_str().to_string(),
			refresh_token: response.refresh_token,
		})
	}

	pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
		if now >= self.expires_at {
			SessionState::Expired
		} else {
			SessionState::Valid
		}
	}

	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		self.state_at(now) == SessionState::Expired
	}

	pub fn is_refreshable(&self) -> bool {
		self.refresh_token.is_some()
	}

	/// Token-free view printed by `connect`.
	pub fn summary(&self, now: DateTime<Utc>) -> serde_json::Value {
		serde_json::json!({
			"portal": self.portal_url,
			"issued_at": self.issued_at.to_rfc3339(),
			"expires_at": self.expires_at.to_rfc3339(),
			"expires_in": (self.expires_at - now).num_seconds().max(0),
			"refreshable": self.is_refreshable(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn portal() -> Portal {
		Portal::parse("https://auth.example.com").unwrap()
	}

	fn response(expires_in: Option<u64>) -> TokenResponse {
		TokenResponse {
			token: "abc".into(),
			expires_in,
			refresh_token: None,
			token_type: None,
		}
	}

	#[test]
	fn expires_in_is_counted_from_receipt() {
		let now = Utc::now();
		let session = Session::from_token_response(&portal(), response(Some(3600)), now).unwrap();
		assert_eq!(session.issued_at, now);
		assert_eq!(session.expires_at - session.issued_at, Duration::seconds(3600));
		assert_eq!(session.portal_url, "https://auth.example.com");
	}

	#[test]
	fn zero_lifetime_is_rejected() {
		let err = Session::from_token_response(&portal(), response(Some(0)), Utc::now()).unwrap_err();
		assert!(matches!(err, AuthError::InvalidResponse(_)));
	}

	#[test]
	fn oversized_lifetime_is_rejected() {
		for secs in [u64::MAX, 9_999_999_999_999] {
			let err = Session::from_token_response(&portal(), response(Some(secs)), Utc::now()).unwrap_err();
			assert!(matches!(err, AuthError::InvalidResponse(ref msg) if msg.contains("out of range")), "{secs}: {err:?}");
		}
	}

	#[test]
	fn jwt_claims_supply_window_when_expires_in_is_missing() {
		// payload: {"iat":1700000000,"exp":1700003600}
		let now = Utc.timestamp_opt(1_700_000_100, 0).single().unwrap();
		let mut answer = response(None);
		answer.token = "e30.eyJpYXQiOjE3MDAwMDAwMDAsImV4cCI6MTcwMDAwMzYwMH0.sig".into();

		let session = Session::from_token_response(&portal(), answer, now).unwrap();
		assert_eq!(session.issued_at.timestamp(), 1_700_000_000);
		assert_eq!(session.expires_at.timestamp(), 1_700_003_600);
	}

	#[test]
	fn opaque_token_without_expiry_is_rejected() {
		let err = Session::from_token_response(&portal(), response(None), Utc::now()).unwrap_err();
		assert!(matches!(err, AuthError::InvalidResponse(_)));
	}

	#[test]
	fn expiry_boundary_counts_as_expired() {
		let now = Utc::now();
		let session = Session::from_token_response(&portal(), response(Some(60)), now).unwrap();
		assert_eq!(session.state_at(now), SessionState::Valid);
		assert_eq!(session.state_at(session.expires_at), SessionState::Expired);
		assert!(session.is_expired_at(session.expires_at + Duration::seconds(1)));
	}

	#[test]
	fn debug_never_prints_secrets() {
		let creds = Credentials::new("jsmith", "hunter2");
		assert!(!format!("{creds:?}").contains("hunter2"));

		let mut session = Session::from_token_response(&portal(), response(Some(60)), Utc::now()).unwrap();
		session.refresh_token = Some("r-123".into());
		let dbg = format!("{session:?}");
		assert!(!dbg.contains("abc"));
		assert!(!dbg.contains("r-123"));
	}

	#[test]
	fn summary_omits_token() {
		let now = Utc::now();
		let session = Session::from_token_response(&portal(), response(Some(3600)), now).unwrap();
		let summary = session.summary(now);
		assert_eq!(summary["expires_in"], 3600);
		assert_eq!(summary["refreshable"], false);
		assert!(!summary.to_string().contains("\"abc\""));
	}
}
