//! Minimal JWT claim inspection.
//!
//! The client never verifies signatures; it only peeks at the registered
//! `exp`/`iat` claims so a session can be given an expiry when the portal
//! omits `expires_in` from the login response.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

/// Registered time claims, Unix epoch seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TimeClaims {
	#[serde(default)]
	pub exp: Option<i64>,
	#[serde(default)]
	pub iat: Option<i64>,
}

/// Decodes the payload segment of a compact JWT.
///
/// Returns [`None`] for anything that is not three dot-separated segments
/// with a base64url JSON payload; opaque tokens are expected and not an error.
pub fn time_claims(token: &str) -> Option<TimeClaims> {
	let mut segments = token.split('.');
	let (_header, payload, _sig) = (segments.next()?, segments.next()?, segments.next()?);
	if segments.next().is_some() {
		return None;
	}
	// Some issuers pad anyway.
	let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
	serde_json::from_slice(&bytes).ok()
}
