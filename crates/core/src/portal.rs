//! Validated auth portal base URL.

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

/// Base URL of an auth portal, e.g. `https://auth.example.com/auth`.
///
/// Only `http` and `https` URLs are accepted. Query strings and fragments
/// are dropped; endpoint paths are appended to whatever path prefix the
/// portal is mounted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Portal {
	url: Url,
}

impl Portal {
	pub fn parse(raw: &str) -> Result<Self> {
		let invalid = |reason: String| Error::InvalidPortal {
			url: raw.to_string(),
			reason,
		};

		let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
		if !matches!(url.scheme(), "http" | "https") {
			return Err(invalid(format!("unsupported scheme {}", url.scheme())));
		}
		if url.host_str().is_none() {
			return Err(invalid("missing host".into()));
		}
		url.set_query(None);
		url.set_fragment(None);
		if let Ok(mut segments) = url.path_segments_mut() {
			segments.pop_if_empty();
		}

		Ok(Self { url })
	}

	/// Canonical string form, used as the token store key.
	pub fn as_str(&self) -> &str {
		self.url.as_str().trim_end_matches('/')
	}

	/// Joins path segments onto the portal base. Segments are percent-encoded.
	pub fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
		let mut url = self.url.clone();
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().extend(segments);
		}
		url
	}

	pub fn login_url(&self) -> Url {
		self.endpoint(["login"])
	}

	pub fn refresh_url(&self) -> Url {
		self.endpoint(["refresh"])
	}

	pub fn metadata_url(&self) -> Url {
		self.endpoint(["metadata"])
	}
}

impl fmt::Display for Portal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn trailing_slash_is_not_significant() {
		let a = Portal::parse("https://auth.example.com/").unwrap();
		let b = Portal::parse("https://auth.example.com").unwrap();
		assert_eq!(a.as_str(), b.as_str());
		assert_eq!(a.as_str(), "https://auth.example.com");
	}

	#[test]
	fn endpoints_keep_mount_prefix() {
		let portal = Portal::parse("https://example.com/auth/").unwrap();
		assert_eq!(portal.login_url().as_str(), "https://example.com/auth/login");
		assert_eq!(
			portal.endpoint(["api", "users", "j smith", "keys"]).as_str(),
			"https://example.com/auth/api/users/j%20smith/keys"
		);
	}

	#[test]
	fn rejects_non_http_schemes() {
		assert!(matches!(
			Portal::parse("ftp://example.com"),
			Err(Error::InvalidPortal { .. })
		));
		assert!(Portal::parse("not a url").is_err());
	}

	#[test]
	fn query_and_fragment_are_dropped() {
		let portal = Portal::parse("http://localhost:8080/?x=1#frag").unwrap();
		assert_eq!(portal.metadata_url().as_str(), "http://localhost:8080/metadata");
	}
}
