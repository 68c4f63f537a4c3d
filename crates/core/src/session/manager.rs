use std::sync::Arc;
use std::time::Duration;

use authdb_protocol::{ErrorBody, LoginRequest, RefreshRequest, TokenResponse};
use chrono::Utc;
use tracing::{debug, info, warn};

use super::{Credentials, Session, TokenStore};
use crate::error::{AuthError, Result};
use crate::portal::Portal;
use crate::retry::{Idempotency, RetryPolicy};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Upper bound on a silent refresh, retries included.
pub const DEFAULT_REFRESH_DEADLINE: Duration = Duration::from_secs(30);

/// Obtains, persists and renews sessions.
///
/// The manager is the only writer of the [`TokenStore`]; everything else
/// receives a `Session` value.
pub struct SessionManager {
	store: TokenStore,
	transport: Arc<dyn Transport>,
	retry: RetryPolicy,
	refresh_deadline: Duration,
}

impl SessionManager {
	pub fn new(store: TokenStore, transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
		Self {
			store,
			transport,
			retry,
			refresh_deadline: DEFAULT_REFRESH_DEADLINE,
		}
	}

	pub fn with_refresh_deadline(mut self, deadline: Duration) -> Self {
		self.refresh_deadline = deadline;
		self
	}

	pub fn store(&self) -> &TokenStore {
		&self.store
	}

	/// Performs the login exchange and persists the resulting session,
	/// replacing any session previously stored for the portal.
	pub async fn connect(&self, portal: &Portal, credentials: &Credentials) -> Result<Session> {
		let body = serde_json::to_value(LoginRequest {
			username: credentials.username.clone(),
			password: credentials.secret().to_string(),
		})
		.map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

		debug!(portal = %portal, username = %credentials.username, "logging in");
		let response = self.exchange(ApiRequest::post(portal.login_url(), body)).await?;
		let session = session_from_response(portal, response)?;

		self.store.save(&session)?;
		info!(portal = %portal, expires_at = %session.expires_at, "session persisted");
		Ok(session)
	}

	/// Reads the persisted session for `portal`.
	pub fn load_session(&self, portal: &Portal) -> Result<Session> {
		Ok(self.store.load(portal)?)
	}

	/// Removes the persisted session. Returns whether one existed.
	pub fn disconnect(&self) -> Result<bool> {
		Ok(self.store.clear()?)
	}

	/// Returns `session` unchanged while it is valid.
	///
	/// Once expired, a session carrying a refresh token is renewed and the
	/// replacement persisted; otherwise, or when renewal fails for any reason,
	/// the caller gets [`AuthError::Expired`]. Never returns an expired session.
	pub async fn ensure_valid(&self, session: Session) -> Result<Session> {
		if !session.is_expired_at(Utc::now()) {
			return Ok(session);
		}

		let Some(refresh_token) = session.refresh_token.clone() else {
			debug!(portal = %session.portal_url, "session expired and not refreshable");
			return Err(AuthError::Expired.into());
		};

		let renewed = match tokio::time::timeout(self.refresh_deadline, self.refresh(&session, refresh_token)).await {
			Ok(Ok(renewed)) => renewed,
			Ok(Err(err)) => {
				warn!(error = %err, "silent refresh failed");
				return Err(AuthError::Expired.into());
			}
			Err(_) => {
				warn!(deadline = ?self.refresh_deadline, "silent refresh timed out");
				return Err(AuthError::Expired.into());
			}
		};

		if renewed.is_expired_at(Utc::now()) {
			return Err(AuthError::Expired.into());
		}

		self.store.save(&renewed)?;
		info!(portal = %renewed.portal_url, expires_at = %renewed.expires_at, "session refreshed");
		Ok(renewed)
	}

	async fn refresh(&self, session: &Session, refresh_token: String) -> Result<Session> {
		let portal = Portal::parse(&session.portal_url)?;
		let body = serde_json::to_value(RefreshRequest { refresh_token: refresh_token.clone() })
			.map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

		let request = ApiRequest::post(portal.refresh_url(), body).with_bearer(session.token.clone());
		let response = self.exchange(request).await?;
		let mut renewed = session_from_response(&portal, response)?;
		// Portals that rotate refresh tokens send a new one; others expect reuse.
		if renewed.refresh_token.is_none() {
			renewed.refresh_token = Some(refresh_token);
		}
		Ok(renewed)
	}

	/// Sends a login/refresh call and maps transport and status failures onto [`AuthError`].
	async fn exchange(&self, request: ApiRequest) -> Result<TokenResponse> {
		let attempted = self
			.retry
			.send(self.transport.as_ref(), &request, Idempotency::Write)
			.await;

		let response = attempted
			.outcome
			.map_err(|err| AuthError::Unreachable(err.to_string()))?;

		match response.status {
			200..=299 => serde_json::from_value(response.body)
				.map_err(|e| AuthError::InvalidResponse(e.to_string()).into()),
			400 | 401 | 403 => Err(AuthError::InvalidCredentials(describe(&response)).into()),
			500..=599 => Err(AuthError::Unreachable(describe(&response)).into()),
			_ => Err(AuthError::InvalidCredentials(describe(&response)).into()),
		}
	}
}

fn session_from_response(portal: &Portal, response: TokenResponse) -> Result<Session> {
	Ok(Session::from_token_response(portal, response, Utc::now())?)
}

fn describe(response: &ApiResponse) -> String {
	ErrorBody::describe(&response.body).unwrap_or_else(|| format!("status {}", response.status))
}
