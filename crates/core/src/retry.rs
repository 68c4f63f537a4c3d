//! Bounded retry with exponential backoff.

use std::time::Duration;

use tracing::{debug, warn};

use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

/// Whether repeating a request is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
	/// Safe to repeat after any transient failure.
	Read,
	/// Repeated only when the transport proves the request never left the client.
	Write,
}

/// Final outcome of a request after retries, with the number of attempts made.
#[derive(Debug)]
pub struct Attempted {
	pub attempts: u32,
	pub outcome: Result<ApiResponse, TransportError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Total tries including the first one. Zero is treated as one.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(200),
			max_delay: Duration::from_secs(5),
		}
	}
}

/// Gateway statuses that mean the portal never processed the request.
pub fn is_retryable_status(status: u16) -> bool {
	matches!(status, 502..=504)
}

impl RetryPolicy {
	/// Never retries.
	pub fn none() -> Self {
		Self {
			max_attempts: 1,
			..Self::default()
		}
	}

	/// Backoff before retry number `retry` (0-based): `base * 2^retry`, capped.
	pub fn delay_for(&self, retry: u32) -> Duration {
		let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
		self.base_delay.saturating_mul(factor).min(self.max_delay)
	}

	fn may_retry_error(idempotency: Idempotency, err: &TransportError) -> bool {
		match (idempotency, err) {
			(_, TransportError::NotSent(_)) => true,
			(Idempotency::Read, TransportError::Timeout(_) | TransportError::Interrupted(_)) => true,
			_ => false,
		}
	}

	/// Sends `request`, repeating the exact same call on retryable failures.
	pub async fn send(
		&self,
		transport: &dyn Transport,
		request: &ApiRequest,
		idempotency: Idempotency,
	) -> Attempted {
		let max_attempts = self.max_attempts.max(1);
		let mut attempts = 0;

		loop {
			attempts += 1;
			debug!(method = %request.method, url = %request.url, attempt = attempts, "sending request");
			let outcome = transport.send(request).await;

			let retryable = match &outcome {
				Ok(resp) => idempotency == Idempotency::Read && is_retryable_status(resp.status),
				Err(err) => Self::may_retry_error(idempotency, err),
			};

			if !retryable || attempts >= max_attempts {
				return Attempted { attempts, outcome };
			}

			let delay = self.delay_for(attempts - 1);
			match &outcome {
				Ok(resp) => warn!(status = resp.status, ?delay, attempt = attempts, "portal unavailable, retrying"),
				Err(err) => warn!(error = %err, ?delay, attempt = attempts, "transient failure, retrying"),
			}
			tokio::time::sleep(delay).await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{Reply, ScriptedTransport};
	use serde_json::json;
	use url::Url;

	fn fast() -> RetryPolicy {
		RetryPolicy {
			max_attempts: 3,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(5),
		}
	}

	fn request() -> ApiRequest {
		ApiRequest::get(Url::parse("http://portal.test/metadata").unwrap())
	}

	#[test]
	fn backoff_doubles_and_caps() {
		let policy = RetryPolicy {
			max_attempts: 10,
			base_delay: Duration::from_millis(100),
			max_delay: Duration::from_millis(500),
		};
		assert_eq!(policy.delay_for(0), Duration::from_millis(100));
		assert_eq!(policy.delay_for(1), Duration::from_millis(200));
		assert_eq!(policy.delay_for(2), Duration::from_millis(400));
		assert_eq!(policy.delay_for(3), Duration::from_millis(500));
		assert_eq!(policy.delay_for(40), Duration::from_millis(500));
	}

	#[tokio::test]
	async fn read_retries_timeouts_until_success() {
		let transport = ScriptedTransport::queue(vec![
			Reply::error(TransportError::Timeout("slow".into())),
			Reply::error(TransportError::Interrupted("reset".into())),
			Reply::json(200, json!({"ok": true})),
		]);
		let attempted = fast().send(&transport, &request(), Idempotency::Read).await;
		assert_eq!(attempted.attempts, 3);
		assert_eq!(attempted.outcome.unwrap().body, json!({"ok": true}));
		assert_eq!(transport.call_count(), 3);
	}

	#[tokio::test]
	async fn read_gives_up_after_bound() {
		let transport = ScriptedTransport::new(|_| Reply::error(TransportError::Timeout("slow".into())));
		let attempted = fast().send(&transport, &request(), Idempotency::Read).await;
		assert_eq!(attempted.attempts, 3);
		assert!(matches!(attempted.outcome, Err(TransportError::Timeout(_))));
		assert_eq!(transport.call_count(), 3);
	}

	#[tokio::test]
	async fn write_is_not_retried_once_possibly_sent() {
		let transport = ScriptedTransport::new(|_| Reply::error(TransportError::Timeout("slow".into())));
		let attempted = fast().send(&transport, &request(), Idempotency::Write).await;
		assert_eq!(attempted.attempts, 1);
		assert_eq!(transport.call_count(), 1);
	}

	#[tokio::test]
	async fn write_is_retried_when_never_sent() {
		let transport = ScriptedTransport::queue(vec![
			Reply::error(TransportError::NotSent("refused".into())),
			Reply::json(201, json!({"id": 1})),
		]);
		let attempted = fast().send(&transport, &request(), Idempotency::Write).await;
		assert_eq!(attempted.attempts, 2);
		assert_eq!(attempted.outcome.unwrap().status, 201);
	}

	#[tokio::test]
	async fn gateway_errors_are_retried_for_reads_only() {
		let transport = ScriptedTransport::queue(vec![
			Reply::json(503, json!("unavailable")),
			Reply::json(200, json!([])),
		]);
		let attempted = fast().send(&transport, &request(), Idempotency::Read).await;
		assert_eq!(attempted.attempts, 2);

		let transport = ScriptedTransport::new(|_| Reply::json(503, json!("unavailable")));
		let attempted = fast().send(&transport, &request(), Idempotency::Write).await;
		assert_eq!(attempted.attempts, 1);
		assert_eq!(attempted.outcome.unwrap().status, 503);
	}

	#[tokio::test]
	async fn client_errors_are_final() {
		let transport = ScriptedTransport::new(|_| Reply::json(401, json!({"message": "expired"})));
		let attempted = fast().send(&transport, &request(), Idempotency::Read).await;
		assert_eq!(attempted.attempts, 1);
	}
}
