//! Test doubles for the portal transport.
//!
//! [`ScriptedTransport`] answers requests from a closure or a fixed queue,
//! records every request it receives and can delay individual replies, which
//! is enough to exercise retry, pagination ordering and "no network call"
//! guarantees without a live portal.
//!
//! # Example
//!
//! ```ignore
//! use authdb::testing::{Reply, ScriptedTransport};
//!
//! let transport = ScriptedTransport::new(|req| match req.url.path() {
//!     "/metadata" => Reply::json(200, json!({"version": "1.1.7"})),
//!     _ => Reply::json(404, json!({"message": "not found"})),
//! });
//! // ... run a command, then
//! assert_eq!(transport.call_count(), 1);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

/// A canned answer, optionally delivered after a delay.
#[derive(Debug, Clone)]
pub struct Reply {
	pub outcome: Result<ApiResponse, TransportError>,
	pub delay: Duration,
}

impl Reply {
	pub fn json(status: u16, body: Value) -> Self {
		Self {
			outcome: Ok(ApiResponse::new(status, body)),
			delay: Duration::ZERO,
		}
	}

	pub fn error(err: TransportError) -> Self {
		Self {
			outcome: Err(err),
			delay: Duration::ZERO,
		}
	}

	pub fn after(mut self, delay: Duration) -> Self {
		self.delay = delay;
		self
	}
}

type Handler = dyn Fn(&ApiRequest) -> Reply + Send + Sync;

/// [`Transport`] that replays scripted replies and records requests.
pub struct ScriptedTransport {
	handler: Box<Handler>,
	calls: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
	/// Answers every request with `handler`.
	pub fn new(handler: impl Fn(&ApiRequest) -> Reply + Send + Sync + 'static) -> Self {
		Self {
			handler: Box::new(handler),
			calls: Mutex::new(Vec::new()),
		}
	}

	/// Answers requests with `replies` in order; further requests fail with
	/// [`TransportError::Other`].
	pub fn queue(replies: Vec<Reply>) -> Self {
		let replies = Mutex::new(VecDeque::from(replies));
		Self::new(move |_| {
			replies
				.lock()
				.pop_front()
				.unwrap_or_else(|| Reply::error(TransportError::Other("no scripted reply left".into())))
		})
	}

	/// A transport that must never be called.
	pub fn unreachable() -> Self {
		Self::new(|req| Reply::error(TransportError::Other(format!("unexpected request: {} {}", req.method, req.url))))
	}

	pub fn into_shared(self) -> Arc<Self> {
		Arc::new(self)
	}

	pub fn call_count(&self) -> usize {
		self.calls.lock().len()
	}

	pub fn calls(&self) -> Vec<ApiRequest> {
		self.calls.lock().clone()
	}
}

#[async_trait]
impl Transport for ScriptedTransport {
	async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
		self.calls.lock().push(request.clone());
		let reply = (self.handler)(request);
		if !reply.delay.is_zero() {
			tokio::time::sleep(reply.delay).await;
		}
		reply.outcome
	}
}
