//! HTTP transport seam.
//!
//! The session manager and dispatcher talk to the portal only through
//! [`Transport`], so tests can substitute
//! [`ScriptedTransport`](crate::testing::ScriptedTransport) and count calls.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::trace;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
	Get,
	Post,
}

impl fmt::Display for Method {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Method::Get => f.write_str("GET"),
			Method::Post => f.write_str("POST"),
		}
	}
}

/// A single HTTP call against the portal.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
	pub method: Method,
	pub url: Url,
	pub bearer: Option<String>,
	pub body: Option<Value>,
}

impl ApiRequest {
	pub fn get(url: Url) -> Self {
		Self {
			method: Method::Get,
			url,
			bearer: None,
			body: None,
		}
	}

	pub fn post(url: Url, body: Value) -> Self {
		Self {
			method: Method::Post,
			url,
			bearer: None,
			body: Some(body),
		}
	}

	pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
		self.bearer = Some(token.into());
		self
	}
}

impl fmt::Debug for ApiRequest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ApiRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("authorized", &self.bearer.is_some())
			.field("has_body", &self.body.is_some())
			.finish()
	}
}

/// Status and decoded body of a portal answer.
///
/// Non-JSON bodies are carried as [`Value::String`], empty bodies as [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
	pub status: u16,
	pub body: Value,
}

impl ApiResponse {
	pub fn new(status: u16, body: Value) -> Self {
		Self { status, body }
	}

	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Transport-level failures, split by whether the request may have reached the portal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
	/// The connection was never established; the request provably did not leave the client.
	#[error("connection failed: {0}")]
	NotSent(String),

	#[error("request timed out: {0}")]
	Timeout(String),

	/// The connection broke after the request started.
	#[error("connection interrupted: {0}")]
	Interrupted(String),

	#[error("{0}")]
	Other(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
	async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// [`Transport`] backed by `reqwest`, with a per-call timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: reqwest::Client,
}

impl HttpTransport {
	pub fn new(timeout: Duration) -> Result<Self, TransportError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.connect_timeout(timeout)
			.user_agent(concat!("authdbctl/", env!("CARGO_PKG_VERSION")))
			.build()
			.map_err(|e| TransportError::Other(format!("failed to create HTTP client: {e}")))?;
		Ok(Self { client })
	}
}

fn classify(err: reqwest::Error) -> TransportError {
	let msg = err.to_string();
	if err.is_connect() {
		TransportError::NotSent(msg)
	} else if err.is_timeout() {
		TransportError::Timeout(msg)
	} else if err.is_request() || err.is_body() {
		TransportError::Interrupted(msg)
	} else {
		TransportError::Other(msg)
	}
}

#[async_trait]
impl Transport for HttpTransport {
	async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
		let mut builder = match request.method {
			Method::Get => self.client.get(request.url.clone()),
			Method::Post => self.client.post(request.url.clone()),
		};
		builder = builder.header(reqwest::header::ACCEPT, "application/json");
		if let Some(ref token) = request.bearer {
			builder = builder.bearer_auth(token);
		}
		if let Some(ref body) = request.body {
			builder = builder.json(body);
		}

		let response = builder.send().await.map_err(classify)?;
		let status = response.status().as_u16();
		let bytes = response.bytes().await.map_err(classify)?;
		trace!(%status, len = bytes.len(), url = %request.url, "portal response");

		let body = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes)
				.unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
		};

		Ok(ApiResponse { status, body })
	}
}
