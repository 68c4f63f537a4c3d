//! The command pipeline: request in, result out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::debug;

use crate::dispatch::{Dispatcher, Pagination};
use crate::error::{DispatchError, Error, Result};
use crate::output::CommandResult;
use crate::portal::Portal;
use crate::registry::Registry;
use crate::request::{Command, CommandRequest};
use crate::retry::RetryPolicy;
use crate::session::{DEFAULT_REFRESH_DEADLINE, SessionManager, TokenStore};
use crate::transport::Transport;

/// Settings resolved by the caller from flags, environment and config file.
#[derive(Debug, Clone)]
pub struct ClientOptions {
	/// Portal base URL. When unset, the portal of the stored session is used.
	pub portal: Option<String>,
	pub token_path: PathBuf,
	pub retry: RetryPolicy,
	pub pagination: Pagination,
	pub refresh_deadline: Duration,
}

impl ClientOptions {
	pub fn new(token_path: impl Into<PathBuf>) -> Self {
		Self {
			portal: None,
			token_path: token_path.into(),
			retry: RetryPolicy::default(),
			pagination: Pagination::default(),
			refresh_deadline: DEFAULT_REFRESH_DEADLINE,
		}
	}

	pub fn portal(mut self, url: impl Into<String>) -> Self {
		self.portal = Some(url.into());
		self
	}
}

/// Runs one [`CommandRequest`] to completion.
///
/// ```ignore
/// let client = Client::new(options, Arc::new(HttpTransport::new(timeout)?), Arc::new(Registry::builtin()?));
/// let result = client.run(CommandRequest::new(Command::Metadata, OutputFormat::Json)).await;
/// ```
pub struct Client {
	portal: Option<String>,
	manager: SessionManager,
	transport: Arc<dyn Transport>,
	registry: Arc<Registry>,
	retry: RetryPolicy,
	pagination: Pagination,
}

impl Client {
	pub fn new(options: ClientOptions, transport: Arc<dyn Transport>, registry: Arc<Registry>) -> Self {
		let manager = SessionManager::new(TokenStore::new(options.token_path), transport.clone(), options.retry)
			.with_refresh_deadline(options.refresh_deadline);
		Self {
			portal: options.portal,
			manager,
			transport,
			registry,
			retry: options.retry,
			pagination: options.pagination,
		}
	}

	pub fn registry(&self) -> &Registry {
		&self.registry
	}

	pub fn sessions(&self) -> &SessionManager {
		&self.manager
	}

	/// Never fails: every error becomes a failed [`CommandResult`].
	pub async fn run(&self, request: CommandRequest) -> CommandResult {
		let verb = request.verb();
		let result = self.try_run(&request).await;
		if let Err(ref err) = result {
			debug!(command = %verb, error = %err, "command failed");
		}
		CommandResult::from_result(verb, result)
	}

	async fn try_run(&self, request: &CommandRequest) -> Result<Value> {
		match &request.command {
			Command::Resources => Ok(self.registry.describe()),
			Command::Disconnect => {
				let removed = self.manager.disconnect()?;
				Ok(json!({ "disconnected": removed }))
			}
			Command::Connect(credentials) => {
				let portal = self.resolve_portal()?;
				let session = self.manager.connect(&portal, credentials).await?;
				Ok(session.summary(Utc::now()))
			}
			command => {
				// Resource names are checked before any session or network work.
				if let Some(resource) = command.resource() {
					if self.registry.lookup(resource).is_none() {
						return Err(DispatchError::UnknownResource(resource.to_string()).into());
					}
				}

				let portal = self.resolve_portal()?;
				let session = self.manager.load_session(&portal)?;
				let session = self.manager.ensure_valid(session).await?;

				Dispatcher::new(portal, self.transport.clone(), self.registry.clone())
					.with_retry(self.retry)
					.with_pagination(self.pagination)
					.try_execute(request, &session)
					.await
			}
		}
	}

	fn resolve_portal(&self) -> Result<Portal> {
		if let Some(url) = self.portal.as_deref() {
			return Portal::parse(url);
		}
		match self.manager.store().stored_portal()? {
			Some(url) => Portal::parse(&url),
			None => Err(Error::InvalidPortal {
				url: String::new(),
				reason: "no portal configured, set portal_url in the config file or pass --portal".into(),
			}),
		}
	}
}
