//! Uniform execution of portal calls.
//!
//! The dispatcher turns a [`CommandRequest`] plus a borrowed [`Session`]
//! into one or more authenticated HTTP calls. Resource specifics come from
//! the [`Registry`]; the dispatcher itself knows only three shapes of call:
//! introspection, create and paginated read.

use std::collections::HashSet;
use std::sync::Arc;

use authdb_protocol::{ErrorBody, ListPage, PAGE_NUMBER_PARAM, PAGE_SIZE_PARAM, PAGE_TOKEN_PARAM};
use futures::{StreamExt, TryStreamExt, stream};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{AuthError, DispatchError, Result};
use crate::output::CommandResult;
use crate::portal::Portal;
use crate::registry::{Payload, Registry, ResourceDescriptor};
use crate::request::{Command, CommandRequest};
use crate::retry::{Idempotency, RetryPolicy, is_retryable_status};
use crate::session::Session;
use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

/// How list results are paged through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
	/// Sent as `?page_size=` when set.
	pub page_size: Option<u32>,
	/// Numbered pages fetched in parallel. Zero is treated as one.
	pub concurrency: usize,
	/// Hard cap on pages per list call.
	pub max_pages: u64,
}

impl Default for Pagination {
	fn default() -> Self {
		Self {
			page_size: None,
			concurrency: 4,
			max_pages: 1000,
		}
	}
}

pub struct Dispatcher {
	portal: Portal,
	transport: Arc<dyn Transport>,
	registry: Arc<Registry>,
	retry: RetryPolicy,
	pagination: Pagination,
}

impl Dispatcher {
	pub fn new(portal: Portal, transport: Arc<dyn Transport>, registry: Arc<Registry>) -> Self {
		Self {
			portal,
			transport,
			registry,
			retry: RetryPolicy::default(),
			pagination: Pagination::default(),
		}
	}

	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;
		self
	}

	pub fn with_pagination(mut self, pagination: Pagination) -> Self {
		self.pagination = pagination;
		self
	}

	/// Executes `request` and folds any failure into the result.
	pub async fn execute(&self, request: &CommandRequest, session: &Session) -> CommandResult {
		CommandResult::from_result(request.verb(), self.try_execute(request, session).await)
	}

	pub async fn try_execute(&self, request: &CommandRequest, session: &Session) -> Result<Value> {
		match &request.command {
			Command::Metadata => self.metadata(session).await,
			Command::Add { resource, payload } => self.add(self.lookup(resource)?, payload, session).await,
			Command::List { resource, payload } => self.list(self.lookup(resource)?, payload, session).await,
			other => Err(DispatchError::NotDispatchable(other.verb().to_string()).into()),
		}
	}

	fn lookup(&self, name: &str) -> Result<&ResourceDescriptor> {
		self.registry
			.lookup(name)
			.ok_or_else(|| DispatchError::UnknownResource(name.to_string()).into())
	}

	async fn metadata(&self, session: &Session) -> Result<Value> {
		let request = ApiRequest::get(self.portal.metadata_url()).with_bearer(&session.token);
		self.call(&request, Idempotency::Read).await
	}

	async fn add(&self, descriptor: &ResourceDescriptor, payload: &Payload, session: &Session) -> Result<Value> {
		let object = Value::Object(descriptor.serialize_payload(payload)?);
		let segments = descriptor.resolve_path(payload)?;
		let url = self.portal.endpoint(segments.iter().map(String::as_str));

		debug!(resource = %descriptor.name, %url, "creating record");
		let request = ApiRequest::post(url, object.clone()).with_bearer(&session.token);
		let created = self.call(&request, Idempotency::Write).await?;

		// Portals answering 201/204 without a body confirm the submitted record.
		Ok(if created.is_null() { object } else { created })
	}

	async fn list(&self, descriptor: &ResourceDescriptor, payload: &Payload, session: &Session) -> Result<Value> {
		descriptor.check_list_payload(payload)?;
		let segments = descriptor.resolve_path(payload)?;
		let base = self.portal.endpoint(segments.iter().map(String::as_str));

		let first = self.fetch_page(&base, session, None).await?;
		let mut items = Vec::new();

		match (first.next_token().map(str::to_string), first.total_pages) {
			(Some(token), _) => {
				items.extend(first.items);
				self.follow_cursor(&base, session, token, &mut items).await?;
			}
			(None, Some(total)) if total > 1 => {
				if total > self.pagination.max_pages {
					return Err(DispatchError::InvalidResponse(format!(
						"portal reports {total} pages, more than the limit of {}",
						self.pagination.max_pages
					))
					.into());
				}
				items.extend(first.items);
				let rest: Vec<ListPage> = stream::iter(2..=total)
					.map(|page| self.fetch_page(&base, session, Some((PAGE_NUMBER_PARAM, page.to_string()))))
					.buffered(self.pagination.concurrency.max(1))
					.try_collect()
					.await?;
				items.extend(rest.into_iter().flat_map(|page| page.items));
			}
			_ => items.extend(first.items),
		}

		debug!(resource = %descriptor.name, records = items.len(), "list assembled");
		Ok(Value::Array(items))
	}

	async fn follow_cursor(&self, base: &Url, session: &Session, first: String, items: &mut Vec<Value>) -> Result<()> {
		let mut seen = HashSet::new();
		let mut next = Some(first);
		let mut fetched: u64 = 1;

		while let Some(token) = next {
			if !seen.insert(token.clone()) {
				return Err(DispatchError::InvalidResponse(format!("portal repeated page token {token:?}")).into());
			}
			if fetched >= self.pagination.max_pages {
				return Err(DispatchError::InvalidResponse(format!(
					"list exceeds the limit of {} pages",
					self.pagination.max_pages
				))
				.into());
			}
			let page = self.fetch_page(base, session, Some((PAGE_TOKEN_PARAM, token))).await?;
			fetched += 1;
			next = page.next_token().map(str::to_string);
			items.extend(page.items);
		}
		Ok(())
	}

	async fn fetch_page(&self, base: &Url, session: &Session, cursor: Option<(&str, String)>) -> Result<ListPage> {
		let mut query: Vec<(&str, String)> = Vec::new();
		if let Some(size) = self.pagination.page_size {
			query.push((PAGE_SIZE_PARAM, size.to_string()));
		}
		query.extend(cursor);

		let mut url = base.clone();
		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query);
		}

		debug!(%url, "fetching page");
		let body = self.call(&ApiRequest::get(url).with_bearer(&session.token), Idempotency::Read).await?;
		ListPage::from_body(body).ok_or_else(|| {
			DispatchError::InvalidResponse("list body is neither an array nor a page envelope".into()).into()
		})
	}

	/// Sends one request through the retry policy and returns the body of a
	/// successful answer.
	async fn call(&self, request: &ApiRequest, idempotency: Idempotency) -> Result<Value> {
		let attempted = self.retry.send(self.transport.as_ref(), request, idempotency).await;
		let attempts = attempted.attempts;

		let response = attempted
			.outcome
			.map_err(|err| transport_failure(idempotency, attempts, err))?;
		check_status(response, idempotency, attempts)
	}
}

fn transport_failure(idempotency: Idempotency, attempts: u32, err: TransportError) -> DispatchError {
	let message = match (idempotency, &err) {
		(Idempotency::Write, TransportError::NotSent(_)) => format!("{err}; the request was not sent"),
		(Idempotency::Write, _) => format!("{err}; the portal may or may not have applied the request"),
		(Idempotency::Read, _) => err.to_string(),
	};
	DispatchError::Transient { attempts, message }
}

fn check_status(response: ApiResponse, idempotency: Idempotency, attempts: u32) -> Result<Value> {
	if response.is_success() {
		return Ok(response.body);
	}

	let message = ErrorBody::describe(&response.body).unwrap_or_else(|| format!("status {}", response.status));
	match response.status {
		401 => Err(AuthError::Expired.into()),
		status if idempotency == Idempotency::Read && is_retryable_status(status) => {
			Err(DispatchError::Transient { attempts, message }.into())
		}
		status => Err(DispatchError::ServerRejected { status, message }.into()),
	}
}
