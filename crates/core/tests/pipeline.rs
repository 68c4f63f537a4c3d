//! End-to-end pipeline tests over the scripted transport.

use std::sync::Arc;
use std::time::Duration;

use authdb::testing::{Reply, ScriptedTransport};
use authdb::{
	Client, ClientOptions, Command, CommandRequest, Credentials, ErrorCode, OutputFormat, Pagination, Payload,
	Registry, ResourceDescriptor, RetryPolicy, Status, render,
};
use serde_json::{Value, json};
use tempfile::TempDir;

fn options(tmp: &TempDir) -> ClientOptions {
	ClientOptions {
		retry: RetryPolicy::none(),
		pagination: Pagination {
			concurrency: 3,
			..Pagination::default()
		},
		..ClientOptions::new(tmp.path().join("token.json")).portal("http://portal.test")
	}
}

async fn connected(tmp: &TempDir, transport: Arc<ScriptedTransport>, registry: Registry) -> Client {
	let client = Client::new(options(tmp), transport, Arc::new(registry));
	let connect = client
		.run(CommandRequest::new(
			Command::Connect(Credentials::new("jsmith", "pw")),
			OutputFormat::Json,
		))
		.await;
	assert_eq!(connect.status, Status::Success, "{connect:?}");
	client
}

fn login_or(req_path: &str, other: impl FnOnce() -> Reply) -> Reply {
	if req_path == "/login" {
		Reply::json(200, json!({"token": "abc", "expires_in": 3600}))
	} else {
		other()
	}
}

#[tokio::test]
async fn add_against_registry_without_resource_makes_no_portal_call() {
	let tmp = TempDir::new().unwrap();
	let transport = ScriptedTransport::new(|req| login_or(req.url.path(), || Reply::json(500, Value::Null))).into_shared();

	let mut registry = Registry::new();
	registry
		.register(ResourceDescriptor::new("role", "/api/roles").required("name", authdb::FieldKind::Text))
		.unwrap();
	let client = connected(&tmp, transport.clone(), registry).await;
	let before = transport.call_count();

	let payload: Payload = [("email".to_string(), "a@b.com".to_string())].into();
	let result = client
		.run(CommandRequest::new(
			Command::Add {
				resource: "user".into(),
				payload,
			},
			OutputFormat::Json,
		))
		.await;

	assert_eq!(result.status, Status::Failure);
	assert_eq!(result.error.unwrap().code, ErrorCode::UnknownResource);
	assert_eq!(transport.call_count(), before);
}

#[tokio::test]
async fn numbered_pages_assemble_in_server_order() {
	let tmp = TempDir::new().unwrap();
	let transport = ScriptedTransport::new(|req| {
		login_or(req.url.path(), || {
			let page = req
				.url
				.query_pairs()
				.find(|(k, _)| k == "page")
				.map_or(1, |(_, v)| v.parse::<u64>().unwrap());
			let items: Vec<Value> = (1..=2).map(|i| json!({"name": format!("p{page}-r{i}")})).collect();
			// P2 completes after P3.
			let delay = if page == 2 { 50 } else { 0 };
			Reply::json(200, json!({"items": items, "page": page, "total_pages": 3})).after(Duration::from_millis(delay))
		})
	})
	.into_shared();
	let client = connected(&tmp, transport, Registry::builtin().unwrap()).await;

	let result = client
		.run(CommandRequest::new(
			Command::List {
				resource: "role".into(),
				payload: Payload::new(),
			},
			OutputFormat::Table,
		))
		.await;

	let names: Vec<&str> = result
		.data
		.as_array()
		.unwrap()
		.iter()
		.map(|r| r["name"].as_str().unwrap())
		.collect();
	assert_eq!(names, ["p1-r1", "p1-r2", "p2-r1", "p2-r2", "p3-r1", "p3-r2"]);

	let table = String::from_utf8(render(&result, OutputFormat::Table).unwrap()).unwrap();
	let p2 = table.find("p2-r1").unwrap();
	assert!(table.find("p1-r2").unwrap() < p2 && p2 < table.find("p3-r1").unwrap());
}

#[tokio::test]
async fn unauthorized_list_reports_expired_session() {
	let tmp = TempDir::new().unwrap();
	let transport =
		ScriptedTransport::new(|req| login_or(req.url.path(), || Reply::json(401, json!({"message": "expired"}))))
			.into_shared();
	let client = connected(&tmp, transport, Registry::builtin().unwrap()).await;

	let result = client
		.run(CommandRequest::new(Command::Metadata, OutputFormat::Json))
		.await;
	assert_eq!(result.error.unwrap().code, ErrorCode::SessionExpired);
}
