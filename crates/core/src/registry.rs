//! Resource registry: static descriptors keyed by resource name.
//!
//! A resource is data, not code. Adding one means registering a
//! [`ResourceDescriptor`] with its endpoint template and field contract;
//! the dispatcher handles every resource the same way.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{DispatchError, RegistryError};

/// Field values as supplied on the command line, keyed by field name.
pub type Payload = BTreeMap<String, String>;

/// How a textual field value is encoded in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
	/// Sent as a JSON string.
	Text,
	/// `true`/`false`/`yes`/`no`/`1`/`0`, sent as a JSON bool.
	Flag,
	/// Comma-separated, sent as a JSON array of strings.
	List,
	/// Sent as a JSON number.
	Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
	pub name: String,
	pub kind: FieldKind,
}

impl FieldKind {
	fn encode(self, field: &str, raw: &str) -> Result<Value, DispatchError> {
		let invalid = |reason: &str| DispatchError::InvalidField {
			field: field.to_string(),
			reason: reason.to_string(),
		};

		match self {
			FieldKind::Text => Ok(Value::String(raw.to_string())),
			FieldKind::Flag => match raw.trim().to_ascii_lowercase().as_str() {
				"true" | "yes" | "1" => Ok(Value::Bool(true)),
				"false" | "no" | "0" => Ok(Value::Bool(false)),
				_ => Err(invalid("expected true or false")),
			},
			FieldKind::List => Ok(Value::Array(
				raw.split(',')
					.map(str::trim)
					.filter(|s| !s.is_empty())
					.map(|s| Value::String(s.to_string()))
					.collect(),
			)),
			FieldKind::Number => {
				let trimmed = raw.trim();
				if let Ok(n) = trimmed.parse::<i64>() {
					return Ok(Value::from(n));
				}
				trimmed
					.parse::<f64>()
					.ok()
					.and_then(serde_json::Number::from_f64)
					.map(Value::Number)
					.ok_or_else(|| invalid("expected a number"))
			}
		}
	}
}

/// Immutable description of one resource collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
	pub name: String,
	/// Endpoint path relative to the portal, e.g. `/api/users/{username}/keys`.
	/// Placeholders must span a whole path segment.
	pub path: String,
	pub required: Vec<FieldSpec>,
	pub optional: Vec<FieldSpec>,
}

/// One parsed segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
	Literal(&'a str),
	Placeholder(&'a str),
}

impl ResourceDescriptor {
	pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			path: path.into(),
			required: Vec::new(),
			optional: Vec::new(),
		}
	}

	pub fn required(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
		self.required.push(FieldSpec { name: name.into(), kind });
		self
	}

	pub fn optional(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
		self.optional.push(FieldSpec { name: name.into(), kind });
		self
	}

	fn field(&self, name: &str) -> Option<&FieldSpec> {
		self.required.iter().chain(&self.optional).find(|f| f.name == name)
	}

	fn segments(&self) -> Result<Vec<Segment<'_>>, String> {
		self.path
			.split('/')
			.filter(|s| !s.is_empty())
			.map(|s| match (s.strip_prefix('{'), s.contains(['{', '}'])) {
				(Some(rest), _) => match rest.strip_suffix('}') {
					Some(name) if !name.is_empty() && !name.contains(['{', '}']) => Ok(Segment::Placeholder(name)),
					_ => Err(format!("malformed placeholder {s:?}")),
				},
				(None, true) => Err(format!("placeholder must span a whole segment: {s:?}")),
				(None, false) => Ok(Segment::Literal(s)),
			})
			.collect()
	}

	/// Names of the `{placeholders}` in the path template.
	pub fn placeholders(&self) -> Vec<&str> {
		self.segments()
			.unwrap_or_default()
			.into_iter()
			.filter_map(|s| match s {
				Segment::Placeholder(name) => Some(name),
				Segment::Literal(_) => None,
			})
			.collect()
	}

	fn validate(&self) -> Result<(), RegistryError> {
		let invalid = |reason: String| RegistryError::InvalidTemplate {
			name: self.name.clone(),
			reason,
		};
		if self.name.is_empty() {
			return Err(invalid("empty resource name".into()));
		}
		let segments = self.segments().map_err(invalid)?;
		if segments.is_empty() {
			return Err(invalid("empty path".into()));
		}
		for segment in segments {
			if let Segment::Placeholder(name) = segment {
				if !self.required.iter().any(|f| f.name == name) {
					return Err(invalid(format!("placeholder {{{name}}} is not a required field")));
				}
			}
		}
		let mut seen = BTreeSet::new();
		for field in self.required.iter().chain(&self.optional) {
			if !seen.insert(field.name.as_str()) {
				return Err(invalid(format!("field {} declared twice", field.name)));
			}
		}
		Ok(())
	}

	/// Path segments with placeholders filled from `payload`, unencoded.
	pub fn resolve_path(&self, payload: &Payload) -> Result<Vec<String>, DispatchError> {
		let segments = self.segments().map_err(|reason| DispatchError::InvalidField {
			field: "path".into(),
			reason,
		})?;

		segments
			.into_iter()
			.map(|segment| match segment {
				Segment::Literal(s) => Ok(s.to_string()),
				Segment::Placeholder(name) => payload
					.get(name)
					.filter(|v| !v.is_empty())
					.cloned()
					.ok_or_else(|| DispatchError::MissingField(name.to_string())),
			})
			.collect()
	}

	/// Checks the payload against the field contract and encodes it as a
	/// JSON object, fields in declaration order.
	pub fn serialize_payload(&self, payload: &Payload) -> Result<Map<String, Value>, DispatchError> {
		for fs in &self.required {
			if payload.get(&fs.name).is_none_or(|v| v.is_empty()) {
				return Err(DispatchError::MissingField(fs.name.clone()));
			}
		}
		if let Some(unknown) = payload.keys().find(|k| self.field(k).is_none()) {
			return Err(DispatchError::UnknownField {
				resource: self.name.clone(),
				field: unknown.clone(),
			});
		}

		let mut object = Map::new();
		for fs in self.required.iter().chain(&self.optional) {
			if let Some(raw) = payload.get(&fs.name) {
				object.insert(fs.name.clone(), fs.kind.encode(&fs.name, raw)?);
			}
		}
		Ok(object)
	}

	/// Checks a list payload: only path placeholders are accepted.
	pub fn check_list_payload(&self, payload: &Payload) -> Result<(), DispatchError> {
		let placeholders = self.placeholders();
		match payload.keys().find(|k| !placeholders.contains(&k.as_str())) {
			Some(field) => Err(DispatchError::UnknownField {
				resource: self.name.clone(),
				field: field.clone(),
			}),
			None => Ok(()),
		}
	}
}

/// Name-keyed, populate-once set of resource descriptors.
#[derive(Debug, Clone, Default)]
pub struct Registry {
	resources: BTreeMap<String, ResourceDescriptor>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registry with the resources every AuthDB portal exposes.
	pub fn builtin() -> Result<Self, RegistryError> {
		let mut registry = Self::new();
		for descriptor in builtin_descriptors() {
			registry.register(descriptor)?;
		}
		Ok(registry)
	}

	pub fn register(&mut self, descriptor: ResourceDescriptor) -> Result<(), RegistryError> {
		descriptor.validate()?;
		if self.resources.contains_key(&descriptor.name) {
			return Err(RegistryError::Duplicate(descriptor.name));
		}
		self.resources.insert(descriptor.name.clone(), descriptor);
		Ok(())
	}

	pub fn lookup(&self, name: &str) -> Option<&ResourceDescriptor> {
		self.resources.get(name)
	}

	pub fn len(&self) -> usize {
		self.resources.len()
	}

	pub fn is_empty(&self) -> bool {
		self.resources.is_empty()
	}

	/// Descriptors sorted by name.
	pub fn iter(&self) -> impl Iterator<Item = &ResourceDescriptor> {
		self.resources.values()
	}

	/// Tabular view used by the `resources` command.
	pub fn describe(&self) -> Value {
		let names = |fields: &[FieldSpec]| fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(",");
		Value::Array(
			self.iter()
				.map(|d| {
					serde_json::json!({
						"name": d.name,
						"path": d.path,
						"required": names(&d.required),
						"optional": names(&d.optional),
					})
				})
				.collect(),
		)
	}
}

fn builtin_descriptors() -> Vec<ResourceDescriptor> {
	use FieldKind::*;

	vec![
		ResourceDescriptor::new("user", "/api/users")
			.required("username", Text)
			.required("email", Text)
			.optional("name", Text)
			.optional("roles", List)
			.optional("disabled", Flag),
		ResourceDescriptor::new("role", "/api/roles")
			.required("name", Text)
			.optional("description", Text),
		ResourceDescriptor::new("policy", "/api/policies")
			.required("name", Text)
			.optional("description", Text)
			.optional("roles", List)
			.optional("priority", Number),
		ResourceDescriptor::new("api-key", "/api/users/{username}/api-keys")
			.required("username", Text)
			.required("usage", Text)
			.optional("comment", Text)
			.optional("expires_in_days", Number),
	]
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn payload(pairs: &[(&str, &str)]) -> Payload {
		pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
	}

	#[test]
	fn builtin_table_registers_cleanly() {
		let registry = Registry::builtin().expect("builtin resource table must be consistent");
		assert_eq!(registry.len(), builtin_descriptors().len());
	}

	#[test]
	fn builtin_has_core_resources() {
		let registry = Registry::builtin().unwrap();
		for name in ["user", "role", "policy", "api-key"] {
			assert!(registry.lookup(name).is_some(), "missing {name}");
		}
		assert!(registry.lookup("widget").is_none());
	}

	#[test]
	fn duplicate_registration_is_rejected() {
		let mut registry = Registry::new();
		registry.register(ResourceDescriptor::new("role", "/api/roles")).unwrap();
		let err = registry
			.register(ResourceDescriptor::new("role", "/api/other"))
			.unwrap_err();
		assert_eq!(err, RegistryError::Duplicate("role".into()));
		assert_eq!(registry.lookup("role").unwrap().path, "/api/roles");
	}

	#[test]
	fn templates_are_validated_at_registration() {
		let mut registry = Registry::new();
		let partial = ResourceDescriptor::new("a", "/api/x{id}").required("id", FieldKind::Text);
		assert!(matches!(registry.register(partial), Err(RegistryError::InvalidTemplate { .. })));

		let undeclared = ResourceDescriptor::new("b", "/api/{id}");
		assert!(matches!(registry.register(undeclared), Err(RegistryError::InvalidTemplate { .. })));

		let twice = ResourceDescriptor::new("c", "/api/c")
			.required("x", FieldKind::Text)
			.optional("x", FieldKind::Text);
		assert!(matches!(registry.register(twice), Err(RegistryError::InvalidTemplate { .. })));
		assert!(registry.is_empty());
	}

	#[test]
	fn serialize_encodes_by_kind_in_declaration_order() {
		let registry = Registry::builtin().unwrap();
		let user = registry.lookup("user").unwrap();
		let object = user
			.serialize_payload(&payload(&[
				("roles", "admin, editor,"),
				("email", "a@b.com"),
				("username", "jsmith"),
				("disabled", "no"),
			]))
			.unwrap();

		assert_eq!(
			Value::Object(object.clone()),
			json!({"username": "jsmith", "email": "a@b.com", "roles": ["admin", "editor"], "disabled": false})
		);
		let keys: Vec<_> = object.keys().cloned().collect();
		assert_eq!(keys, ["username", "email", "roles", "disabled"]);
	}

	#[test]
	fn missing_required_field_is_reported_by_name() {
		let registry = Registry::builtin().unwrap();
		let err = registry
			.lookup("user")
			.unwrap()
			.serialize_payload(&payload(&[("username", "jsmith")]))
			.unwrap_err();
		assert_eq!(err, DispatchError::MissingField("email".into()));
	}

	#[test]
	fn unknown_and_invalid_fields_are_rejected() {
		let registry = Registry::builtin().unwrap();
		let role = registry.lookup("role").unwrap();
		assert!(matches!(
			role.serialize_payload(&payload(&[("name", "admin"), ("colour", "red")])),
			Err(DispatchError::UnknownField { .. })
		));

		let policy = registry.lookup("policy").unwrap();
		assert!(matches!(
			policy.serialize_payload(&payload(&[("name", "p"), ("priority", "high")])),
			Err(DispatchError::InvalidField { .. })
		));
		assert_eq!(
			policy.serialize_payload(&payload(&[("name", "p"), ("priority", "2.5")])).unwrap()["priority"],
			json!(2.5)
		);
	}

	#[test]
	fn path_placeholders_come_from_payload() {
		let registry = Registry::builtin().unwrap();
		let key = registry.lookup("api-key").unwrap();
		assert_eq!(key.placeholders(), ["username"]);
		assert_eq!(
			key.resolve_path(&payload(&[("username", "jsmith")])).unwrap(),
			["api", "users", "jsmith", "api-keys"]
		);
		assert_eq!(
			key.resolve_path(&Payload::new()).unwrap_err(),
			DispatchError::MissingField("username".into())
		);
	}

	#[test]
	fn list_payload_accepts_only_placeholders() {
		let registry = Registry::builtin().unwrap();
		let key = registry.lookup("api-key").unwrap();
		assert!(key.check_list_payload(&payload(&[("username", "jsmith")])).is_ok());
		assert!(key.check_list_payload(&payload(&[("usage", "api")])).is_err());
	}

	#[test]
	fn describe_lists_every_resource() {
		let described = Registry::builtin().unwrap().describe();
		let rows = described.as_array().unwrap();
		assert_eq!(rows.len(), 4);
		assert_eq!(rows[0]["name"], "api-key");
		assert_eq!(rows[0]["required"], "username,usage");
	}
}
