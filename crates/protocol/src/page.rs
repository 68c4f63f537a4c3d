//! Paginated list envelopes.
//!
//! Portals answer a list call with either a bare JSON array (everything in
//! one page) or a [`ListPage`] envelope. Two continuation conventions are
//! supported:
//!
//! - cursor: `next_page_token` names the next page, requested with `?page_token=`
//! - numbered: `total_pages` announces the page count, pages requested with `?page=`

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query parameter carrying the cursor of the next page.
pub const PAGE_TOKEN_PARAM: &str = "page_token";
/// Query parameter carrying a 1-based page number.
pub const PAGE_NUMBER_PARAM: &str = "page";
/// Query parameter carrying the requested page size.
pub const PAGE_SIZE_PARAM: &str = "page_size";

/// One page of a list response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
	#[serde(default, alias = "data")]
	pub items: Vec<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub next_page_token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub page: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub total_pages: Option<u64>,
}

impl ListPage {
	/// Interprets a raw response body as a page.
	///
	/// A bare array becomes a terminal page. An object is an envelope only
	/// when it carries an `items` or `data` key. Returns [`None`] otherwise.
	pub fn from_body(body: Value) -> Option<Self> {
		match body {
			Value::Array(items) => Some(Self {
				items,
				..Default::default()
			}),
			Value::Object(object) if object.contains_key("items") || object.contains_key("data") => {
				serde_json::from_value(Value::Object(object)).ok()
			}
			_ => None,
		}
	}

	/// Cursor of the next page, ignoring empty strings some portals send at the end.
	pub fn next_token(&self) -> Option<&str> {
		self.next_page_token.as_deref().filter(|t| !t.is_empty())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn bare_array_is_terminal_page() {
		let page = ListPage::from_body(json!([{"name": "admin"}])).unwrap();
		assert_eq!(page.items.len(), 1);
		assert_eq!(page.next_token(), None);
		assert_eq!(page.total_pages, None);
	}

	#[test]
	fn envelope_accepts_data_alias() {
		let page = ListPage::from_body(json!({
			"data": [{"name": "a"}, {"name": "b"}],
			"next_page_token": "p2"
		}))
		.unwrap();
		assert_eq!(page.items.len(), 2);
		assert_eq!(page.next_token(), Some("p2"));
	}

	#[test]
	fn empty_cursor_means_done() {
		let page = ListPage::from_body(json!({"items": [], "next_page_token": ""})).unwrap();
		assert_eq!(page.next_token(), None);
	}

	#[test]
	fn scalars_are_not_pages() {
		assert!(ListPage::from_body(json!("nope")).is_none());
		assert!(ListPage::from_body(json!(42)).is_none());
	}

	#[test]
	fn objects_without_items_are_not_pages() {
		assert!(ListPage::from_body(json!({"roles": [{"name": "admin"}], "message": "ok"})).is_none());
		assert!(ListPage::from_body(json!({})).is_none());
		assert!(ListPage::from_body(json!({"items": null})).is_none());
	}
}
