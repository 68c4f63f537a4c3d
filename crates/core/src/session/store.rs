//! On-disk token store.
//!
//! The store is a single JSON file holding the most recent [`Session`].
//! Writers never touch the live file: a sibling temp file is written,
//! synced, restricted to the owner and renamed over the target, so a
//! concurrent reader sees either the old session or the new one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Session;
use crate::error::SessionError;
use crate::portal::Portal;

/// Schema version of the token file.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct TokenFile {
	schema: u32,
	session: Session,
}

/// File-backed session storage. Exclusively owned by the session manager.
#[derive(Debug, Clone)]
pub struct TokenStore {
	path: PathBuf,
}

impl TokenStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Reads the stored session for `portal`.
	///
	/// A session persisted for a different portal is reported as
	/// [`SessionError::NotFound`].
	pub fn load(&self, portal: &Portal) -> Result<Session, SessionError> {
		let session = self.read()?.ok_or_else(|| SessionError::NotFound {
			portal: portal.to_string(),
		})?;

		if session.portal_url != portal.as_str() {
			debug!(
				stored = %session.portal_url,
				requested = %portal,
				"token store belongs to another portal"
			);
			return Err(SessionError::NotFound {
				portal: portal.to_string(),
			});
		}

		Ok(session)
	}

	/// Portal of whatever session is stored, if any.
	pub fn stored_portal(&self) -> Result<Option<String>, SessionError> {
		Ok(self.read()?.map(|s| s.portal_url))
	}

	fn read(&self) -> Result<Option<Session>, SessionError> {
		let content = match fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
			Err(err) => return Err(self.corrupt(err)),
		};

		let file: TokenFile = serde_json::from_str(&content).map_err(|e| self.corrupt(e))?;
		if file.schema > SCHEMA_VERSION {
			return Err(self.corrupt(format!("unsupported schema {}", file.schema)));
		}
		if file.session.expires_at <= file.session.issued_at || file.session.token.is_empty() {
			return Err(self.corrupt("session has an empty token or inverted validity window"));
		}

		Ok(Some(file.session))
	}

	/// Atomically replaces the stored session.
	pub fn save(&self, session: &Session) -> Result<(), SessionError> {
		let file = TokenFile {
			schema: SCHEMA_VERSION,
			session: session.clone(),
		};
		self.write_atomic(&file).map_err(|err| SessionError::Persist {
			path: self.path.display().to_string(),
			reason: err.to_string(),
		})?;
		debug!(path = %self.path.display(), "token store replaced");
		Ok(())
	}

	/// Removes the stored session. Returns whether a file was present.
	pub fn clear(&self) -> Result<bool, SessionError> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(true),
			Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
			Err(err) => Err(SessionError::Persist {
				path: self.path.display().to_string(),
				reason: err.to_string(),
			}),
		}
	}

	fn write_atomic(&self, file: &TokenFile) -> io::Result<()> {
		let dir = match self.path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent,
			_ => Path::new("."),
		};
		fs::create_dir_all(dir)?;

		// Dropped (and unlinked) on every early return.
		let mut tmp = tempfile::Builder::new()
			.prefix(".token-")
			.suffix(".tmp")
			.tempfile_in(dir)?;

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			tmp.as_file().set_permissions(fs::Permissions::from_mode(0o600))?;
		}

		serde_json::to_writer_pretty(tmp.as_file_mut(), file)?;
		tmp.as_file_mut().write_all(b"\n")?;
		tmp.as_file().sync_all()?;
		tmp.persist(&self.path).map_err(|e| e.error)?;
		Ok(())
	}

	fn corrupt(&self, reason: impl ToString) -> SessionError {
		SessionError::Corrupt {
			path: self.path.display().to_string(),
			reason: reason.to_string(),
		}
	}
}
