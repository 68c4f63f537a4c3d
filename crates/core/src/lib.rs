//! Client-side core of `authdbctl`.
//!
//! A command flows through one pipeline:
//!
//! 1. [`SessionManager`] loads the persisted [`Session`] and renews it when it
//!    has expired and the portal issued a refresh token.
//! 2. [`Dispatcher`] looks the resource up in the [`Registry`], builds the
//!    authenticated call and assembles paginated lists.
//! 3. [`render`] projects the resulting [`CommandResult`] into JSON, YAML,
//!    a table or TOON.
//!
//! [`Client`] wires the three together as a single `CommandRequest ->
//! CommandResult` function; the `authdbctl` binary is a thin adapter around it.

pub mod client;
pub mod dispatch;
pub mod error;
pub mod output;
pub mod portal;
pub mod registry;
pub mod request;
pub mod retry;
pub mod session;
pub mod testing;
pub mod transport;

pub use client::{Client, ClientOptions};
pub use dispatch::{Dispatcher, Pagination};
pub use error::{
	AuthError, DispatchError, Error, ErrorCode, ErrorDetail, FormatError, RegistryError, Result, SessionError,
};
pub use output::{CommandResult, OutputFormat, Status, render};
pub use portal::Portal;
pub use registry::{FieldKind, FieldSpec, Payload, Registry, ResourceDescriptor};
pub use request::{Command, CommandRequest, Verb};
pub use retry::RetryPolicy;
pub use session::{Credentials, Session, SessionManager, TokenStore};
pub use transport::{HttpTransport, Transport};
