//! Rust client library for the glossary API of a metadata-catalog service.
//!
//! Public API layers:
//! - [`RouteRegistry`]/[`RouteDescriptor`]: the immutable operation table
//!   ([`GLOSSARY_ROUTES`], ids in [`ops`]).
//! - [`GlossaryClient`]/[`BlockingGlossaryClient`]: invoke any operation by id,
//!   deferred or blocking.
//! - [`Transport`]: the I/O seam, [`ReqwestTransport`] by default.
//! - [`unwrap_body`]/[`unwrap_void`]/[`unwrap_json`]: turn results into
//!   "data", "no data", or a fault.
//! - [`ClientError`]: unified error type, classified by [`ErrorKind`].
//!
//! Payloads are opaque bytes; the client does not interpret glossary JSON.

mod blocking_client;
mod client;
mod error;
mod request;
mod response;
mod route;
mod transport;

/// Blocking operation client.
pub use blocking_client::BlockingGlossaryClient;
/// Async operation client.
pub use client::{DEFAULT_API_VERSION, Deferred, GlossaryClient};
/// Error type returned by all client operations.
pub use error::{ClientError, ErrorKind};
pub use request::{InvocationRequest, OperationCall, RequestBody};
pub use response::{
    ByteStream, InvocationResult, StreamedResult, unwrap_body, unwrap_json, unwrap_void,
};
pub use route::{
    API_VERSION, BodyKind, GLOSSARY_ROUTES, RouteDescriptor, RouteRegistry, ops,
};
pub use transport::{ReqwestTransport, Transport};
