use tokio::runtime::{Builder, Runtime};

use crate::request::{InvocationRequest, OperationCall};
use crate::response::InvocationResult;
use crate::route::{RouteDescriptor, RouteRegistry};
use crate::transport::{ReqwestTransport, Transport};
use crate::{ClientError, GlossaryClient};

/// Blocking glossary API client.
///
/// This is the synchronous counterpart of [`GlossaryClient`]. Each call starts
/// the deferred invocation on a private current-thread runtime and parks the
/// calling thread until it resolves, so faults surface exactly as the async
/// client reports them.
///
/// Must not be used from within an async context: blocking on a runtime from
/// inside another one panics.
#[derive(Debug)]
pub struct BlockingGlossaryClient {
    inner: GlossaryClient,
    runtime: Runtime,
}

impl BlockingGlossaryClient {
    /// Creates a client for the given catalog endpoint using [`ReqwestTransport`].
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Self::with_transport(base_url, ReqwestTransport::new())
    }

    /// Creates a client that dispatches through `transport`.
    pub fn with_transport(
        base_url: impl AsRef<str>,
        transport: impl Transport + 'static,
    ) -> Result<Self, ClientError> {
        Self::from_async(GlossaryClient::with_transport(base_url, transport)?)
    }

    /// Wraps an already configured async client.
    pub fn from_async(inner: GlossaryClient) -> Result<Self, ClientError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ClientError::Runtime)?;
        Ok(Self { inner, runtime })
    }

    /// Supplies `api-version` on routes that require it when a call omits it.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.inner = self.inner.with_api_version(version);
        self
    }

    /// Replaces the route table.
    #[must_use]
    pub fn with_registry(mut self, registry: RouteRegistry) -> Self {
        self.inner = self.inner.with_registry(registry);
        self
    }

    pub fn routes(&self) -> &'static [RouteDescriptor] {
        self.inner.routes()
    }

    /// Resolves `call` against the registry without sending it.
    pub fn prepare(&self, call: OperationCall) -> Result<InvocationRequest, ClientError> {
        self.inner.prepare(call)
    }

    /// Invokes an operation and blocks until it completes.
    ///
    /// Streamed routes are buffered in full.
    pub fn invoke(&self, call: OperationCall) -> Result<InvocationResult, ClientError> {
        let deferred = {
            let _entered = self.runtime.enter();
            self.inner.invoke_deferred(call)
        };
        self.runtime.block_on(deferred)
    }

    /// Returns the async client this one wraps.
    pub fn as_async(&self) -> &GlossaryClient {
        &self.inner
    }
}
