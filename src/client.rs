use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use reqwest::Url;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, warn};

use crate::ClientError;
use crate::request::{InvocationRequest, OperationCall};
use crate::response::{InvocationResult, StreamedResult};
use crate::route::{API_VERSION, RouteDescriptor, RouteRegistry};
use crate::transport::{ReqwestTransport, Transport};

/// API version the CSV routes were published with.
pub const DEFAULT_API_VERSION: &str = "2021-05-01-preview";

/// Async glossary API client.
///
/// Every operation of the route registry is reachable through
/// [`Self::invoke`]; the client is cheap to clone and safe to share between
/// tasks since the registry, endpoint, and transport are immutable.
#[derive(Clone)]
pub struct GlossaryClient {
    base_url: Url,
    api_version: Option<String>,
    registry: Arc<RouteRegistry>,
    transport: Arc<dyn Transport>,
}

impl GlossaryClient {
    /// Creates a client for the given catalog endpoint using [`ReqwestTransport`].
    ///
    /// The URL is normalized to include a trailing slash, so route paths
    /// join below any prefix it carries (for example `/catalog/api`).
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Self::with_transport(base_url, ReqwestTransport::new())
    }

    /// Creates a client that dispatches through `transport`.
    ///
    /// Credentials belong to the transport; configure them before handing it
    /// over, e.g. with [`ReqwestTransport::with_authorization_token`].
    pub fn with_transport(
        base_url: impl AsRef<str>,
        transport: impl Transport + 'static,
    ) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url.as_ref())
            .map_err(|_| ClientError::InvalidBaseUrl(base_url.as_ref().to_owned()))?;

        Ok(Self {
            base_url: ensure_trailing_slash(parsed),
            api_version: None,
            registry: Arc::new(RouteRegistry::glossary()),
            transport: Arc::new(transport),
        })
    }

    /// Supplies `api-version` on routes that require it when a call omits it.
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Replaces the route table.
    #[must_use]
    pub fn with_registry(mut self, registry: RouteRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn routes(&self) -> &'static [RouteDescriptor] {
        self.registry.routes()
    }

    /// Resolves `call` against the registry without sending it.
    pub fn prepare(&self, call: OperationCall) -> Result<InvocationRequest, ClientError> {
        prepare(&self.base_url, &self.registry, self.api_version.as_deref(), call)
    }

    /// Invokes an operation and waits for its response.
    ///
    /// Non-success statuses become [`ClientError::HttpStatus`]. Nothing is
    /// retried.
    pub async fn invoke(&self, call: OperationCall) -> Result<InvocationResult, ClientError> {
        let request = self.prepare(call)?;
        let span = tracing::debug_span!(
            "invoke",
            operation = request.operation_id,
            method = %request.method
        );
        dispatch(self.transport.as_ref(), request)
            .instrument(span)
            .await
    }

    /// Starts an invocation on the ambient tokio runtime and returns at once.
    ///
    /// The returned [`Deferred`] resolves exactly once. Outside a runtime it
    /// resolves to a transport fault without sending anything.
    pub fn invoke_deferred(&self, call: OperationCall) -> Deferred {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return Deferred::failed(ClientError::TaskFailed(
                "no tokio runtime available".to_owned(),
            ));
        };
        let client = self.clone();
        Deferred::spawned(handle.spawn(async move { client.invoke(call).await }))
    }

    /// Invokes an operation whose response body is consumed as a stream.
    ///
    /// On a non-success status the body is drained into the returned error.
    pub async fn invoke_streaming(
        &self,
        call: OperationCall,
    ) -> Result<StreamedResult, ClientError> {
        let request = self.prepare(call)?;
        let span = tracing::debug_span!(
            "invoke",
            operation = request.operation_id,
            method = %request.method
        );
        dispatch_streaming(self.transport.as_ref(), request)
            .instrument(span)
            .await
    }
}

impl std::fmt::Debug for GlossaryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlossaryClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &self.api_version)
            .field("routes", &self.registry.routes().len())
            .finish_non_exhaustive()
    }
}

/// Handle to an invocation running on a tokio runtime.
///
/// Resolves exactly once with the invocation's result or fault. Dropping the
/// handle does not cancel the request.
#[derive(Debug)]
pub struct Deferred {
    state: DeferredState,
}

#[derive(Debug)]
enum DeferredState {
    Running(JoinHandle<Result<InvocationResult, ClientError>>),
    Failed(Option<ClientError>),
}

impl Deferred {
    fn spawned(handle: JoinHandle<Result<InvocationResult, ClientError>>) -> Self {
        Self {
            state: DeferredState::Running(handle),
        }
    }

    fn failed(error: ClientError) -> Self {
        Self {
            state: DeferredState::Failed(Some(error)),
        }
    }
}

impl Future for Deferred {
    type Output = Result<InvocationResult, ClientError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            DeferredState::Running(handle) => Pin::new(handle).poll(cx).map(|joined| {
                joined.unwrap_or_else(|error| Err(ClientError::TaskFailed(error.to_string())))
            }),
            DeferredState::Failed(error) => Poll::Ready(Err(error.take().unwrap_or_else(|| {
                ClientError::TaskFailed("deferred result already taken".to_owned())
            }))),
        }
    }
}

fn prepare(
    base_url: &Url,
    registry: &RouteRegistry,
    api_version: Option<&str>,
    mut call: OperationCall,
) -> Result<InvocationRequest, ClientError> {
    let route = registry.find(call.operation_id())?;
    if let Some(version) = api_version {
        if route.required_query.contains(&API_VERSION) && !call.has_query(API_VERSION) {
            call = call.query(API_VERSION, version);
        }
    }
    InvocationRequest::build(base_url, route, call)
}

async fn dispatch(
    transport: &dyn Transport,
    request: InvocationRequest,
) -> Result<InvocationResult, ClientError> {
    debug!(path = %request.path, query = request.query.len(), "sending request");
    let result = transport.send(request).await?;

    if !result.status.is_success() {
        warn!(status = %result.status, "request failed");
        return Err(result.into_status_error());
    }

    debug!(status = %result.status, bytes = result.body.len(), "request completed");
    Ok(result)
}

async fn dispatch_streaming(
    transport: &dyn Transport,
    request: InvocationRequest,
) -> Result<StreamedResult, ClientError> {
    debug!(path = %request.path, "streaming request");
    let streamed = transport.send_streaming(request).await?;

    if !streamed.status.is_success() {
        warn!(status = %streamed.status, "streaming request failed");
        return Err(streamed.collect().await?.into_status_error());
    }

    Ok(streamed)
}

fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_owned();
        path.push('/');
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::{GlossaryClient, ensure_trailing_slash};
    use crate::{OperationCall, ops};

    #[test]
    fn joins_paths_from_base_with_nested_prefix() {
        let client = GlossaryClient::new("https://example.com/catalog/api").expect("valid url");
        let request = client
            .prepare(OperationCall::new(ops::LIST_GLOSSARIES))
            .expect("valid path");
        assert_eq!(
            request.url.as_str(),
            "https://example.com/catalog/api/atlas/v2/glossary"
        );
    }

    #[test]
    fn trailing_slash_is_not_doubled() {
        let url = reqwest::Url::parse("https://example.com/api/").expect("valid url");
        assert_eq!(ensure_trailing_slash(url).path(), "/api/");
    }

    #[test]
    fn rejects_relative_base_url() {
        assert!(GlossaryClient::new("catalog/api").is_err());
    }

    #[test]
    fn configured_api_version_fills_csv_routes_only() {
        let client = GlossaryClient::new("https://example.com/")
            .expect("valid url")
            .with_api_version("2022-03-01-preview");

        let status = client
            .prepare(
                OperationCall::new(ops::GET_IMPORT_CSV_OPERATION_STATUS)
                    .path_param("operationGuid", "op-1"),
            )
            .expect("api version supplied");
        assert_eq!(
            status.query,
            [("api-version".to_owned(), "2022-03-01-preview".to_owned())]
        );

        let explicit = client
            .prepare(
                OperationCall::new(ops::GET_IMPORT_CSV_OPERATION_STATUS)
                    .path_param("operationGuid", "op-1")
                    .query("api-version", "2021-05-01-preview"),
            )
            .expect("explicit version kept");
        assert_eq!(explicit.query.len(), 1);
        assert_eq!(explicit.query[0].1, "2021-05-01-preview");

        let atlas = client
            .prepare(OperationCall::new(ops::GET_GLOSSARY).path_param("glossaryGuid", "g1"))
            .expect("atlas route");
        assert!(atlas.query.is_empty());
    }
}
