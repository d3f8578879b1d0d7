use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use reqwest::multipart::{Form, Part};

use crate::request::{InvocationRequest, RequestBody};
use crate::response::{InvocationResult, StreamedResult};
use crate::{ClientError, route};

/// The I/O seam every invocation goes through.
///
/// Implementations perform exactly one exchange per call and return the
/// response whatever its status; mapping non-success statuses to errors is
/// done by the caller. Retries, TLS, timeouts, and connection reuse belong
/// to the implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: InvocationRequest) -> Result<InvocationResult, ClientError>;

    /// Sends a request whose response body is consumed as a stream.
    ///
    /// The default buffers the whole response and yields it as one chunk.
    async fn send_streaming(
        &self,
        request: InvocationRequest,
    ) -> Result<StreamedResult, ClientError> {
        let result = self.send(request).await?;
        Ok(StreamedResult {
            status: result.status,
            headers: result.headers,
            body: stream::once(async move { Ok(result.body) }).boxed(),
        })
    }
}

/// [`Transport`] backed by a shared [`reqwest::Client`].
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    authorization_token: Option<String>,
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client (proxies, timeouts, custom TLS roots).
    pub fn with_client(http: reqwest::Client) -> Self {
        Self {
            authorization_token: None,
            http,
        }
    }

    /// Returns a transport that attaches `Authorization: Bearer <token>` to
    /// every request.
    #[must_use]
    pub fn with_authorization_token(mut self, token: impl Into<String>) -> Self {
        self.authorization_token = Some(token.into());
        self
    }

    async fn execute(&self, request: InvocationRequest) -> Result<reqwest::Response, ClientError> {
        let mut builder = self.http.request(request.method, request.url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        // One value per header on the wire; the body framing owns the length.
        let mut headers = request.headers;
        headers.remove(CONTENT_LENGTH);

        if let Some(token) = &self.authorization_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ClientError::InvalidHeader(AUTHORIZATION.as_str().to_owned()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        match &request.body {
            Some(RequestBody::Json(_)) => {
                headers
                    .entry(CONTENT_TYPE)
                    .or_insert(HeaderValue::from_static(route::JSON));
            }
            // The multipart boundary is chosen by the form.
            Some(RequestBody::Multipart { .. }) => {
                headers.remove(CONTENT_TYPE);
            }
            None => {}
        }
        builder = builder.headers(headers);

        builder = match request.body {
            Some(RequestBody::Json(bytes)) => builder.body(bytes),
            Some(RequestBody::Multipart { file_name, content }) => {
                let part = Part::bytes(content)
                    .file_name(file_name)
                    .mime_str(route::CSV)?;
                builder.multipart(Form::new().part("file", part))
            }
            None => builder,
        };

        Ok(builder.send().await?)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: InvocationRequest) -> Result<InvocationResult, ClientError> {
        let response = self.execute(request).await?;
        let status = response.status();
        let headers = collect_headers(&response);
        let body = response.bytes().await?.to_vec();
        Ok(InvocationResult::new(status, headers, body))
    }

    async fn send_streaming(
        &self,
        request: InvocationRequest,
    ) -> Result<StreamedResult, ClientError> {
        let response = self.execute(request).await?;
        Ok(StreamedResult {
            status: response.status(),
            headers: collect_headers(&response),
            body: response
                .bytes_stream()
                .map_ok(|chunk| chunk.to_vec())
                .map_err(ClientError::from)
                .boxed(),
        })
    }
}

fn collect_headers(response: &reqwest::Response) -> Vec<(String, String)> {
    response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}
