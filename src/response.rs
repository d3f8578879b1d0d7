use std::fmt;

use futures::stream::{BoxStream, TryStreamExt};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::ClientError;

/// Chunks of a streamed response body.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ClientError>>;

/// Completed response of one invocation.
///
/// No-content operations produce the same value with an empty body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationResult {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl InvocationResult {
    pub fn new(status: StatusCode, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Value of the first header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn into_status_error(self) -> ClientError {
        ClientError::HttpStatus {
            status: self.status,
            body: self.body,
        }
    }
}

/// Response whose body is delivered as a stream of chunks.
pub struct StreamedResult {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: ByteStream,
}

impl StreamedResult {
    /// Drains the stream into a single [`InvocationResult`].
    pub async fn collect(self) -> Result<InvocationResult, ClientError> {
        let body = self
            .body
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok::<_, ClientError>(acc)
            })
            .await?;
        Ok(InvocationResult::new(self.status, self.headers, body))
    }
}

impl fmt::Debug for StreamedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamedResult")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Extracts the body of a completed invocation.
///
/// Returns `Ok(None)` when the call succeeded without data, so "no data"
/// stays distinguishable from a fault.
pub fn unwrap_body(
    result: Result<InvocationResult, ClientError>,
) -> Result<Option<Vec<u8>>, ClientError> {
    let result = result?;
    if result.body.is_empty() {
        Ok(None)
    } else {
        Ok(Some(result.body))
    }
}

/// Discards the body of a completed invocation and keeps only success.
pub fn unwrap_void(result: Result<InvocationResult, ClientError>) -> Result<(), ClientError> {
    result.map(|_| ())
}

/// Parses the body of a completed invocation as JSON.
///
/// Whitespace-only bodies count as absent.
pub fn unwrap_json<T: DeserializeOwned>(
    result: Result<InvocationResult, ClientError>,
) -> Result<Option<T>, ClientError> {
    match unwrap_body(result)? {
        Some(bytes) if !bytes.trim_ascii().is_empty() => Ok(Some(serde_json::from_slice(&bytes)?)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use reqwest::StatusCode;
    use serde_json::Value;

    use super::{InvocationResult, StreamedResult, unwrap_body, unwrap_json, unwrap_void};
    use crate::{ClientError, ErrorKind};

    fn ok(status: StatusCode, body: &str) -> Result<InvocationResult, ClientError> {
        Ok(InvocationResult::new(
            status,
            vec![("Content-Type".to_owned(), "application/json".to_owned())],
            body.as_bytes().to_vec(),
        ))
    }

    fn fault() -> Result<InvocationResult, ClientError> {
        Err(ClientError::HttpStatus {
            status: StatusCode::NOT_FOUND,
            body: Vec::new(),
        })
    }

    #[test]
    fn empty_body_is_absent_not_fault() {
        assert_eq!(unwrap_body(ok(StatusCode::NO_CONTENT, "")).expect("success"), None);
        let error = unwrap_body(fault()).expect_err("fault");
        assert_eq!(error.kind(), ErrorKind::HttpStatus);
    }

    #[test]
    fn body_bytes_pass_through_unexamined() {
        let body = unwrap_body(ok(StatusCode::OK, "not json at all")).expect("success");
        assert_eq!(body.as_deref(), Some("not json at all".as_bytes()));
    }

    #[test]
    fn unwrap_void_only_reports_status() {
        unwrap_void(ok(StatusCode::OK, "{\"ignored\":true}")).expect("success");
        assert!(unwrap_void(fault()).is_err());
    }

    #[test]
    fn unwrap_json_parses_or_reports_serialization() {
        let value: Option<Value> = unwrap_json(ok(StatusCode::OK, "{\"guid\":\"g1\"}")).expect("parses");
        assert_eq!(value.expect("present")["guid"], "g1");

        let blank: Option<Value> = unwrap_json(ok(StatusCode::OK, "  \n")).expect("blank");
        assert!(blank.is_none());

        let error = unwrap_json::<Value>(ok(StatusCode::OK, "{")).expect_err("invalid json");
        assert_eq!(error.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let result = ok(StatusCode::OK, "").expect("ok");
        assert_eq!(result.header("content-type"), Some("application/json"));
        assert_eq!(result.header("etag"), None);
    }

    #[test]
    fn status_error_keeps_body_bytes_verbatim() {
        let result = InvocationResult::new(StatusCode::BAD_REQUEST, Vec::new(), vec![0xfe, b'x']);
        let error = result.into_status_error();
        assert_eq!(error.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(error.body(), Some(&[0xfe, b'x'][..]));
    }

    #[tokio::test]
    async fn streamed_result_collects_chunks_in_order() {
        let chunks = vec![Ok(b"Name,".to_vec()), Ok(b"Status\n".to_vec())];
        let streamed = StreamedResult {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: Box::pin(stream::iter(chunks)),
        };
        let collected = streamed.collect().await.expect("collects");
        assert_eq!(collected.body, b"Name,Status\n");
    }
}
