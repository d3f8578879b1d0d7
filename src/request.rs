use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use url::Url;
use url::form_urlencoded::byte_serialize;

use crate::ClientError;
use crate::route::{BodyKind, RouteDescriptor};

/// Opaque request payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestBody {
    /// Pre-serialized `application/json` bytes.
    Json(Vec<u8>),
    /// CSV upload sent as the `file` part of a `multipart/form-data` form.
    Multipart { file_name: String, content: Vec<u8> },
}

impl RequestBody {
    /// Serializes `value` into a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ClientError> {
        Ok(Self::Json(serde_json::to_vec(value)?))
    }

    /// Wraps CSV file contents for upload.
    pub fn csv_file(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self::Multipart {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    fn kind(&self) -> BodyKind {
        match self {
            Self::Json(_) => BodyKind::Json,
            Self::Multipart { .. } => BodyKind::Multipart,
        }
    }
}

/// Caller-side parameters for one invocation of a named operation.
///
/// ```
/// use glossary_client::{OperationCall, ops};
///
/// let call = OperationCall::new(ops::LIST_GLOSSARY_TERMS)
///     .path_param("glossaryGuid", "abc-123")
///     .query("limit", "10");
/// assert_eq!(call.operation_id(), "listGlossaryTerms");
/// ```
#[derive(Clone, Debug, Default)]
pub struct OperationCall {
    operation_id: String,
    path_params: Vec<(String, String)>,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<RequestBody>,
}

impl OperationCall {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push((name.into(), value.into()));
        self
    }

    /// Adds a query parameter. Repeated keys are all sent.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Adds a header sent in addition to the route's `Accept`.
    ///
    /// A later value for the same name replaces an earlier one, including
    /// the route's `Accept`.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes `value` as the JSON body.
    pub fn json_body<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, ClientError> {
        Ok(self.body(RequestBody::json(value)?))
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub(crate) fn has_query(&self, key: &str) -> bool {
        self.query.iter().any(|(name, _)| name == key)
    }
}

/// A fully resolved request, ready for a [`crate::Transport`].
#[derive(Clone, Debug)]
pub struct InvocationRequest {
    pub operation_id: &'static str,
    pub method: Method,
    /// Rendered path, e.g. `/atlas/v2/glossary/abc-123`.
    pub path: String,
    /// Absolute URL without query string.
    pub url: Url,
    /// Query pairs in emission order. Duplicates are preserved.
    pub query: Vec<(String, String)>,
    /// One value per name; caller headers override the route's `Accept`.
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    pub streamed_response: bool,
}

impl InvocationRequest {
    /// Builds the request for `route` against `base_url`.
    ///
    /// Fails with a malformed-request error before anything is sent when a
    /// path placeholder or required query key is missing, or when the body
    /// does not match what the route declares.
    pub fn build(
        base_url: &Url,
        route: &'static RouteDescriptor,
        call: OperationCall,
    ) -> Result<Self, ClientError> {
        let method = route.http_method()?;
        let path = render_path(route, &call.path_params)?;
        let query = order_query(route, call.query)?;
        check_body(route, call.body.as_ref())?;

        let mut headers = HeaderMap::with_capacity(call.headers.len() + 1);
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static(route.accept),
        );
        for (name, value) in &call.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ClientError::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ClientError::InvalidHeader(name.as_str().to_owned()))?;
            headers.insert(name, value);
        }

        let relative = path.trim_start_matches('/');
        let url = base_url
            .join(relative)
            .map_err(|_| ClientError::InvalidPath(path.clone()))?;
        if !url.path().ends_with(&path) {
            return Err(ClientError::InvalidPath(path));
        }

        Ok(Self {
            operation_id: route.operation_id,
            method,
            path,
            url,
            query,
            headers,
            body: call.body,
            streamed_response: route.streamed_response,
        })
    }

    /// Value of the header named `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name.to_ascii_lowercase().as_str())
            .and_then(|value| value.to_str().ok())
    }
}

fn render_path(
    route: &RouteDescriptor,
    path_params: &[(String, String)],
) -> Result<String, ClientError> {
    let mut rendered = route.path_template.to_owned();

    for required_param in route.path_params {
        let value = path_params
            .iter()
            .find(|(name, _)| name == required_param)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ClientError::MissingPathParameter {
                operation_id: route.operation_id.to_owned(),
                parameter: (*required_param).to_owned(),
            })?;

        // Dot segments would be collapsed by URL resolution.
        if value == "." || value == ".." {
            return Err(ClientError::InvalidPathParameter {
                operation_id: route.operation_id.to_owned(),
                parameter: (*required_param).to_owned(),
                value: value.to_owned(),
            });
        }

        let placeholder = format!("{{{required_param}}}");
        rendered = rendered.replace(&placeholder, &encode_path_segment(value));
    }

    if rendered.contains('{') || rendered.contains('}') {
        return Err(ClientError::UnresolvedPath {
            operation_id: route.operation_id.to_owned(),
            path: rendered,
        });
    }

    Ok(rendered)
}

/// Orders query pairs by the route's declared keys, then passes unknown keys
/// through in caller order.
fn order_query(
    route: &RouteDescriptor,
    mut supplied: Vec<(String, String)>,
) -> Result<Vec<(String, String)>, ClientError> {
    for required in route.required_query {
        if !supplied.iter().any(|(key, _)| key == required) {
            return Err(ClientError::MissingQueryParameter {
                operation_id: route.operation_id.to_owned(),
                parameter: (*required).to_owned(),
            });
        }
    }

    let mut ordered = Vec::with_capacity(supplied.len());
    for declared in route.declared_query() {
        let (matching, rest): (Vec<_>, Vec<_>) =
            supplied.into_iter().partition(|(key, _)| key == declared);
        ordered.extend(matching);
        supplied = rest;
    }
    ordered.extend(supplied);
    Ok(ordered)
}

fn check_body(route: &RouteDescriptor, body: Option<&RequestBody>) -> Result<(), ClientError> {
    let found = body.map_or(BodyKind::None, RequestBody::kind);
    if found == route.body {
        Ok(())
    } else {
        Err(ClientError::BodyMismatch {
            operation_id: route.operation_id.to_owned(),
            expected: route.body.content_type(),
            found: found.content_type(),
        })
    }
}

// `byte_serialize` is form encoding; paths need `%20` rather than `+`.
fn encode_path_segment(value: &str) -> String {
    byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::{InvocationRequest, OperationCall, RequestBody, render_path};
    use crate::ClientError;
    use crate::route::{GLOSSARY_ROUTES, RouteRegistry, ops};

    fn base() -> Url {
        Url::parse("https://catalog.example.com/api/").expect("valid url")
    }

    fn build(call: OperationCall) -> Result<InvocationRequest, ClientError> {
        let route = RouteRegistry::glossary()
            .find(call.operation_id())
            .expect("known route");
        InvocationRequest::build(&base(), route, call)
    }

    #[test]
    fn render_path_replaces_required_path_params() {
        let request = build(
            OperationCall::new(ops::GET_GLOSSARY).path_param("glossaryGuid", "abc-123"),
        )
        .expect("request builds");
        assert_eq!(request.path, "/atlas/v2/glossary/abc-123");
        assert_eq!(
            request.url.as_str(),
            "https://catalog.example.com/api/atlas/v2/glossary/abc-123"
        );
        assert_eq!(request.header("accept"), Some("application/json"));
    }

    #[test]
    fn every_route_renders_without_markers() {
        for route in GLOSSARY_ROUTES {
            let params: Vec<_> = route
                .path_params
                .iter()
                .map(|name| ((*name).to_owned(), format!("{name} value")))
                .collect();
            let path = render_path(route, &params).expect("renders");
            assert!(!path.contains('{') && !path.contains('}'), "{path}");
            base()
                .join(path.trim_start_matches('/'))
                .expect("joins into a valid url");
        }
    }

    #[test]
    fn glossary_names_are_percent_encoded() {
        let request = build(
            OperationCall::new(ops::LIST_TERMS_BY_GLOSSARY_NAME)
                .path_param("glossaryName", "Sales & Marketing")
                .query("api-version", "2022-03-01-preview"),
        )
        .expect("request builds");
        assert_eq!(request.path, "/glossary/name/Sales%20%26%20Marketing/terms");
    }

    #[test]
    fn missing_path_parameter_is_malformed() {
        let error = build(OperationCall::new(ops::GET_GLOSSARY)).expect_err("missing param");
        match error {
            ClientError::MissingPathParameter {
                operation_id,
                parameter,
            } => {
                assert_eq!(operation_id, "getGlossary");
                assert_eq!(parameter, "glossaryGuid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_path_parameter_is_treated_as_missing() {
        let error = build(OperationCall::new(ops::GET_GLOSSARY_TERM).path_param("termGuid", ""))
            .expect_err("empty param");
        assert!(matches!(error, ClientError::MissingPathParameter { .. }));
    }

    #[test]
    fn dot_segment_path_parameters_are_rejected() {
        for value in [".", ".."] {
            let error = build(
                OperationCall::new(ops::DELETE_GLOSSARY_TERM).path_param("termGuid", value),
            )
            .expect_err("dot segment");
            match error {
                ClientError::InvalidPathParameter {
                    operation_id,
                    parameter,
                    value: rejected,
                } => {
                    assert_eq!(operation_id, "deleteGlossaryTerm");
                    assert_eq!(parameter, "termGuid");
                    assert_eq!(rejected, value);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn dispatched_url_ends_with_rendered_path() {
        let request = build(
            OperationCall::new(ops::DELETE_GLOSSARY_TERM).path_param("termGuid", "..%2F.x"),
        )
        .expect("request builds");
        assert_eq!(request.path, "/atlas/v2/glossary/term/..%252F.x");
        assert!(request.url.path().ends_with(&request.path));
    }

    #[test]
    fn caller_headers_replace_instead_of_duplicating() {
        let request = build(
            OperationCall::new(ops::CREATE_GLOSSARY)
                .header("Content-Type", "application/json")
                .header("content-type", "application/json; charset=utf-8")
                .json_body(&serde_json::json!({"name": "Finance"}))
                .expect("serializes"),
        )
        .expect("request builds");
        assert_eq!(request.headers.get_all("content-type").iter().count(), 1);
        assert_eq!(
            request.header("Content-Type"),
            Some("application/json; charset=utf-8")
        );
        assert_eq!(request.header("accept"), Some("application/json"));
    }

    #[test]
    fn query_follows_declaration_order_and_keeps_duplicates() {
        let request = build(
            OperationCall::new(ops::LIST_GLOSSARY_TERMS)
                .path_param("glossaryGuid", "g1")
                .query("custom", "x")
                .query("offset", "0")
                .query("limit", "10")
                .query("includeTermHierarchy", "true")
                .query("limit", "20"),
        )
        .expect("request builds");
        let keys: Vec<_> = request
            .query
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        assert_eq!(
            keys,
            [
                "includeTermHierarchy=true",
                "limit=10",
                "limit=20",
                "offset=0",
                "custom=x"
            ]
        );
    }

    #[test]
    fn body_on_bodiless_route_is_rejected() {
        let call = OperationCall::new(ops::GET_GLOSSARY)
            .path_param("glossaryGuid", "g1")
            .json_body(&serde_json::json!({"name": "x"}))
            .expect("serializes");
        let error = build(call).expect_err("body rejected");
        assert!(matches!(
            error,
            ClientError::BodyMismatch { expected: "none", found: "application/json", .. }
        ));
    }

    #[test]
    fn missing_body_on_json_route_is_rejected() {
        let error = build(OperationCall::new(ops::CREATE_GLOSSARY)).expect_err("body required");
        assert!(matches!(
            error,
            ClientError::BodyMismatch { expected: "application/json", found: "none", .. }
        ));
    }

    #[test]
    fn import_requires_multipart_body() {
        let call = OperationCall::new(ops::IMPORT_GLOSSARY_TERMS_VIA_CSV)
            .path_param("glossaryGuid", "g1")
            .query("api-version", "2022-03-01-preview");
        let json = call.clone().json_body(&["a"]).expect("serializes");
        assert!(build(json).is_err());

        let upload = call.body(RequestBody::csv_file("terms.csv", "Name\nterm".as_bytes()));
        let request = build(upload).expect("multipart accepted");
        assert!(matches!(request.body, Some(RequestBody::Multipart { .. })));
    }

    #[test]
    fn invalid_caller_header_is_malformed() {
        let error = build(
            OperationCall::new(ops::GET_GLOSSARY)
                .path_param("glossaryGuid", "g1")
                .header("bad header", "x"),
        )
        .expect_err("invalid header");
        assert!(matches!(error, ClientError::InvalidHeader(_)));
    }
}
