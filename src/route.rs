use std::collections::HashMap;

use reqwest::Method;

use crate::ClientError;

/// `Accept` value for structured payloads.
pub const JSON: &str = "application/json";
/// `Accept` value for CSV exports.
pub const CSV: &str = "text/csv";

/// Body a route accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    /// The route never carries a request body.
    None,
    /// `application/json` payload.
    Json,
    /// `multipart/form-data` upload with a single `file` part.
    Multipart,
}

impl BodyKind {
    /// Content type announced for this body kind, `"none"` when bodiless.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Json => "application/json",
            Self::Multipart => "multipart/form-data",
        }
    }
}

/// Static description of one glossary operation.
#[derive(Clone, Copy, Debug)]
pub struct RouteDescriptor {
    /// Stable operation identifier, e.g. `getGlossary`.
    pub operation_id: &'static str,
    /// Uppercase HTTP method.
    pub method: &'static str,
    /// Path template relative to the endpoint, with `{param}` placeholders.
    pub path_template: &'static str,
    /// Placeholder names of `path_template`, in order of appearance.
    pub path_params: &'static [&'static str],
    /// Query keys the caller must supply.
    pub required_query: &'static [&'static str],
    /// Query keys the server understands. Emitted after the required ones.
    pub optional_query: &'static [&'static str],
    /// `Accept` header sent with the request.
    pub accept: &'static str,
    /// Request body the route declares.
    pub body: BodyKind,
    /// Whether the response may be large enough to warrant streaming.
    pub streamed_response: bool,
}

impl RouteDescriptor {
    /// Parses [`Self::method`].
    pub fn http_method(&self) -> Result<Method, ClientError> {
        Method::from_bytes(self.method.as_bytes())
            .map_err(|_| ClientError::UnknownOperation(self.operation_id.to_owned()))
    }

    /// Every query key this route declares, required ones first.
    pub fn declared_query(&self) -> impl Iterator<Item = &'static str> {
        self.required_query
            .iter()
            .chain(self.optional_query)
            .copied()
    }
}

/// Operation ids of [`GLOSSARY_ROUTES`].
pub mod ops {
    pub const LIST_GLOSSARIES: &str = "listGlossaries";
    pub const CREATE_GLOSSARY: &str = "createGlossary";
    pub const CREATE_GLOSSARY_CATEGORIES: &str = "createGlossaryCategories";
    pub const CREATE_GLOSSARY_CATEGORY: &str = "createGlossaryCategory";
    pub const GET_GLOSSARY_CATEGORY: &str = "getGlossaryCategory";
    pub const UPDATE_GLOSSARY_CATEGORY: &str = "updateGlossaryCategory";
    pub const DELETE_GLOSSARY_CATEGORY: &str = "deleteGlossaryCategory";
    pub const PARTIAL_UPDATE_GLOSSARY_CATEGORY: &str = "partialUpdateGlossaryCategory";
    pub const LIST_RELATED_CATEGORIES: &str = "listRelatedCategories";
    pub const LIST_CATEGORY_TERMS: &str = "listCategoryTerms";
    pub const CREATE_GLOSSARY_TERM: &str = "createGlossaryTerm";
    pub const GET_GLOSSARY_TERM: &str = "getGlossaryTerm";
    pub const UPDATE_GLOSSARY_TERM: &str = "updateGlossaryTerm";
    pub const DELETE_GLOSSARY_TERM: &str = "deleteGlossaryTerm";
    pub const PARTIAL_UPDATE_GLOSSARY_TERM: &str = "partialUpdateGlossaryTerm";
    pub const CREATE_GLOSSARY_TERMS: &str = "createGlossaryTerms";
    pub const GET_ENTITIES_ASSIGNED_WITH_TERM: &str = "getEntitiesAssignedWithTerm";
    pub const ASSIGN_TERM_TO_ENTITIES: &str = "assignTermToEntities";
    pub const REMOVE_TERM_ASSIGNMENT_FROM_ENTITIES: &str = "removeTermAssignmentFromEntities";
    pub const DELETE_TERM_ASSIGNMENT_FROM_ENTITIES: &str = "deleteTermAssignmentFromEntities";
    pub const LIST_RELATED_TERMS: &str = "listRelatedTerms";
    pub const GET_GLOSSARY: &str = "getGlossary";
    pub const UPDATE_GLOSSARY: &str = "updateGlossary";
    pub const DELETE_GLOSSARY: &str = "deleteGlossary";
    pub const LIST_GLOSSARY_CATEGORIES: &str = "listGlossaryCategories";
    pub const LIST_GLOSSARY_CATEGORIES_HEADERS: &str = "listGlossaryCategoriesHeaders";
    pub const GET_DETAILED_GLOSSARY: &str = "getDetailedGlossary";
    pub const PARTIAL_UPDATE_GLOSSARY: &str = "partialUpdateGlossary";
    pub const LIST_GLOSSARY_TERMS: &str = "listGlossaryTerms";
    pub const LIST_GLOSSARY_TERM_HEADERS: &str = "listGlossaryTermHeaders";
    pub const IMPORT_GLOSSARY_TERMS_VIA_CSV: &str = "importGlossaryTermsViaCsv";
    pub const IMPORT_GLOSSARY_TERMS_VIA_CSV_BY_GLOSSARY_NAME: &str =
        "importGlossaryTermsViaCsvByGlossaryName";
    pub const GET_IMPORT_CSV_OPERATION_STATUS: &str = "getImportCsvOperationStatus";
    pub const EXPORT_GLOSSARY_TERMS_AS_CSV: &str = "exportGlossaryTermsAsCsv";
    pub const LIST_TERMS_BY_GLOSSARY_NAME: &str = "listTermsByGlossaryName";
}

/// Query key carrying the service API version.
pub const API_VERSION: &str = "api-version";

const PAGING: &[&str] = &["limit", "offset", "sort"];
const HIERARCHY: &[&str] = &["includeTermHierarchy"];
const HIERARCHY_PAGING: &[&str] = &["includeTermHierarchy", "limit", "offset", "sort"];
const CSV_REQUIRED: &[&str] = &[API_VERSION];

const fn route(
    operation_id: &'static str,
    method: &'static str,
    path_template: &'static str,
    path_params: &'static [&'static str],
) -> RouteDescriptor {
    RouteDescriptor {
        operation_id,
        method,
        path_template,
        path_params,
        required_query: &[],
        optional_query: &[],
        accept: JSON,
        body: BodyKind::None,
        streamed_response: false,
    }
}

const fn with_query(
    mut route: RouteDescriptor,
    required: &'static [&'static str],
    optional: &'static [&'static str],
) -> RouteDescriptor {
    route.required_query = required;
    route.optional_query = optional;
    route
}

const fn with_body(mut route: RouteDescriptor, body: BodyKind) -> RouteDescriptor {
    route.body = body;
    route
}

/// Every glossary operation exposed by the catalog service.
///
/// `limit`/`offset`/`sort` are declared on the related-categories and
/// related-terms routes even though the server currently ignores them there.
pub static GLOSSARY_ROUTES: &[RouteDescriptor] = &[
    with_query(
        route(ops::LIST_GLOSSARIES, "GET", "/atlas/v2/glossary", &[]),
        &[],
        &["limit", "offset", "sort", "ignoreTermsAndCategories"],
    ),
    with_body(
        route(ops::CREATE_GLOSSARY, "POST", "/atlas/v2/glossary", &[]),
        BodyKind::Json,
    ),
    with_body(
        route(
            ops::CREATE_GLOSSARY_CATEGORIES,
            "POST",
            "/atlas/v2/glossary/categories",
            &[],
        ),
        BodyKind::Json,
    ),
    with_body(
        route(
            ops::CREATE_GLOSSARY_CATEGORY,
            "POST",
            "/atlas/v2/glossary/category",
            &[],
        ),
        BodyKind::Json,
    ),
    route(
        ops::GET_GLOSSARY_CATEGORY,
        "GET",
        "/atlas/v2/glossary/category/{categoryGuid}",
        &["categoryGuid"],
    ),
    with_body(
        route(
            ops::UPDATE_GLOSSARY_CATEGORY,
            "PUT",
            "/atlas/v2/glossary/category/{categoryGuid}",
            &["categoryGuid"],
        ),
        BodyKind::Json,
    ),
    route(
        ops::DELETE_GLOSSARY_CATEGORY,
        "DELETE",
        "/atlas/v2/glossary/category/{categoryGuid}",
        &["categoryGuid"],
    ),
    with_body(
        route(
            ops::PARTIAL_UPDATE_GLOSSARY_CATEGORY,
            "PUT",
            "/atlas/v2/glossary/category/{categoryGuid}/partial",
            &["categoryGuid"],
        ),
        BodyKind::Json,
    ),
    with_query(
        route(
            ops::LIST_RELATED_CATEGORIES,
            "GET",
            "/atlas/v2/glossary/category/{categoryGuid}/related",
            &["categoryGuid"],
        ),
        &[],
        PAGING,
    ),
    with_query(
        route(
            ops::LIST_CATEGORY_TERMS,
            "GET",
            "/atlas/v2/glossary/category/{categoryGuid}/terms",
            &["categoryGuid"],
        ),
        &[],
        PAGING,
    ),
    with_query(
        with_body(
            route(
                ops::CREATE_GLOSSARY_TERM,
                "POST",
                "/atlas/v2/glossary/term",
                &[],
            ),
            BodyKind::Json,
        ),
        &[],
        HIERARCHY,
    ),
    with_query(
        route(
            ops::GET_GLOSSARY_TERM,
            "GET",
            "/atlas/v2/glossary/term/{termGuid}",
            &["termGuid"],
        ),
        &[],
        HIERARCHY,
    ),
    with_query(
        with_body(
            route(
                ops::UPDATE_GLOSSARY_TERM,
                "PUT",
                "/atlas/v2/glossary/term/{termGuid}",
                &["termGuid"],
            ),
            BodyKind::Json,
        ),
        &[],
        HIERARCHY,
    ),
    route(
        ops::DELETE_GLOSSARY_TERM,
        "DELETE",
        "/atlas/v2/glossary/term/{termGuid}",
        &["termGuid"],
    ),
    with_query(
        with_body(
            route(
                ops::PARTIAL_UPDATE_GLOSSARY_TERM,
                "PUT",
                "/atlas/v2/glossary/term/{termGuid}/partial",
                &["termGuid"],
            ),
            BodyKind::Json,
        ),
        &[],
        HIERARCHY,
    ),
    with_query(
        with_body(
            route(
                ops::CREATE_GLOSSARY_TERMS,
                "POST",
                "/atlas/v2/glossary/terms",
                &[],
            ),
            BodyKind::Json,
        ),
        &[],
        HIERARCHY,
    ),
    with_query(
        route(
            ops::GET_ENTITIES_ASSIGNED_WITH_TERM,
            "GET",
            "/atlas/v2/glossary/term/{termGuid}/assignedEntities",
            &["termGuid"],
        ),
        &[],
        PAGING,
    ),
    with_body(
        route(
            ops::ASSIGN_TERM_TO_ENTITIES,
            "POST",
            "/atlas/v2/glossary/term/{termGuid}/assignedEntities",
            &["termGuid"],
        ),
        BodyKind::Json,
    ),
    with_body(
        route(
            ops::REMOVE_TERM_ASSIGNMENT_FROM_ENTITIES,
            "PUT",
            "/atlas/v2/glossary/term/{termGuid}/assignedEntities",
            &["termGuid"],
        ),
        BodyKind::Json,
    ),
    with_body(
        route(
            ops::DELETE_TERM_ASSIGNMENT_FROM_ENTITIES,
            "DELETE",
            "/atlas/v2/glossary/term/{termGuid}/assignedEntities",
            &["termGuid"],
        ),
        BodyKind::Json,
    ),
    with_query(
        route(
            ops::LIST_RELATED_TERMS,
            "GET",
            "/atlas/v2/glossary/term/{termGuid}/related",
            &["termGuid"],
        ),
        &[],
        PAGING,
    ),
    route(
        ops::GET_GLOSSARY,
        "GET",
        "/atlas/v2/glossary/{glossaryGuid}",
        &["glossaryGuid"],
    ),
    with_body(
        route(
            ops::UPDATE_GLOSSARY,
            "PUT",
            "/atlas/v2/glossary/{glossaryGuid}",
            &["glossaryGuid"],
        ),
        BodyKind::Json,
    ),
    route(
        ops::DELETE_GLOSSARY,
        "DELETE",
        "/atlas/v2/glossary/{glossaryGuid}",
        &["glossaryGuid"],
    ),
    with_query(
        route(
            ops::LIST_GLOSSARY_CATEGORIES,
            "GET",
            "/atlas/v2/glossary/{glossaryGuid}/categories",
            &["glossaryGuid"],
        ),
        &[],
        PAGING,
    ),
    with_query(
        route(
            ops::LIST_GLOSSARY_CATEGORIES_HEADERS,
            "GET",
            "/atlas/v2/glossary/{glossaryGuid}/categories/headers",
            &["glossaryGuid"],
        ),
        &[],
        PAGING,
    ),
    with_query(
        route(
            ops::GET_DETAILED_GLOSSARY,
            "GET",
            "/atlas/v2/glossary/{glossaryGuid}/detailed",
            &["glossaryGuid"],
        ),
        &[],
        HIERARCHY,
    ),
    with_query(
        with_body(
            route(
                ops::PARTIAL_UPDATE_GLOSSARY,
                "PUT",
                "/atlas/v2/glossary/{glossaryGuid}/partial",
                &["glossaryGuid"],
            ),
            BodyKind::Json,
        ),
        &[],
        HIERARCHY,
    ),
    with_query(
        route(
            ops::LIST_GLOSSARY_TERMS,
            "GET",
            "/atlas/v2/glossary/{glossaryGuid}/terms",
            &["glossaryGuid"],
        ),
        &[],
        HIERARCHY_PAGING,
    ),
    with_query(
        route(
            ops::LIST_GLOSSARY_TERM_HEADERS,
            "GET",
            "/atlas/v2/glossary/{glossaryGuid}/terms/headers",
            &["glossaryGuid"],
        ),
        &[],
        PAGING,
    ),
    with_query(
        with_body(
            route(
                ops::IMPORT_GLOSSARY_TERMS_VIA_CSV,
                "POST",
                "/glossary/{glossaryGuid}/terms/import",
                &["glossaryGuid"],
            ),
            BodyKind::Multipart,
        ),
        CSV_REQUIRED,
        HIERARCHY,
    ),
    with_query(
        with_body(
            route(
                ops::IMPORT_GLOSSARY_TERMS_VIA_CSV_BY_GLOSSARY_NAME,
                "POST",
                "/glossary/name/{glossaryName}/terms/import",
                &["glossaryName"],
            ),
            BodyKind::Multipart,
        ),
        CSV_REQUIRED,
        HIERARCHY,
    ),
    with_query(
        route(
            ops::GET_IMPORT_CSV_OPERATION_STATUS,
            "GET",
            "/glossary/terms/import/{operationGuid}",
            &["operationGuid"],
        ),
        CSV_REQUIRED,
        &[],
    ),
    RouteDescriptor {
        accept: CSV,
        streamed_response: true,
        ..with_query(
            with_body(
                route(
                    ops::EXPORT_GLOSSARY_TERMS_AS_CSV,
                    "POST",
                    "/glossary/{glossaryGuid}/terms/export",
                    &["glossaryGuid"],
                ),
                BodyKind::Json,
            ),
            CSV_REQUIRED,
            HIERARCHY,
        )
    },
    with_query(
        route(
            ops::LIST_TERMS_BY_GLOSSARY_NAME,
            "GET",
            "/glossary/name/{glossaryName}/terms",
            &["glossaryName"],
        ),
        CSV_REQUIRED,
        &["limit", "offset", "includeTermHierarchy"],
    ),
];

/// Immutable lookup table of route descriptors.
///
/// Built once when a client is constructed and shared by reference between
/// all of its invocations.
#[derive(Clone, Debug)]
pub struct RouteRegistry {
    routes: &'static [RouteDescriptor],
    by_id: HashMap<&'static str, usize>,
}

impl RouteRegistry {
    /// Indexes an arbitrary route table. Later duplicates of an id are ignored.
    pub fn new(routes: &'static [RouteDescriptor]) -> Self {
        let mut by_id = HashMap::with_capacity(routes.len());
        for (index, route) in routes.iter().enumerate() {
            by_id.entry(route.operation_id).or_insert(index);
        }
        Self { routes, by_id }
    }

    /// Registry over [`GLOSSARY_ROUTES`].
    pub fn glossary() -> Self {
        Self::new(GLOSSARY_ROUTES)
    }

    /// Looks up a route by operation id.
    pub fn find(&self, operation_id: &str) -> Result<&'static RouteDescriptor, ClientError> {
        let routes = self.routes;
        self.by_id
            .get(operation_id)
            .map(|index| &routes[*index])
            .ok_or_else(|| ClientError::UnknownOperation(operation_id.to_owned()))
    }

    /// All routes in declaration order.
    pub fn routes(&self) -> &'static [RouteDescriptor] {
        self.routes
    }
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::glossary()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{BodyKind, GLOSSARY_ROUTES, RouteRegistry, ops};
    use crate::ClientError;

    fn placeholders(template: &str) -> Vec<&str> {
        template
            .split('{')
            .skip(1)
            .filter_map(|rest| rest.split_once('}').map(|(name, _)| name))
            .collect()
    }

    #[test]
    fn declared_path_params_match_templates() {
        for route in GLOSSARY_ROUTES {
            assert_eq!(
                placeholders(route.path_template),
                route.path_params,
                "{}",
                route.operation_id
            );
        }
    }

    #[test]
    fn operation_ids_are_unique() {
        let ids: HashSet<_> = GLOSSARY_ROUTES.iter().map(|r| r.operation_id).collect();
        assert_eq!(ids.len(), GLOSSARY_ROUTES.len());
    }

    #[test]
    fn every_method_parses() {
        for route in GLOSSARY_ROUTES {
            route.http_method().expect("valid method");
        }
    }

    #[test]
    fn csv_family_requires_api_version() {
        let csv: Vec<_> = GLOSSARY_ROUTES
            .iter()
            .filter(|r| r.path_template.starts_with("/glossary/"))
            .collect();
        assert_eq!(csv.len(), 5);
        assert!(csv.iter().all(|r| r.required_query == ["api-version"]));
        assert!(
            GLOSSARY_ROUTES
                .iter()
                .filter(|r| r.path_template.starts_with("/atlas/"))
                .all(|r| r.required_query.is_empty())
        );
    }

    #[test]
    fn export_accepts_csv_and_streams() {
        let registry = RouteRegistry::glossary();
        let export = registry
            .find(ops::EXPORT_GLOSSARY_TERMS_AS_CSV)
            .expect("export route");
        assert_eq!(export.accept, "text/csv");
        assert_eq!(export.body, BodyKind::Json);
        assert!(export.streamed_response);
    }

    #[test]
    fn unknown_operation_is_reported() {
        let error = RouteRegistry::glossary()
            .find("getGlossaryz")
            .expect_err("unknown id");
        assert!(matches!(error, ClientError::UnknownOperation(id) if id == "getGlossaryz"));
    }
}
