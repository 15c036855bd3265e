use actix_web::{HttpRequest, HttpResponse, Responder, web};
use async_graphql::http::{GraphQLPlaygroundConfig, playground_source};
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};

use crate::graphql::domain::OrganizationId;
use crate::graphql::schema::AppSchema;

/// Header carrying the organization resolved by the upstream auth layer.
pub const ORGANIZATION_HEADER: &str = "X-Organization-Id";

/// Handles incoming GraphQL requests.
///
/// The organization named by [`ORGANIZATION_HEADER`] is attached to the
/// request data; domain resolvers fail with `missing_organization` without it.
///
/// # Arguments
/// - `schema`: The application's GraphQL schema, provided as shared data through Actix-web's state management.
/// - `http_req`: The raw request, read for the organization header.
/// - `req`: The incoming GraphQL request containing the query, variables, and operation name.
///
/// # Returns
/// A [`GraphQLResponse`] containing the execution result of the GraphQL operation.
pub async fn graphql_handler(
    schema: web::Data<AppSchema>,
    http_req: HttpRequest,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = req.into_inner();

    let organization = http_req
        .headers()
        .get(ORGANIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(org) = organization {
        request = request.data(OrganizationId(org.to_string()));
    }

    schema.execute(request).await.into()
}

/// Serves the GraphQL Playground interface for interactive query testing.
///
/// The Playground is configured to send requests to the `/api/v1/graphql`
/// endpoint.
pub async fn graphql_playground() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(playground_source(GraphQLPlaygroundConfig::new(
            "/api/v1/graphql",
        )))
}
