use utoipa::OpenApi;

/// OpenAPI Specification Documentation
///
/// Covers the REST surface. Domain registration and verification live behind
/// the GraphQL endpoint (`POST /api/v1/graphql`), which is described by its
/// own introspection schema rather than here.
///
/// # Endpoints
/// - Health Check: `GET /api/v1/health`
#[derive(OpenApi)]
#[openapi(
    paths(crate::routes::health::health),
    components(schemas(crate::models::health::HealthResponse)),
    tags(
        (name = "Health Check", description = "Service health monitoring endpoints"),
        (name = "GraphQL", description = "SMTP domain registration and DNS verification")
    ),
    info(
        description = "Registers outbound-mail domains and verifies their SPF, DKIM and DMARC records",
        title = "SMTP Domain Verifier API",
        version = "0.3.0+sprint2",
    )
)]
pub struct ApiDoc;
