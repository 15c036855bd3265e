use actix_web::web;

/// # Health Check Endpoint
///
/// Returns the service status, version and check time.
pub mod health;

/// # GraphQL Endpoints
///
/// - `POST /graphql`: domain queries and mutations
/// - `GET /playground`: interactive GraphQL Playground
pub mod graphql;

/// # API Route Configuration
///
/// Sets up versioned API endpoints under the `/api/v1` base path.
///
/// ## Example Endpoints
///
/// ```text
/// GET  /api/v1/health     - Service health status
/// POST /api/v1/graphql    - Domain registration and verification
/// GET  /api/v1/playground - GraphQL Playground
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::configure_routes)
            .configure(graphql::configure_routes),
    );
}
