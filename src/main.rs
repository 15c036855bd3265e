use actix_web::{App, HttpServer, web::Data};
use smtp_domain_verifier::config::Settings;
use smtp_domain_verifier::graphql::schema::create_schema;
use smtp_domain_verifier::openapi::ApiDoc;
use smtp_domain_verifier::service::DomainService;
use smtp_domain_verifier::store::{DomainStore, MemoryStore, MongoStore};
use smtp_domain_verifier::validation::dnstxt::SystemTxtResolver;
use smtp_domain_verifier::worker::VerificationWorker;
use std::io;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// SMTP Domain Verifier Entry Point
///
/// Loads settings from the environment (and `.env`), selects the domain
/// store, starts the background recheck worker and serves:
/// - GraphQL: `/api/v1/graphql`, Playground at `/api/v1/playground`
/// - Health: `/api/v1/health`
/// - Swagger UI: `/swagger-ui/`, OpenAPI spec at `/api-docs/openapi.json`
#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("smtp_domain_verifier=info,actix_web=info")),
        )
        .init();

    let settings = Settings::from_env().map_err(io::Error::other)?;

    let store: Arc<dyn DomainStore> = match &settings.mongo {
        Some(mongo) => Arc::new(MongoStore::connect(mongo).await.map_err(io::Error::other)?),
        None => {
            warn!("MONGODB_URI not set, domains are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };
    let resolver = Arc::new(SystemTxtResolver::new(settings.domains.dns_timeout));

    let service = Arc::new(
        DomainService::new(settings.domains.clone(), store, resolver).map_err(io::Error::other)?,
    );
    let shutdown = service.shutdown_token();

    let worker = VerificationWorker::new(service.clone());
    let worker_handle = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { worker.start(shutdown).await }
    });

    let schema = create_schema(service);

    info!(host = %settings.host, port = settings.port, "starting HTTP server");
    let result = HttpServer::new(move || {
        let openapi = ApiDoc::openapi();

        App::new()
            .app_data(Data::new(schema.clone()))
            .configure(smtp_domain_verifier::routes::configure)
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
    })
    .bind((settings.host.as_str(), settings.port))?
    .run()
    .await;

    shutdown.cancel();
    if let Err(e) = worker_handle.await {
        warn!(error = %e, "verification worker did not stop cleanly");
    }

    result
}
