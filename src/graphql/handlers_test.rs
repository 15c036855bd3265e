#[cfg(test)]
mod graphql_handlers_tests {
    use crate::graphql::handlers::*;
    use crate::graphql::schema::create_schema;
    use crate::service::DomainService;
    use crate::test_support::harness;
    use actix_web::{App, http::StatusCode, test, web};
    use serde_json::{Value, json};
    use std::sync::Arc;

    // Helper function to create a test app around a domain service
    async fn create_test_app(
        service: Arc<DomainService>,
    ) -> impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    > {
        test::init_service(
            App::new()
                .app_data(web::Data::new(create_schema(service)))
                .route("/graphql", web::post().to(graphql_handler)),
        )
        .await
    }

    #[actix_web::test]
    async fn test_graphql_handler_reads_organization_header() {
        let h = harness();
        let app = create_test_app(h.service.clone()).await;

        let req = test::TestRequest::post()
            .uri("/graphql")
            .insert_header((ORGANIZATION_HEADER, "org_1"))
            .set_json(json!({
                "query": "mutation Add($host: String!) { addDomain(host: $host) { host verified } }",
                "variables": { "host": "example.com" }
            }))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["addDomain"]["host"], "example.com");
        assert_eq!(body["data"]["addDomain"]["verified"], false);

        assert_eq!(
            h.service.list_domains("org_1").await.unwrap().len(),
            1,
            "domain should be registered for the header organization"
        );
    }

    #[actix_web::test]
    async fn test_graphql_handler_without_organization() {
        let h = harness();
        let app = create_test_app(h.service.clone()).await;

        let req = test::TestRequest::post()
            .uri("/graphql")
            .insert_header((ORGANIZATION_HEADER, "   "))
            .set_json(json!({ "query": "{ smtpDomains { host } }" }))
            .to_request();

        let resp = test::call_service(&app, req).await;
        // GraphQL still returns 200 with errors
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"][0]["extensions"]["code"], "missing_organization");
    }

    #[actix_web::test]
    async fn test_graphql_handler_health_needs_no_organization() {
        let h = harness();
        let app = create_test_app(h.service.clone()).await;

        let req = test::TestRequest::post()
            .uri("/graphql")
            .set_json(json!({ "query": "{ health { status } }" }))
            .to_request();

        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["health"]["status"], "UP");
    }

    #[actix_web::test]
    async fn test_graphql_handler_malformed_json() {
        let h = harness();
        let app = create_test_app(h.service.clone()).await;

        let req = test::TestRequest::post()
            .uri("/graphql")
            .insert_header(("content-type", "application/json"))
            .set_payload("{invalid json}")
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_graphql_playground() {
        let app =
            test::init_service(App::new().route("/playground", web::get().to(graphql_playground)))
                .await;

        let req = test::TestRequest::get().uri("/playground").to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.contains("text/html"));

        let body = test::read_body(resp).await;
        let body = std::str::from_utf8(&body).unwrap();
        assert!(body.contains("/api/v1/graphql"));
    }
}
