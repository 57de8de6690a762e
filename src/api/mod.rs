//! API module - HTTP routes and handlers

pub mod handlers;
pub mod openapi;

use actix_web::http::Method;
use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::openapi::ApiDoc;
use crate::storage::PRESENTATIONS_ROUTE;

/// Configure all API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource(PRESENTATIONS_ROUTE)
            .route(web::get().to(handlers::presentations::list_presentations))
            .route(web::post().to(handlers::presentations::upload_presentation))
            .route(web::method(Method::OPTIONS).to(handlers::preflight)),
    )
    .service(
        // Accepts both `<id>` and `<id>.pptx`
        web::resource(format!("{}/{{artifact_id}}", PRESENTATIONS_ROUTE))
            .route(web::get().to(handlers::presentations::download_presentation))
            .route(web::head().to(handlers::presentations::head_presentation))
            .route(web::delete().to(handlers::presentations::delete_presentation))
            .route(web::method(Method::OPTIONS).to(handlers::preflight)),
    )
    .route("/health", web::get().to(handlers::health::health_check))
    // Swagger UI and OpenAPI spec
    .service(
        SwaggerUi::new("/swagger-ui/{_:.*}")
            .url("/api-docs/openapi.json", ApiDoc::openapi())
    );
}
