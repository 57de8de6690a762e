//! OpenAPI 3.0 specification definition

use utoipa::OpenApi;

use crate::api::handlers::{
    health::{HealthResponse, StorageStatus},
    presentations::{
        ApiError, ErrorResponse, PresentationSummary, PresentationsListResponse, UploadResponse,
    },
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PPTX MCP Server Storage API",
        version = "2.0.0",
        description = "Durable storage and download links for generated PowerPoint presentations",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    tags(
        (name = "system", description = "System health and status endpoints"),
        (name = "presentations", description = "Presentation storage and download endpoints")
    ),
    paths(
        crate::api::handlers::health::health_check,
        crate::api::handlers::presentations::download_presentation,
        crate::api::handlers::presentations::head_presentation,
        crate::api::handlers::presentations::delete_presentation,
        crate::api::handlers::presentations::list_presentations,
        crate::api::handlers::presentations::upload_presentation,
    ),
    components(
        schemas(
            // Health schemas
            HealthResponse,
            StorageStatus,
            // Presentation schemas
            PresentationSummary,
            PresentationsListResponse,
            UploadResponse,
            ErrorResponse,
            ApiError,
        )
    )
)]
pub struct ApiDoc;
