//! Health check endpoint

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::BackendKind;
use crate::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub storage: StorageStatus,
    pub base_url: String,
    /// Where the base URL came from: configured, platform, detected or placeholder
    pub base_url_source: &'static str,
    pub warnings: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct StorageStatus {
    /// local, disk or s3
    pub backend: String,
    pub location: String,
    pub durable: bool,
    pub reason: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// GET /health - Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Storage is usable", body = HealthResponse),
        (status = 503, description = "Storage check failed; see storage.reason", body = HealthResponse)
    )
)]
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let report = state.health.current().await;
    let router = state.store.router();
    let urls = state.store.urls();
    let kind = router.kind();

    let mut warnings = Vec::new();
    if kind == BackendKind::Local {
        warnings.push("local storage is ephemeral; presentations are lost on restart".to_string());
    }
    warnings.extend(urls.warning());

    let response = HealthResponse {
        status: if report.healthy { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        storage: StorageStatus {
            backend: kind.to_string(),
            location: router.describe(),
            durable: kind.is_durable(),
            reason: report.reason,
            checked_at: report.checked_at,
        },
        base_url: urls.base_url().to_string(),
        base_url_source: urls.source().as_str(),
        warnings,
    };

    if report.healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{app_state, mounted_store};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::Value;

    #[actix_web::test]
    async fn test_healthy_mount() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(app_state(mounted_store(dir.path())))
                .configure(crate::api::configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["storage"]["backend"], "disk");
        assert_eq!(body["storage"]["durable"], true);
        assert!(body["storage"]["reason"].is_null());
        assert_eq!(body["base_url"], "https://svc.example.com");
        assert_eq!(body["base_url_source"], "configured");
    }

    #[actix_web::test]
    async fn test_missing_mount_reports_503_with_reason() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("not-mounted");
        let app = test::init_service(
            App::new()
                .app_data(app_state(mounted_store(&root)))
                .configure(crate::api::configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "unhealthy");
        let reason = body["storage"]["reason"].as_str().unwrap();
        assert!(reason.contains(&root.display().to_string()), "{reason}");
    }
}
