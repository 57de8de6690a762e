//! HTTP request handlers

pub mod health;
pub mod presentations;

use actix_web::HttpResponse;

/// OPTIONS - CORS preflight; the allow headers come from the default header middleware
pub async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}
