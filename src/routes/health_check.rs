use actix_web::{HttpRequest, HttpResponse, Responder};

/// Probe used by deployments and tests to know if the server is up
#[tracing::instrument(name = "Health Check handler", skip(_request))]
pub async fn health_check(_request: HttpRequest) -> impl Responder {
    HttpResponse::Ok().finish()
}
