use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::enrollment::EnrollmentStatus;
use crate::service::{EnrollmentService, ServiceError};

// ============================================================================
// HTTP Layer - actix-web routing over the service contract
// ============================================================================
//
// Pure translation between HTTP and the service: no domain logic lives here.
// Substituting another framework must leave the core's observable behavior
// unchanged.
//
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EnrollmentRequest {
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub course_id: String,
}

/// Public JSON representation: status as its string name, version and
/// timestamps stay internal.
#[derive(Debug, Serialize)]
pub struct EnrollmentResponse {
    pub id: Uuid,
    pub student_id: String,
    pub course_id: String,
    pub status: EnrollmentStatus,
}

impl From<crate::domain::enrollment::Enrollment> for EnrollmentResponse {
    fn from(e: crate::domain::enrollment::Enrollment) -> Self {
        Self {
            id: e.id,
            student_id: e.student_id,
            course_id: e.course_id,
            status: e.status,
        }
    }
}

/// Start the API HTTP server.
pub async fn start_http_server(
    service: Arc<EnrollmentService>,
    registry: Arc<Registry>,
    addr: &str,
    port: u16,
) -> std::io::Result<()> {
    tracing::info!("🌐 Serving enrollment API on http://{}:{}", addr, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(service.clone()))
            .app_data(web::Data::new(registry.clone()))
            .configure(configure_routes)
    })
    .bind((addr, port))?
    .run()
    .await
}

/// Route table, shared between the server and in-process tests.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/enrollments", web::post().to(create_enrollment))
        .route("/enrollments/{id}", web::get().to(get_enrollment))
        .route("/enrollments/{id}/confirm", web::post().to(confirm_enrollment))
        .route("/enrollments/{id}/cancel", web::post().to(cancel_enrollment))
        .route("/health", web::get().to(health_handler))
        .route("/metrics", web::get().to(metrics_handler));
}

async fn create_enrollment(
    service: web::Data<Arc<EnrollmentService>>,
    request: web::Json<EnrollmentRequest>,
) -> impl Responder {
    match service.create(&request.student_id, &request.course_id).await {
        Ok(enrollment) => HttpResponse::Created()
            .append_header(("Location", format!("/enrollments/{}", enrollment.id)))
            .json(EnrollmentResponse::from(enrollment)),
        Err(err) => error_response(err),
    }
}

async fn get_enrollment(
    service: web::Data<Arc<EnrollmentService>>,
    path: web::Path<String>,
) -> impl Responder {
    let id = match parse_id(&path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match service.get(id).await {
        Ok(enrollment) => HttpResponse::Ok().json(EnrollmentResponse::from(enrollment)),
        Err(err) => error_response(err),
    }
}

async fn confirm_enrollment(
    service: web::Data<Arc<EnrollmentService>>,
    path: web::Path<String>,
) -> impl Responder {
    let id = match parse_id(&path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match service.confirm(id).await {
        Ok(enrollment) => HttpResponse::Ok().json(EnrollmentResponse::from(enrollment)),
        Err(err) => error_response(err),
    }
}

async fn cancel_enrollment(
    service: web::Data<Arc<EnrollmentService>>,
    path: web::Path<String>,
) -> impl Responder {
    let id = match parse_id(&path) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match service.cancel(id).await {
        Ok(enrollment) => HttpResponse::Ok().json(EnrollmentResponse::from(enrollment)),
        Err(err) => error_response(err),
    }
}

async fn health_handler() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "enrollment-api"
    }))
}

async fn metrics_handler(registry: web::Data<Arc<Registry>>) -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

/// A path id that does not parse as a UUID can match no record.
fn parse_id(raw: &str) -> Result<Uuid, HttpResponse> {
    Uuid::parse_str(raw).map_err(|_| {
        HttpResponse::NotFound().json(serde_json::json!({
            "message": format!("enrollment {raw} not found")
        }))
    })
}

fn error_response(err: ServiceError) -> HttpResponse {
    match err {
        ServiceError::Validation(errors) => {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            HttpResponse::BadRequest().json(serde_json::json!({
                "errors": { "ids": messages }
            }))
        }
        ServiceError::NotFound(id) => HttpResponse::NotFound().json(serde_json::json!({
            "message": format!("enrollment {id} not found")
        })),
        // The conflict subtype (duplicate pair, wrong state, lost race) is
        // deliberately not exposed: the caller's corrective action is the
        // same for all of them. The detail survives in logs only.
        ServiceError::Conflict(_) => HttpResponse::Conflict().json(serde_json::json!({
            "message": "conflict with the current enrollment state"
        })),
        ServiceError::Internal(e) => {
            tracing::error!("Storage failure serving request: {e:#}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "message": "internal error"
            }))
        }
    }
}

// ============================================================================
// HTTP Tests - in-process, over the memory store
// ============================================================================
