use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde_json::json;
use tera::Context;
use log::{info, error};

use crate::model::{builtin_templates, MODELS};
use crate::web::models::{ChatRequest, ErrorResponse, GenerationParameters};
use crate::web::AppState;

// Index page handler
pub async fn index(data: web::Data<AppState>) -> impl Responder {
    let defaults = GenerationParameters::default();

    let mut context = Context::new();
    context.insert("models", &MODELS);
    context.insert("templates", &builtin_templates());
    context.insert("model", &defaults.model);
    context.insert("temperature", &defaults.temperature);
    context.insert("max_tokens", &defaults.max_tokens);

    match data.tera.render("index.html", &context) {
        Ok(html) => HttpResponse::Ok().content_type("text/html").body(html),
        Err(e) => {
            error!("Template error: {}", e);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

// Health check endpoint
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

// Generate-reply endpoint
pub async fn generate(
    data: web::Data<AppState>,
    req: web::Json<ChatRequest>,
) -> impl Responder {
    info!("Generate request: {} message(s) for model {}",
          req.messages.len(), req.params.model);

    HttpResponse::Ok().json(data.synthesizer.synthesize(&req))
}

// List-templates endpoint
pub async fn templates() -> impl Responder {
    HttpResponse::Ok().json(builtin_templates())
}

/// Maps any request body that fails to parse onto the generic 500 envelope.
pub fn json_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    error!("Mock API error on {}: {}", req.path(), err);

    let response = HttpResponse::InternalServerError().json(ErrorResponse {
        error: "Mock server error".to_string(),
    });
    InternalError::from_response(err, response).into()
}
