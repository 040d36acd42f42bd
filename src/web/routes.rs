use actix_web::web;
use crate::web::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    // Bodies are parsed as JSON whatever their content type says.
    let json_config = web::JsonConfig::default()
        .content_type_required(false)
        .error_handler(handlers::json_error);

    cfg.app_data(json_config)
        .service(
            web::scope("/api")
                .route("/models", web::post().to(handlers::generate))
                .route("/templates", web::get().to(handlers::templates))
        )
        .route("/", web::get().to(handlers::index))
        .route("/health", web::get().to(handlers::health_check));
}
