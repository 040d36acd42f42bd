use actix_web::{middleware::Logger, web::Data, App, HttpServer};
use actix_files as fs;
use dotenv::dotenv;
use log::{info, error};
use tera::Tera;

use ai_interface::config::ServerConfig;
use ai_interface::model::Synthesizer;
use ai_interface::web::{routes, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting AI interface prototype");

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize template engine
    let mut tera = match Tera::new(&config.template_glob) {
        Ok(t) => t,
        Err(e) => {
            error!("Template parsing error: {}", e);
            std::process::exit(1);
        }
    };
    tera.autoescape_on(vec![".html"]);

    let app_state = Data::new(AppState {
        tera,
        synthesizer: Synthesizer::new(),
    });

    info!("Listening on http://{}:{}", config.host, config.port);

    let static_dir = config.static_dir.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(app_state.clone())
            .configure(routes::configure)
            .service(fs::Files::new("/static", &static_dir))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
