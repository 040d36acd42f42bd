pub mod handlers;
pub mod models;
pub mod routes;

use tera::Tera;

use crate::model::Synthesizer;

// App state structure
pub struct AppState {
    pub tera: Tera,
    pub synthesizer: Synthesizer,
}
