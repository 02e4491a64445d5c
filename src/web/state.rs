use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use crate::web::templates::init_templates;
use minijinja::Environment;

/// Shared application state for the web server. Read-only after startup.
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: Pipeline,
    pub template_env: Environment<'static>,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: Pipeline) -> Self {
        Self {
            config,
            pipeline,
            template_env: init_templates(),
            startup_time: chrono::Utc::now(),
        }
    }
}
