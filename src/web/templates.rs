use minijinja::Environment;
use rust_embed::RustEmbed;
use serde::Serialize;
use tracing::error;

#[derive(RustEmbed)]
#[folder = "templates/"]
struct TemplateAssets;

/// Template environment backed by the embedded `templates/` folder.
pub fn init_templates() -> Environment<'static> {
    let mut env = Environment::new();

    env.set_loader(|name| {
        Ok(TemplateAssets::get(name)
            .map(|file| String::from_utf8_lossy(&file.data).into_owned()))
    });

    env
}

pub fn render_template<S: Serialize>(env: &Environment, template_name: &str, context: S) -> String {
    match env.get_template(template_name) {
        Ok(tmpl) => match tmpl.render(context) {
            Ok(result) => result,
            Err(e) => {
                error!("Template render error: {}", e);
                format!("<h1>Template Error</h1><p>{}</p>", e)
            }
        },
        Err(e) => {
            error!("Template not found: {} ({})", template_name, e);
            format!("<h1>Template Not Found</h1><p>{}: {}</p>", template_name, e)
        }
    }
}
