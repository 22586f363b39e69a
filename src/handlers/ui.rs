use crate::error::AppError;
use axum::response::Html;
use minijinja::Environment;
use serde::Serialize;

/// Page templates, compiled into the binary. Names ending in `.html` are
/// auto-escaped.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("layout.html", include_str!("../../templates/layout.html"))?;
        env.add_template("login.html", include_str!("../../templates/login.html"))?;
        env.add_template("chat.html", include_str!("../../templates/chat.html"))?;
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<Html<String>, AppError> {
        let html = self.env.get_template(name)?.render(context)?;
        Ok(Html(html))
    }
}
