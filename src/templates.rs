#![cfg(feature = "web")]

use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

/// Shown instead of the form whenever the collection window is closed
pub const CLOSED_PAGE: &str = "<h2>Feedback is currently closed.</h2>";

/// Registry of the embedded page templates
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_template_string("index", include_str!("./static/index.html"))?;
        registry.register_template_string("admin_login", include_str!("./static/admin_login.html"))?;
        registry.register_template_string("admin", include_str!("./static/admin.html"))?;
        Ok(Templates { registry })
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, RenderError> {
        self.registry.render(name, data)
    }
}
