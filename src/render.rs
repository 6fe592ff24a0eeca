use std::error::Error as _;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tera::Tera;

// 1. PageRenderer Contract
/// PageRenderer
///
/// Defines the abstract contract for turning a handler's render directive
/// (template name + context data) into HTML. This trait allows us to swap the
/// concrete implementation, from the real Tera engine (TeraRenderer) in production
/// to the in-memory Mock (MockRenderer) during testing, without affecting the
/// calling handlers. Handlers never touch markup themselves.
pub trait PageRenderer: Send + Sync {
    /// Renders the named template with the given context data.
    fn render_page(&self, template: &str, context: &Value) -> Result<String, String>;
}

/// RendererState
///
/// The concrete type used to share the rendering layer across the application state.
pub type RendererState = Arc<dyn PageRenderer>;

// 2. The Real Implementation (Tera)
/// TeraRenderer
///
/// The concrete implementation using the Tera template engine. Templates are
/// embedded into the binary at compile time, so rendering never depends on the
/// process working directory.
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        // The base template must be registered in the same call as its children
        // for inheritance resolution.
        tera.add_raw_templates(vec![
            ("base.html", include_str!("../templates/base.html")),
            ("index.html", include_str!("../templates/index.html")),
            ("post.html", include_str!("../templates/post.html")),
            ("register.html", include_str!("../templates/register.html")),
            ("login.html", include_str!("../templates/login.html")),
            ("about.html", include_str!("../templates/about.html")),
            ("contact.html", include_str!("../templates/contact.html")),
            ("make-post.html", include_str!("../templates/make-post.html")),
        ])?;
        Ok(Self { tera })
    }
}

impl PageRenderer for TeraRenderer {
    fn render_page(&self, template: &str, context: &Value) -> Result<String, String> {
        let context = tera::Context::from_value(context.clone()).map_err(|e| e.to_string())?;
        self.tera.render(template, &context).map_err(|e| {
            // Tera wraps the interesting cause one level down.
            match e.source() {
                Some(source) => format!("{e}: {source}"),
                None => e.to_string(),
            }
        })
    }
}

// 3. The Mock Implementation (Testing)
/// MockRenderer
///
/// Records every render directive it receives and returns the template name as
/// the "HTML", letting handler tests assert on what was rendered without
/// involving the template engine.
#[derive(Default)]
pub struct MockRenderer {
    pub rendered: Mutex<Vec<(String, Value)>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageRenderer for MockRenderer {
    fn render_page(&self, template: &str, context: &Value) -> Result<String, String> {
        self.rendered
            .lock()
            .expect("render log poisoned")
            .push((template.to_string(), context.clone()));
        Ok(format!("rendered:{template}"))
    }
}
