//! Gallery Renderer
//!
//! Renders the index page: one `<img>` per uploaded file, each pointing at
//! its public URL under `/public/upload/`. The page is a minijinja template
//! with HTML auto-escaping; it receives `session`, `images` and `count`.

use std::path::Path;

use minijinja::{context, Environment, UndefinedBehavior};

/// Template file loaded from the template directory
pub const INDEX_TEMPLATE: &str = "index.html";

/// URL prefix under which uploaded blobs are served
pub const UPLOAD_URL_PREFIX: &str = "/public/upload/";

/// Template errors
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to read template {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Template never uses the `{0}` variable")]
    MissingVariable(&'static str),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Values rendered into the page
#[derive(Debug, Clone, Copy)]
pub struct GalleryPage<'a> {
    pub session: &'a str,
    pub images: &'a [String],
}

/// Renders gallery pages from a compiled template
#[derive(Debug, Clone)]
pub struct Gallery {
    env: Environment<'static>,
}

impl Gallery {
    /// Compile the page template from source.
    ///
    /// Syntax errors, and a template that never renders `images`, fail here
    /// rather than on the first request.
    pub fn from_source(source: impl Into<String>) -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_template_owned(INDEX_TEMPLATE, source.into())?;

        let template = env.get_template(INDEX_TEMPLATE)?;
        if !template.undeclared_variables(false).contains("images") {
            return Err(RenderError::MissingVariable("images"));
        }

        Ok(Self { env })
    }

    /// Load `index.html` from the template directory
    pub async fn load(template_dir: &Path) -> Result<Self, RenderError> {
        let path = template_dir.join(INDEX_TEMPLATE);
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| RenderError::Load {
                path: path.display().to_string(),
                source,
            })?;

        let gallery = Self::from_source(source)?;
        tracing::debug!(path = %path.display(), "Loaded page template");
        Ok(gallery)
    }

    pub fn render(&self, page: &GalleryPage<'_>) -> Result<String, RenderError> {
        let template = self.env.get_template(INDEX_TEMPLATE)?;
        let html = template.render(context! {
            session => page.session,
            images => page.images,
            count => page.images.len(),
            upload_prefix => UPLOAD_URL_PREFIX,
        })?;
        Ok(html)
    }
}
