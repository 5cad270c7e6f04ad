//! Template error types.

/// Template rendering error.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Handlebars rendering error.
    #[error("Template rendering error: {0}")]
    Render(#[from] handlebars::RenderError),

    /// Template failed to compile.
    #[error("Invalid {name} template: {source}")]
    Registration {
        name: &'static str,
        #[source]
        source: Box<handlebars::TemplateError>,
    },
}
