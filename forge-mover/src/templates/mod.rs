//! Attribution templates for migrated issue and comment bodies.
//!
//! Bodies are rendered with Handlebars, then a hidden marker carrying the
//! source identity is appended so later runs can recognize what was already
//! migrated.

mod error;
mod markers;
mod renderer;

pub use error::TemplateError;
pub use markers::{
    comment_marker, issue_marker, parse_comment_marker, parse_issue_marker, strip_markers,
};
pub use renderer::{create_handlebars_registry, TemplateRenderer};

/// Default template for migrated issue bodies.
pub const DEFAULT_ISSUE_TEMPLATE: &str = "{{body}}

---
_Migrated from {{source_repository}}#{{number}}{{#if author}}, opened by @{{author}}{{/if}}{{#if (eq state \"closed\")}} (closed at source){{/if}}._";

/// Default template for migrated comment bodies.
pub const DEFAULT_COMMENT_TEMPLATE: &str = "{{body}}

---
_Posted{{#if author}} by @{{author}}{{/if}} on {{created_at}}._";
