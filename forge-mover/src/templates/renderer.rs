//! Template renderer.

use super::markers::{comment_marker, issue_marker, strip_markers};
use super::{TemplateError, DEFAULT_COMMENT_TEMPLATE, DEFAULT_ISSUE_TEMPLATE};
use crate::provider::{GitIssue, GitIssueComment};
use handlebars::{no_escape, Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use serde_json::json;

const ISSUE: &str = "issue";
const COMMENT: &str = "comment";

/// Creates a configured Handlebars registry.
///
/// - No HTML escaping (bodies are markdown)
/// - Strict mode (catches misspelled variables)
/// - `eq` helper for string comparisons
#[must_use]
pub fn create_handlebars_registry() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();
    hbs.register_escape_fn(no_escape);
    hbs.set_strict_mode(true);
    hbs.register_helper("eq", Box::new(eq_helper));
    hbs
}

/// Usage: `{{#if (eq state "closed")}}...{{/if}}`
fn eq_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let lhs = h.param(0).and_then(|v| v.value().as_str());
    let rhs = h.param(1).and_then(|v| v.value().as_str());

    if matches!((lhs, rhs), (Some(a), Some(b)) if a == b) {
        out.write("true")?;
    }
    Ok(())
}

/// Renders attribution bodies for migrated issues and comments.
pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        // Built-in templates are known to compile.
        Self::new(DEFAULT_ISSUE_TEMPLATE, DEFAULT_COMMENT_TEMPLATE)
            .unwrap_or_else(|_| Self {
                handlebars: create_handlebars_registry(),
            })
    }
}

impl TemplateRenderer {
    /// Compiles the issue and comment templates.
    ///
    /// # Errors
    ///
    /// Returns an error if either template fails to parse.
    pub fn new(issue_template: &str, comment_template: &str) -> Result<Self, TemplateError> {
        let mut handlebars = create_handlebars_registry();
        handlebars
            .register_template_string(ISSUE, issue_template)
            .map_err(|e| TemplateError::Registration {
                name: ISSUE,
                source: Box::new(e),
            })?;
        handlebars
            .register_template_string(COMMENT, comment_template)
            .map_err(|e| TemplateError::Registration {
                name: COMMENT,
                source: Box::new(e),
            })?;
        Ok(Self { handlebars })
    }

    /// Renders the destination body for a source issue, marker included.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_issue(&self, issue: &GitIssue) -> Result<String, TemplateError> {
        let author = issue.author.as_ref();
        let data = json!({
            "title": issue.title,
            "body": strip_markers(&issue.body),
            "number": issue.number,
            "state": issue.state.as_str(),
            "author": author.map_or("", |a| a.login.as_str()),
            "author_name": author.map_or("", |a| a.display_name()),
            "source_repository": issue.repository,
        });
        let rendered = self.handlebars.render(ISSUE, &data)?;
        Ok(format!(
            "{}\n\n{}",
            rendered.trim_end(),
            issue_marker(issue.number)
        ))
    }

    /// Renders the destination body for a source comment, marker included.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render_comment(&self, comment: &GitIssueComment) -> Result<String, TemplateError> {
        let author = comment.author.as_ref();
        let data = json!({
            "body": strip_markers(&comment.body),
            "author": author.map_or("", |a| a.login.as_str()),
            "author_name": author.map_or("", |a| a.display_name()),
            "created_at": comment.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            "issue_number": comment.issue_number,
            "source_repository": comment.repository,
        });
        let rendered = self.handlebars.render(COMMENT, &data)?;
        Ok(format!(
            "{}\n\n{}",
            rendered.trim_end(),
            comment_marker(comment.created_at)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{GitUser, IssueState};
    use crate::templates::{parse_comment_marker, parse_issue_marker};
    use chrono::{TimeZone, Utc};

    fn issue() -> GitIssue {
        GitIssue {
            repository: "app".to_string(),
            number: 7,
            title: "Crash".to_string(),
            body: "It <b>breaks</b>".to_string(),
            state: IssueState::Closed,
            author: Some(GitUser::with_login("carol")),
            ..Default::default()
        }
    }

    #[test]
    fn default_issue_template_attributes_author() {
        let body = TemplateRenderer::default().render_issue(&issue()).unwrap();

        assert!(body.starts_with("It <b>breaks</b>"));
        assert!(body.contains("_Migrated from app#7, opened by @carol (closed at source)._"));
        assert_eq!(parse_issue_marker(&body), Some(7));
    }

    #[test]
    fn custom_templates_are_used() {
        let renderer = TemplateRenderer::new("{{title}}: {{body}}", "{{author}} said {{body}}").unwrap();
        let body = renderer.render_issue(&issue()).unwrap();
        assert!(body.starts_with("Crash: It <b>breaks</b>"));
    }

    #[test]
    fn comment_carries_creation_marker() {
        let at = Utc.with_ymd_and_hms(2022, 2, 3, 4, 5, 6).unwrap();
        let comment = GitIssueComment {
            repository: "app".to_string(),
            issue_number: 7,
            author: None,
            body: "Fixed".to_string(),
            created_at: at,
            updated_at: at,
        };

        let body = TemplateRenderer::default().render_comment(&comment).unwrap();

        assert!(body.contains("_Posted on 2022-02-03 04:05 UTC._"));
        assert_eq!(parse_comment_marker(&body), Some(at));
    }

    #[test]
    fn invalid_template_is_rejected() {
        let result = TemplateRenderer::new("{{#if}}", DEFAULT_COMMENT_TEMPLATE);
        assert!(matches!(
            result,
            Err(TemplateError::Registration { name: "issue", .. })
        ));
    }

    #[test]
    fn unknown_variable_fails_in_strict_mode() {
        let renderer = TemplateRenderer::new("{{nope}}", DEFAULT_COMMENT_TEMPLATE).unwrap();
        assert!(renderer.render_issue(&issue()).is_err());
    }
}
