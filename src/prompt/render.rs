//! Prompt Renderer - Typed template rendering using Handlebars
//!
//! A `PromptTemplate` knows which placeholders it needs. Rendering refuses to
//! run unless every one of them is bound to a non-blank value.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use handlebars::Handlebars;
use regex::Regex;

use crate::error::{PostforgeError, Result};
use crate::prompt::fields::{PromptBindings, PromptField};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\{?\s*([^{}]*?)\s*\}?\}\}").expect("placeholder regex"));

/// A parsed prompt template and the fields it requires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    body: String,
    required: BTreeSet<PromptField>,
}

impl PromptTemplate {
    /// Parse a template body, rejecting placeholders that are not recognized fields
    pub fn parse(name: impl Into<String>, body: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let body = body.into();

        let mut required = BTreeSet::new();
        let mut unknown = Vec::new();
        for caps in PLACEHOLDER.captures_iter(&body) {
            let token = &caps[1];
            match token.parse::<PromptField>() {
                Ok(field) => {
                    required.insert(field);
                }
                Err(_) => {
                    if !unknown.iter().any(|u: &String| u == token) {
                        unknown.push(token.to_string());
                    }
                }
            }
        }

        if !unknown.is_empty() {
            return Err(PostforgeError::invalid(format!(
                "template '{}' uses unknown placeholders: {}",
                name,
                unknown.join(", ")
            )));
        }

        Ok(Self { name, body, required })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn required_fields(&self) -> &BTreeSet<PromptField> {
        &self.required
    }

    /// Required fields not bound in `bindings`
    pub fn missing_fields(&self, bindings: &PromptBindings) -> Vec<PromptField> {
        self.required
            .iter()
            .copied()
            .filter(|field| !bindings.is_bound(*field))
            .collect()
    }
}

/// Renders prompt templates using Handlebars templating
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    /// Create a new PromptRenderer in strict mode
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        // Prompts are plain text, never HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Render a template with its bindings
    ///
    /// Fails with `InvalidRequest` naming every required field that is unbound.
    pub fn render(&self, template: &PromptTemplate, bindings: &PromptBindings) -> Result<String> {
        let missing = template.missing_fields(bindings);
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|f| f.as_str()).collect();
            return Err(PostforgeError::invalid(format!(
                "template '{}' has unbound fields: {}",
                template.name(),
                names.join(", ")
            )));
        }

        self.handlebars
            .render_template(template.body(), &bindings.to_json())
            .map_err(|e| PostforgeError::Template(format!("Failed to render '{}': {}", template.name(), e)))
    }

    /// Parse and render an inline template in one step
    pub fn render_str(&self, name: &str, body: &str, bindings: &PromptBindings) -> Result<String> {
        let template = PromptTemplate::parse(name, body)?;
        self.render(&template, bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings() -> PromptBindings {
        PromptBindings::new()
            .with(PromptField::Ticker, "TSM")
            .with(PromptField::CompanyName, "Taiwan Semiconductor")
            .with(PromptField::ReportUrl, "https://example.com/reports/tsm")
    }

    #[test]
    fn test_parse_collects_required_fields() {
        let template = PromptTemplate::parse("t", "{{ticker}} by {{ company_name }} {{ticker}}").unwrap();
        let required: Vec<_> = template.required_fields().iter().copied().collect();
        assert_eq!(required, vec![PromptField::Ticker, PromptField::CompanyName]);
        assert_eq!(template.name(), "t");
    }

    #[test]
    fn test_parse_rejects_unknown_placeholders() {
        let err = PromptTemplate::parse("t", "{{ticker}} {{price_target}} {{mood}} {{mood}}").unwrap_err();
        assert!(err.is_invalid_request());
        let msg = err.to_string();
        assert!(msg.contains("price_target"));
        assert!(msg.contains("mood"));
    }

    #[test]
    fn test_parse_rejects_block_helpers() {
        let err = PromptTemplate::parse("t", "{{#if ticker}}x{{/if}}").unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn test_render_substitutes_values() {
        let renderer = PromptRenderer::new();
        let out = renderer
            .render_str("t", "Write about {{company_name}} ({{ticker}}). Data: {{report_url}}", &bindings())
            .unwrap();
        assert_eq!(
            out,
            "Write about Taiwan Semiconductor (TSM). Data: https://example.com/reports/tsm"
        );
    }

    #[test]
    fn test_render_does_not_escape() {
        let renderer = PromptRenderer::new();
        let b = PromptBindings::new().with(PromptField::SourceText, "P/E < 20 & \"cheap\"");
        let out = renderer.render_str("t", "{{source_text}}", &b).unwrap();
        assert_eq!(out, "P/E < 20 & \"cheap\"");
    }

    #[test]
    fn test_render_lists_every_missing_field() {
        let renderer = PromptRenderer::new();
        let template = PromptTemplate::parse("writer", "{{ticker}} {{bull_case}} {{bear_case}}").unwrap();
        let err = renderer.render(&template, &bindings()).unwrap_err();
        assert!(err.is_invalid_request());
        let msg = err.to_string();
        assert!(msg.contains("bull_case"));
        assert!(msg.contains("bear_case"));
        assert!(!msg.contains("ticker,"));
    }

    #[test]
    fn test_render_blank_binding_is_missing() {
        let renderer = PromptRenderer::new();
        let b = bindings().with(PromptField::RiskFactors, "");
        let err = renderer.render_str("t", "{{risk_factors}}", &b).unwrap_err();
        assert!(err.to_string().contains("risk_factors"));
    }

    #[test]
    fn test_template_without_placeholders() {
        let renderer = PromptRenderer::new();
        let out = renderer.render_str("plain", "No fields here.", &PromptBindings::new()).unwrap();
        assert_eq!(out, "No fields here.");
    }
}
