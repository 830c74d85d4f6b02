//! Policy document rendering
//!
//! Documents are stored as handlebars templates and rendered with
//! account-specific variables. Every rendered document carries a
//! fingerprint (hex SHA-256 of the document text) which the policy
//! reconciler uses to detect that nothing changed.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::TemplateError;

/// Variables substituted into a template.
pub type TemplateVariables = serde_json::Map<String, serde_json::Value>;

/// Where a template is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateLocation {
    pub bucket: String,
    pub key: String,
}

impl TemplateLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for TemplateLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// A rendered document and its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    pub document: String,
    pub fingerprint: String,
}

impl RenderedTemplate {
    /// Wrap a document, computing its fingerprint.
    pub fn new(document: String) -> Self {
        let fingerprint = fingerprint(&document);
        Self {
            document,
            fingerprint,
        }
    }
}

/// Deterministic fingerprint of a document.
#[must_use]
pub fn fingerprint(document: &str) -> String {
    format!("{:x}", Sha256::digest(document.as_bytes()))
}

/// Renders documents from stored templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get_template_object(
        &self,
        location: &TemplateLocation,
        variables: &TemplateVariables,
    ) -> Result<RenderedTemplate, TemplateError>;
}

/// Fetches raw template text.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Return the template body, or `TemplateError::NotFound`.
    async fn fetch(&self, location: &TemplateLocation) -> Result<String, TemplateError>;
}

/// In-process template source.
#[derive(Debug, Default)]
pub struct MemoryTemplateSource {
    templates: RwLock<HashMap<TemplateLocation, String>>,
}

impl MemoryTemplateSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template, builder style.
    #[must_use]
    pub fn with_template(self, location: TemplateLocation, body: impl Into<String>) -> Self {
        self.insert(location, body);
        self
    }

    /// Add or replace a template.
    pub fn insert(&self, location: TemplateLocation, body: impl Into<String>) {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(location, body.into());
    }
}

#[async_trait]
impl TemplateSource for MemoryTemplateSource {
    async fn fetch(&self, location: &TemplateLocation) -> Result<String, TemplateError> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(location)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound {
                location: location.to_string(),
            })
    }
}

/// Template store rendering with handlebars.
///
/// Strict mode is on so a variable missing from the input fails the
/// render instead of yielding an empty string. Escaping is off because
/// documents are JSON, not HTML.
pub struct HandlebarsTemplateStore<S> {
    source: S,
    registry: Handlebars<'static>,
}

impl<S: TemplateSource> HandlebarsTemplateStore<S> {
    pub fn new(source: S) -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        Self { source, registry }
    }
}

#[async_trait]
impl<S: TemplateSource> TemplateStore for HandlebarsTemplateStore<S> {
    async fn get_template_object(
        &self,
        location: &TemplateLocation,
        variables: &TemplateVariables,
    ) -> Result<RenderedTemplate, TemplateError> {
        let body = self.source.fetch(location).await?;

        let document = self
            .registry
            .render_template(&body, variables)
            .map_err(|e| TemplateError::Render {
                location: location.to_string(),
                message: e.to_string(),
            })?;

        let rendered = RenderedTemplate::new(document);
        debug!(
            location = %location,
            fingerprint = %rendered.fingerprint,
            "Rendered template"
        );
        Ok(rendered)
    }
}
