//! Page fixtures
//!
//! A fixture describes a page for the in-memory host:
//!
//! ```toml
//! url = "https://shop.example/?sec=pricing"
//! viewport_height = 800
//! content_height = 3200
//!
//! [config]
//! offset = ".site-header"
//! duration = 400
//!
//! [[elements]]
//! tag = "header"
//! class = "site-header"
//! top = 0
//! height = 72
//! fixed = true
//!
//! [[elements]]
//! id = "pricing"
//! class = "section-anchor"
//! top = 1600
//! height = 800
//! attributes = { data-anchor-name = "Plans & pricing" }
//! ```
//!
//! Elements are appended to the body in order. `config` holds the same
//! attributes a host element would carry, in either dataset or raw form.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use waymark_core::{ConfigResolver, Configuration, Document, MemoryDocument};

#[derive(Debug, Deserialize, Serialize)]
pub struct PageFixture {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f32,
    #[serde(default)]
    pub content_height: Option<f32>,
    #[serde(default)]
    pub reduced_motion: bool,
    #[serde(default)]
    pub config: IndexMap<String, toml::Value>,
    #[serde(default)]
    pub elements: Vec<ElementFixture>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ElementFixture {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub top: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    /// Layout box is in viewport coordinates (sticky headers)
    #[serde(default)]
    pub fixed: bool,
}

fn default_url() -> String {
    waymark_core::memory::DEFAULT_URL.to_string()
}

fn default_viewport_height() -> f32 {
    800.0
}

fn default_tag() -> String {
    "section".to_string()
}

impl PageFixture {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Host attributes as strings, the way a page would carry them
    pub fn attributes(&self) -> impl Iterator<Item = (&str, String)> {
        self.config.iter().map(|(k, v)| (k.as_str(), attribute_value(v)))
    }

    pub fn configuration(&self) -> Configuration {
        ConfigResolver::new().resolve(self.attributes())
    }

    /// Materialize the page
    pub fn build(&self) -> Result<MemoryDocument> {
        let mut doc = MemoryDocument::with_url(self.viewport_height, &self.url)
            .with_context(|| format!("Invalid fixture url '{}'", self.url))?;
        doc.set_reduced_motion(self.reduced_motion);
        if let Some(height) = self.content_height {
            doc.set_content_height(height);
        }

        let body = doc.body();
        for element in &self.elements {
            let node = doc.add_element(body, &element.tag);
            if let Some(id) = &element.id {
                doc.set_attribute(node, "id", id);
            }
            if let Some(class) = &element.class {
                doc.set_attribute(node, "class", class);
            }
            for (name, value) in &element.attributes {
                doc.set_attribute(node, name, value);
            }
            if let Some(text) = &element.text {
                doc.set_text(node, text);
            }
            if let (Some(top), Some(height)) = (element.top, element.height) {
                if element.fixed {
                    doc.set_fixed_layout(node, top, height);
                } else {
                    doc.set_layout(node, top, height);
                }
            }
        }
        doc.take_mutations();
        Ok(doc)
    }
}

fn attribute_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_core::{Alignment, AnchorRegistry, OffsetSpec, Viewport, Window};

    const LANDING: &str = include_str!("../fixtures/landing.toml");

    #[test]
    fn test_landing_fixture_builds() {
        let fixture = PageFixture::parse(LANDING).unwrap();
        let doc = fixture.build().unwrap();
        let config = fixture.configuration();

        let mut registry = AnchorRegistry::new(config.anchor_selector.clone());
        registry.refresh(&doc);
        let ids: Vec<_> = registry.anchors().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["intro", "features", "pricing", "faq"]);
        assert_eq!(doc.location().as_str(), "https://shop.example/?sec=pricing");
        assert_eq!(doc.viewport_height(), 800.0);
    }

    #[test]
    fn test_non_string_config_values() {
        let fixture = PageFixture::parse(
            r#"
            [config]
            offset = 64
            duration = 0
            auto-hide = true
            align = "center"
            "#,
        )
        .unwrap();
        let config = fixture.configuration();
        assert_eq!(config.offset, OffsetSpec::Pixels(64));
        assert_eq!(config.duration_ms, 0);
        assert!(config.auto_hide);
        assert_eq!(config.alignment, Alignment::Center);
    }

    #[test]
    fn test_defaults() {
        let fixture = PageFixture::parse("").unwrap();
        assert_eq!(fixture.url, waymark_core::memory::DEFAULT_URL);
        assert_eq!(fixture.viewport_height, 800.0);
        assert!(fixture.elements.is_empty());
    }

    #[test]
    fn test_bad_url_is_an_error() {
        let fixture = PageFixture::parse(r#"url = "not a url""#).unwrap();
        assert!(fixture.build().is_err());
    }
}
