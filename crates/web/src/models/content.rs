//! Keyed website content blocks.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use siddha_clinic_core::ContentId;

use super::optional_text;
use crate::db::Record;

/// Section key of the SEO title/description block.
pub const SEO_SECTION_KEY: &str = "seo";

/// A content block keyed by section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteContent {
    pub id: ContentId,
    pub section_key: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default = "enabled")]
    pub is_enabled: bool,
}

const fn enabled() -> bool {
    true
}

impl Record for WebsiteContent {
    const TABLE: &'static str = "website_content";

    fn row_id(&self) -> Uuid {
        self.id.as_uuid()
    }
}

/// The SEO title and meta description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoBlock {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl SeoBlock {
    /// Read from the stored content row.
    #[must_use]
    pub fn from_content(content: &WebsiteContent) -> Self {
        Self {
            title: content.title.clone().unwrap_or_default(),
            description: content.content.clone().unwrap_or_default(),
        }
    }

    /// Patch applied to an existing SEO row.
    #[must_use]
    pub fn to_patch(&self) -> Value {
        json!({
            "title": optional_text(&self.title),
            "content": optional_text(&self.description),
        })
    }

    /// Row inserted when no SEO block exists yet.
    #[must_use]
    pub fn to_row(&self) -> Value {
        json!({
            "section_key": SEO_SECTION_KEY,
            "title": optional_text(&self.title),
            "content": optional_text(&self.description),
            "is_enabled": true,
        })
    }
}
