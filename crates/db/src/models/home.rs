//! Home page sections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mistore_core::validation::{FieldErrors, Validator};
use mistore_core::{CategoryId, HomeSectionId, HomeSectionKind, ProductId};

/// A block on the storefront home page.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HomeSection {
    pub id: HomeSectionId,
    pub kind: HomeSectionKind,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub product_ids: Vec<ProductId>,
    pub category_id: Option<CategoryId>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Home section create/update form.
#[derive(Debug, Clone, Deserialize)]
pub struct HomeSectionInput {
    pub kind: HomeSectionKind,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub product_ids: Vec<ProductId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl HomeSectionInput {
    /// Validate the form. Each kind needs the content it renders.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut v = Validator::new();
        v.required("title", &self.title).max_len("title", &self.title, 120);
        match self.kind {
            HomeSectionKind::Banner | HomeSectionKind::Promo => {
                v.required_opt("image_url", self.image_url.as_deref());
            }
            HomeSectionKind::ProductGrid => {
                v.check("product_ids", !self.product_ids.is_empty(), "must list at least one product")
                    .check("product_ids", self.product_ids.len() <= 24, "must list at most 24 products");
            }
            HomeSectionKind::CategoryShowcase => {
                v.check("category_id", self.category_id.is_some(), "is required");
            }
        }
        v.finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_specific_rules() {
        let grid: HomeSectionInput =
            serde_json::from_str(r#"{"kind":"product_grid","title":"Best sellers"}"#).unwrap();
        assert!(grid.validate().unwrap_err().get("product_ids").is_some());

        let grid = HomeSectionInput {
            product_ids: vec![ProductId::new(1), ProductId::new(2)],
            ..grid
        };
        assert!(grid.validate().is_ok());

        let banner: HomeSectionInput =
            serde_json::from_str(r#"{"kind":"banner","title":"Xiaomi 14"}"#).unwrap();
        assert!(banner.validate().unwrap_err().get("image_url").is_some());
    }
}
