//! Categories and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mistore_core::listing::SortDirection;
use mistore_core::validation::{FieldErrors, SLUG_PATTERN, Validator};
use mistore_core::{CategoryId, ProductId, ProductStatus};

/// A product category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub sort_order: i32,
    /// Active products in the category.
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category create/update form.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

impl CategoryInput {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        Validator::new()
            .required("name", &self.name)
            .max_len("name", &self.name, 80)
            .required("slug", &self.slug)
            .pattern("slug", &self.slug, &SLUG_PATTERN, "must be lowercase words separated by dashes")
            .max_len("slug", &self.slug, 80)
            .finish()
    }
}

/// A catalog product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub stock: i32,
    pub status: ProductStatus,
    pub is_featured: bool,
    pub image_url: Option<String>,
    pub sales_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Listed and purchasable.
    #[must_use]
    pub fn is_purchasable(&self) -> bool {
        self.status == ProductStatus::Active && self.stock > 0
    }
}

/// Product create/update form.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl ProductInput {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut v = Validator::new();
        v.required("name", &self.name)
            .max_len("name", &self.name, 120)
            .required("slug", &self.slug)
            .pattern("slug", &self.slug, &SLUG_PATTERN, "must be lowercase words separated by dashes")
            .max_len("slug", &self.slug, 120)
            .max_len("description", &self.description, 10_000)
            .range("price", self.price, Some(Decimal::new(1, 2)), Some(Decimal::new(99_999_999, 2)))
            .range("stock", self.stock, Some(0), None);
        if let Some(compare_at) = self.compare_at_price {
            v.check(
                "compare_at_price",
                compare_at > self.price,
                "must be higher than the price",
            );
        }
        v.finish()
    }
}

/// Product list filters shared by the storefront and admin tables.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Search over name and description.
    pub q: Option<String>,
    /// Category slug.
    pub category: Option<String>,
    pub status: Option<ProductStatus>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Only products with `stock <= low_stock`.
    pub low_stock: Option<i32>,
    pub featured: Option<bool>,
}

/// Product sort column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Newest,
    Price,
    Name,
    Stock,
    Popular,
}

/// Sort column plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProductOrder {
    pub sort: ProductSort,
    pub direction: SortDirection,
}

impl ProductOrder {
    /// Parse `sort` and `dir` query parameters.
    ///
    /// The storefront sends combined values (`price_asc`, `price_desc`);
    /// the admin tables send a column name plus `dir`. Unknown values fall
    /// back to newest first.
    #[must_use]
    pub fn parse(sort: Option<&str>, dir: Option<&str>) -> Self {
        let sort = sort.map(str::trim).unwrap_or_default().to_ascii_lowercase();
        let (column, implied) = match sort.as_str() {
            "price_asc" => (ProductSort::Price, Some(SortDirection::Asc)),
            "price_desc" => (ProductSort::Price, Some(SortDirection::Desc)),
            "price" => (ProductSort::Price, None),
            "name" => (ProductSort::Name, None),
            "stock" => (ProductSort::Stock, None),
            "popular" | "sales" => (ProductSort::Popular, None),
            _ => (ProductSort::Newest, None),
        };
        let default_direction = match column {
            ProductSort::Name | ProductSort::Stock => SortDirection::Asc,
            _ => SortDirection::Desc,
        };
        let direction = implied
            .or_else(|| dir.and_then(|d| d.parse().ok()))
            .unwrap_or(default_direction);
        Self {
            sort: column,
            direction,
        }
    }

    /// `ORDER BY` clause body. Ties break on ID so pages are stable.
    #[must_use]
    pub fn sql(self) -> String {
        let column = match self.sort {
            ProductSort::Newest => "p.created_at",
            ProductSort::Price => "p.price",
            ProductSort::Name => "LOWER(p.name)",
            ProductSort::Stock => "p.stock",
            ProductSort::Popular => "p.sales_count",
        };
        let dir = self.direction.as_sql();
        format!("{column} {dir}, p.id {dir}")
    }
}
