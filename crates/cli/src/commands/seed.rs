//! Seed the catalog from a YAML file.
//!
//! Categories, products, home sections and coupons are created in that
//! order so later entries can refer to earlier ones by slug. Entries whose
//! slug, code or title already exists are skipped, so the command can be
//! re-run after editing the file.
//!
//! ```yaml
//! categories:
//!   - { name: Phones, slug: phones }
//! products:
//!   - { name: Redmi Note 13, slug: redmi-note-13, category: phones, price: "199.99", stock: 40 }
//! home_sections:
//!   - { kind: product_grid, title: Best sellers, products: [redmi-note-13] }
//! coupons:
//!   - { code: WELCOME10, coupon_type: percentage, value: "10" }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use mistore_core::validation::FieldErrors;
use mistore_core::{CategoryId, ProductId};
use mistore_db::models::{CategoryInput, CouponInput, HomeSectionInput, ProductInput};
use mistore_db::{
    CategoryRepository, CouponRepository, HomeSectionRepository, ProductRepository,
    RepositoryError,
};

use super::ConnectError;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Could not read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{entry}: {errors}")]
    Invalid { entry: String, errors: FieldErrors },

    #[error("{entry}: unknown {kind} slug '{slug}'")]
    UnknownSlug {
        entry: String,
        kind: &'static str,
        slug: String,
    },

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// The seed file.
#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<CategoryInput>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
    #[serde(default)]
    pub home_sections: Vec<SeedHomeSection>,
    #[serde(default)]
    pub coupons: Vec<CouponInput>,
}

/// A product with its category given by slug.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(flatten)]
    pub input: ProductInput,
}

/// A home section with products and category given by slug.
#[derive(Debug, Deserialize)]
pub struct SeedHomeSection {
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(flatten)]
    pub input: HomeSectionInput,
}

/// What a run created and skipped.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

impl SeedFile {
    /// Parse and validate everything that can be checked without a database.
    pub fn parse(content: &str) -> Result<Self, SeedError> {
        let file: Self = serde_yaml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    fn validate(&self) -> Result<(), SeedError> {
        let invalid = |entry: String| move |errors: FieldErrors| SeedError::Invalid { entry, errors };

        for category in &self.categories {
            category
                .validate()
                .map_err(invalid(format!("category {}", category.slug)))?;
        }
        for product in &self.products {
            product
                .input
                .validate()
                .map_err(invalid(format!("product {}", product.input.slug)))?;
        }
        for coupon in &self.coupons {
            coupon
                .validate(0)
                .map_err(invalid(format!("coupon {}", coupon.code)))?;
        }
        Ok(())
    }
}

/// Load and apply a seed file.
pub async fn from_file(file_path: &str) -> Result<SeedReport, SeedError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(SeedError::NotFound(file_path.to_owned()));
    }

    tracing::info!(path = %file_path, "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    let file = SeedFile::parse(&content)?;
    tracing::info!(
        categories = file.categories.len(),
        products = file.products.len(),
        home_sections = file.home_sections.len(),
        coupons = file.coupons.len(),
        "Parsed seed file"
    );

    let pool = super::connect().await?;
    let report = apply(&pool, file).await?;

    tracing::info!("Seeding complete!");
    tracing::info!("  Created: {}", report.created);
    tracing::info!("  Skipped (already exist): {}", report.skipped);
    Ok(report)
}

async fn apply(pool: &PgPool, file: SeedFile) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    let categories = CategoryRepository::new(pool);
    let mut category_ids: HashMap<String, CategoryId> = HashMap::new();
    for input in file.categories {
        let category = if let Some(existing) = categories.get_by_slug(&input.slug).await? {
            report.skipped += 1;
            existing
        } else {
            report.created += 1;
            categories.create(&input).await?
        };
        category_ids.insert(category.slug, category.id);
    }

    let products = ProductRepository::new(pool);
    let mut product_ids: HashMap<String, ProductId> = HashMap::new();
    for SeedProduct {
        category,
        mut input,
    } in file.products
    {
        if let Some(slug) = category {
            input.category_id =
                Some(lookup(&category_ids, &slug, "category", &input.slug, pool).await?);
        }
        let product = if let Some(existing) = products.get_by_slug(&input.slug).await? {
            report.skipped += 1;
            existing
        } else {
            report.created += 1;
            products.create(&input).await?
        };
        product_ids.insert(product.slug, product.id);
    }

    let sections = HomeSectionRepository::new(pool);
    let existing_titles: Vec<String> = sections
        .list(false)
        .await?
        .into_iter()
        .map(|s| s.title)
        .collect();
    for SeedHomeSection {
        products: product_slugs,
        category,
        mut input,
    } in file.home_sections
    {
        if existing_titles.contains(&input.title) {
            report.skipped += 1;
            continue;
        }
        let entry = format!("home section {}", input.title);
        for slug in &product_slugs {
            let id = product_ids
                .get(slug)
                .copied()
                .ok_or_else(|| unknown(&entry, "product", slug))?;
            input.product_ids.push(id);
        }
        if let Some(slug) = category {
            input.category_id = Some(lookup(&category_ids, &slug, "category", &entry, pool).await?);
        }
        input
            .validate()
            .map_err(|errors| SeedError::Invalid { entry, errors })?;
        sections.create(&input).await?;
        report.created += 1;
    }

    let coupons = CouponRepository::new(pool);
    for input in file.coupons {
        if coupons.get_by_code(&input.normalized_code()).await?.is_some() {
            report.skipped += 1;
            continue;
        }
        coupons.create(&input).await?;
        report.created += 1;
    }

    Ok(report)
}

/// Resolve a category slug from this run, falling back to the database.
async fn lookup(
    seeded: &HashMap<String, CategoryId>,
    slug: &str,
    kind: &'static str,
    entry: &str,
    pool: &PgPool,
) -> Result<CategoryId, SeedError> {
    if let Some(id) = seeded.get(slug) {
        return Ok(*id);
    }
    CategoryRepository::new(pool)
        .get_by_slug(slug)
        .await?
        .map(|c| c.id)
        .ok_or_else(|| unknown(entry, kind, slug))
}

fn unknown(entry: &str, kind: &'static str, slug: &str) -> SeedError {
    SeedError::UnknownSlug {
        entry: entry.to_owned(),
        kind,
        slug: slug.to_owned(),
    }
}
