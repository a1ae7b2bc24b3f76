//! Cart lines.

use rust_decimal::Decimal;
use serde::Serialize;

use mistore_core::pricing::LineAmount;
use mistore_core::{ProductId, ProductStatus, round_money};

/// One product in a user's cart, joined with its current catalog data.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    /// Current stock, so the client can cap its quantity picker.
    pub stock: i32,
    pub status: ProductStatus,
}

impl CartLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        round_money(self.amount().total())
    }

    #[must_use]
    pub const fn amount(&self) -> LineAmount {
        LineAmount {
            unit_price: self.unit_price,
            quantity: self.quantity,
        }
    }

    /// Why this line cannot be checked out, if anything.
    #[must_use]
    pub fn problem(&self) -> Option<String> {
        if self.status != ProductStatus::Active {
            Some(format!("{} is no longer available", self.name))
        } else if self.stock < self.quantity {
            Some(format!("only {} left of {}", self.stock, self.name))
        } else {
            None
        }
    }
}
