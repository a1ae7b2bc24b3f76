//! Money rounding.
//!
//! All money in the store is GBP and stored as `NUMERIC(10, 2)`. Arithmetic
//! happens on [`Decimal`] and is rounded with [`round_money`] wherever a
//! value is persisted or shown to a customer.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount to pence, half away from zero. The result always
/// carries two decimal places, so `5` becomes `5.00`.
///
/// ```
/// use mistore_core::round_money;
/// use rust_decimal::Decimal;
///
/// assert_eq!(round_money(Decimal::new(12345, 3)), Decimal::new(1235, 2));
/// ```
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}
