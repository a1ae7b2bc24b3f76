//! Lottery prize odds and selection.
//!
//! Probabilities are basis points: 10 000 bp is certainty. The odds of all
//! prizes in an activity may sum to less than 10 000; the remainder is the
//! chance of winning nothing.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::LotteryPrizeId;

/// Basis points representing a 100% chance.
pub const BASIS_POINTS: u32 = 10_000;

/// Why a set of prize odds is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OddsError {
    #[error("prize probability must be between 0 and 10000 bp, got {0}")]
    OutOfRange(i32),
    #[error("prize probabilities sum to {0} bp, more than 10000")]
    SumExceeded(i64),
}

/// Selection weight of one prize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeOdds {
    pub prize_id: LotteryPrizeId,
    pub probability_bp: i32,
    /// `None` means unlimited.
    pub stock_remaining: Option<i32>,
}

impl PrizeOdds {
    /// Whether the prize can still be won.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.probability_bp > 0 && self.stock_remaining.is_none_or(|s| s > 0)
    }
}

/// Check that every probability is in range and the total fits in 100%.
///
/// # Errors
///
/// Returns the first out-of-range probability, or the excessive sum.
pub fn validate_odds(odds: &[PrizeOdds]) -> Result<(), OddsError> {
    let mut sum: i64 = 0;
    for o in odds {
        if !(0..=10_000).contains(&o.probability_bp) {
            return Err(OddsError::OutOfRange(o.probability_bp));
        }
        sum += i64::from(o.probability_bp);
    }
    if sum > i64::from(BASIS_POINTS) {
        return Err(OddsError::SumExceeded(sum));
    }
    Ok(())
}

/// Select a prize for `roll` (in `0..10_000`).
///
/// Prizes are laid end to end in the given order, skipping unavailable ones;
/// the prize whose band contains `roll` wins. Rolls past the last band win
/// nothing. Out-of-stock prizes give their band to "nothing" rather than to
/// their neighbours, so stock running out never raises other prizes' odds.
#[must_use]
pub fn pick(odds: &[PrizeOdds], roll: u32) -> Option<LotteryPrizeId> {
    let mut upper: u32 = 0;
    for o in odds {
        let width = u32::try_from(o.probability_bp).unwrap_or(0);
        if !o.is_available() {
            continue;
        }
        upper = upper.saturating_add(width);
        if roll < upper {
            return Some(o.prize_id);
        }
    }
    None
}

/// Roll and [`pick`].
pub fn draw<R: Rng + ?Sized>(odds: &[PrizeOdds], rng: &mut R) -> Option<LotteryPrizeId> {
    pick(odds, rng.random_range(0..BASIS_POINTS))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn odds(id: i32, bp: i32, stock: Option<i32>) -> PrizeOdds {
        PrizeOdds {
            prize_id: LotteryPrizeId::new(id),
            probability_bp: bp,
            stock_remaining: stock,
        }
    }

    #[test]
    fn test_validate_odds() {
        assert!(validate_odds(&[odds(1, 5000, None), odds(2, 5000, None)]).is_ok());
        assert_eq!(
            validate_odds(&[odds(1, 6000, None), odds(2, 5000, None)]),
            Err(OddsError::SumExceeded(11_000))
        );
        assert_eq!(
            validate_odds(&[odds(1, -1, None)]),
            Err(OddsError::OutOfRange(-1))
        );
        assert!(validate_odds(&[]).is_ok());
    }

    #[test]
    fn test_pick_bands() {
        let table = [odds(1, 100, None), odds(2, 900, None)];
        assert_eq!(pick(&table, 0), Some(LotteryPrizeId::new(1)));
        assert_eq!(pick(&table, 99), Some(LotteryPrizeId::new(1)));
        assert_eq!(pick(&table, 100), Some(LotteryPrizeId::new(2)));
        assert_eq!(pick(&table, 999), Some(LotteryPrizeId::new(2)));
        assert_eq!(pick(&table, 1000), None);
    }

    #[test]
    fn test_pick_skips_out_of_stock() {
        let table = [odds(1, 5000, Some(0)), odds(2, 5000, Some(3))];
        for roll in 0..BASIS_POINTS {
            assert_ne!(pick(&table, roll), Some(LotteryPrizeId::new(1)));
        }
        assert_eq!(pick(&table, 0), Some(LotteryPrizeId::new(2)));
        assert_eq!(pick(&table, 5000), None);
    }

    #[test]
    fn test_draw_never_returns_unavailable_prize() {
        let table = [
            odds(1, 3000, Some(0)),
            odds(2, 3000, None),
            odds(3, 0, None),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..2_000 {
            let won = draw(&table, &mut rng);
            assert!(won.is_none() || won == Some(LotteryPrizeId::new(2)));
        }
    }

    #[test]
    fn test_certain_prize() {
        let table = [odds(9, 10_000, Some(1))];
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(draw(&table, &mut rng), Some(LotteryPrizeId::new(9)));
    }
}
