//! Netting sets.

use std::collections::HashSet;

use gpxva_models::market::MarketModel;
use gpxva_models::swap::InterestRateSwap;
use serde::{Deserialize, Serialize};

use crate::error::{ExposureError, ExposureResult};

/// Swaps with one counterparty whose values net on default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Portfolio {
    /// Counterparty name.
    pub counterparty: String,
    /// Swaps in the netting set.
    #[serde(default)]
    pub swaps: Vec<InterestRateSwap>,
}

impl Portfolio {
    /// Creates a netting set.
    pub fn new(counterparty: impl Into<String>, swaps: Vec<InterestRateSwap>) -> Self {
        Self {
            counterparty: counterparty.into(),
            swaps,
        }
    }

    /// Number of swaps.
    pub fn len(&self) -> usize {
        self.swaps.len()
    }

    /// Whether the netting set is empty.
    pub fn is_empty(&self) -> bool {
        self.swaps.is_empty()
    }

    /// Latest maturity, or zero for an empty set.
    pub fn horizon(&self) -> f64 {
        self.swaps
            .iter()
            .map(InterestRateSwap::maturity)
            .fold(0.0, f64::max)
    }

    /// Checks the swaps against a market model.
    ///
    /// Every swap must be valid, ids must be unique, and every currency
    /// needs a rate factor (plus an FX factor when foreign).
    pub fn validate(&self, market: &MarketModel) -> ExposureResult<()> {
        if self.swaps.is_empty() {
            return Err(ExposureError::invalid_portfolio(format!(
                "netting set '{}' has no swaps",
                self.counterparty
            )));
        }
        let mut ids = HashSet::new();
        for swap in &self.swaps {
            swap.validate()?;
            if !ids.insert(swap.id()) {
                return Err(ExposureError::invalid_portfolio(format!(
                    "duplicate swap id '{}'",
                    swap.id()
                )));
            }
            market.instrument_factors(swap.currency())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gpxva_core::Currency;
    use gpxva_models::curve::ZeroCurve;
    use gpxva_models::hull_white::HullWhite;
    use gpxva_models::market::RateFactor;
    use nalgebra::DMatrix;

    fn usd_market() -> MarketModel {
        let hw = HullWhite::new(0.05, 0.01, ZeroCurve::flat(0.03).unwrap()).unwrap();
        MarketModel::new(
            Currency::USD,
            vec![RateFactor::new(Currency::USD, hw)],
            vec![],
            DMatrix::identity(1, 1),
        )
        .unwrap()
    }

    fn swap(id: &str, ccy: Currency, maturity: f64) -> InterestRateSwap {
        InterestRateSwap::builder()
            .id(id)
            .currency(ccy)
            .notional(1e6)
            .maturity(maturity)
            .fixed_rate(0.03)
            .build()
            .unwrap()
    }

    #[test]
    fn test_horizon() {
        let p = Portfolio::new(
            "CP",
            vec![swap("A", Currency::USD, 3.0), swap("B", Currency::USD, 7.5)],
        );
        assert_relative_eq!(p.horizon(), 7.5);
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_validate() {
        let m = usd_market();
        let ok = Portfolio::new("CP", vec![swap("A", Currency::USD, 3.0)]);
        assert!(ok.validate(&m).is_ok());

        let dup = Portfolio::new(
            "CP",
            vec![swap("A", Currency::USD, 3.0), swap("A", Currency::USD, 5.0)],
        );
        assert!(matches!(
            dup.validate(&m),
            Err(ExposureError::InvalidPortfolio { .. })
        ));

        let foreign = Portfolio::new("CP", vec![swap("E", Currency::EUR, 3.0)]);
        assert!(matches!(foreign.validate(&m), Err(ExposureError::Model(_))));

        assert!(Portfolio::new("CP", vec![]).validate(&m).is_err());
    }
}
