//! The joint multi-currency market model.
//!
//! State vectors hold one short rate per currency, domestic first, followed
//! by one FX spot per foreign currency. The correlated Brownian drivers use
//! the same ordering, so coordinate `i` of the state is driven by driver `i`.

use std::collections::HashSet;

use gpxva_core::Currency;
use gpxva_math::linear_algebra::correlation_cholesky;
use nalgebra::DMatrix;

use crate::curve::ZeroCurve;
use crate::error::{ModelError, ModelResult};
use crate::fx::FxModel;
use crate::hull_white::HullWhite;
use crate::swap::InterestRateSwap;

/// Short-rate model of one currency.
#[derive(Debug, Clone)]
pub struct RateFactor {
    /// Currency of the rate.
    pub currency: Currency,
    /// Hull-White dynamics, fitted to the currency's zero curve.
    pub hull_white: HullWhite,
}

impl RateFactor {
    /// Creates a rate factor.
    pub fn new(currency: Currency, hull_white: HullWhite) -> Self {
        Self {
            currency,
            hull_white,
        }
    }

    /// Initial zero curve.
    pub fn curve(&self) -> &ZeroCurve {
        self.hull_white.curve()
    }
}

/// FX spot of one foreign currency against the domestic currency.
#[derive(Debug, Clone)]
pub struct FxFactor {
    /// Foreign currency.
    pub currency: Currency,
    /// Spot dynamics.
    pub model: FxModel,
}

impl FxFactor {
    /// Creates an FX factor.
    pub fn new(currency: Currency, model: FxModel) -> Self {
        Self { currency, model }
    }
}

/// Names and positions of the coordinates in a market state vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorLayout {
    rates: Vec<Currency>,
    fxs: Vec<Currency>,
    names: Vec<String>,
}

impl FactorLayout {
    fn new(rates: Vec<Currency>, fxs: Vec<Currency>) -> Self {
        let names = rates
            .iter()
            .map(|c| format!("r_{}", c.code()))
            .chain(fxs.iter().map(|c| format!("fx_{}", c.code())))
            .collect();
        Self { rates, fxs, names }
    }

    /// Position of the short rate of `currency`.
    pub fn rate_index(&self, currency: Currency) -> Option<usize> {
        self.rates.iter().position(|&c| c == currency)
    }

    /// Position of the FX spot of `currency`.
    pub fn fx_index(&self, currency: Currency) -> Option<usize> {
        self.fxs
            .iter()
            .position(|&c| c == currency)
            .map(|i| self.rates.len() + i)
    }

    /// Position of a coordinate by name, e.g. `"fx_EUR"`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Coordinate names in state order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of coordinates.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the layout has no coordinates.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Correlated Hull-White rates plus lognormal FX, simulated under the
/// domestic risk-neutral measure.
#[derive(Debug, Clone)]
pub struct MarketModel {
    domestic: Currency,
    rates: Vec<RateFactor>,
    fxs: Vec<FxFactor>,
    correlation: DMatrix<f64>,
    cholesky: DMatrix<f64>,
    layout: FactorLayout,
}

impl MarketModel {
    /// Creates a market model.
    ///
    /// `rates` must start with the domestic currency. Every foreign rate
    /// needs exactly one FX factor. `correlation` is over the drivers in
    /// state order `[rates..., fxs...]`.
    pub fn new(
        domestic: Currency,
        rates: Vec<RateFactor>,
        fxs: Vec<FxFactor>,
        correlation: DMatrix<f64>,
    ) -> ModelResult<Self> {
        match rates.first() {
            Some(first) if first.currency == domestic => {}
            _ => {
                return Err(ModelError::invalid_parameter(
                    "rates",
                    format!("the first rate factor must be the domestic currency {domestic}"),
                ))
            }
        }

        let mut seen = HashSet::new();
        for rate in &rates {
            if !seen.insert(rate.currency) {
                return Err(ModelError::invalid_parameter(
                    "rates",
                    format!("duplicate rate factor for {}", rate.currency),
                ));
            }
        }

        let mut fx_seen = HashSet::new();
        for fx in &fxs {
            if fx.currency == domestic {
                return Err(ModelError::invalid_parameter(
                    "fx",
                    format!("FX factor for the domestic currency {domestic}"),
                ));
            }
            if !seen.contains(&fx.currency) {
                return Err(ModelError::MissingFactor {
                    currency: fx.currency,
                    kind: "rate",
                });
            }
            if !fx_seen.insert(fx.currency) {
                return Err(ModelError::invalid_parameter(
                    "fx",
                    format!("duplicate FX factor for {}", fx.currency),
                ));
            }
        }
        if let Some(rate) = rates.iter().skip(1).find(|r| !fx_seen.contains(&r.currency)) {
            return Err(ModelError::MissingFactor {
                currency: rate.currency,
                kind: "fx",
            });
        }

        let n = rates.len() + fxs.len();
        if correlation.nrows() != n || correlation.ncols() != n {
            return Err(ModelError::invalid_parameter(
                "correlation",
                format!(
                    "expected {n}x{n}, got {}x{}",
                    correlation.nrows(),
                    correlation.ncols()
                ),
            ));
        }
        let cholesky = correlation_cholesky(&correlation)?;

        let layout = FactorLayout::new(
            rates.iter().map(|r| r.currency).collect(),
            fxs.iter().map(|f| f.currency).collect(),
        );
        Ok(Self {
            domestic,
            rates,
            fxs,
            correlation,
            cholesky,
            layout,
        })
    }

    /// Domestic (reporting) currency.
    pub fn domestic(&self) -> Currency {
        self.domestic
    }

    /// Rate factors in state order.
    pub fn rate_factors(&self) -> &[RateFactor] {
        &self.rates
    }

    /// FX factors in state order.
    pub fn fx_factors(&self) -> &[FxFactor] {
        &self.fxs
    }

    /// Driver correlation matrix.
    pub fn correlation(&self) -> &DMatrix<f64> {
        &self.correlation
    }

    /// Lower Cholesky factor of the correlation matrix.
    pub fn cholesky(&self) -> &DMatrix<f64> {
        &self.cholesky
    }

    /// State vector layout.
    pub fn layout(&self) -> &FactorLayout {
        &self.layout
    }

    /// Rate model of `currency`.
    pub fn rate_factor(&self, currency: Currency) -> ModelResult<&RateFactor> {
        self.rates
            .iter()
            .find(|r| r.currency == currency)
            .ok_or(ModelError::MissingFactor {
                currency,
                kind: "rate",
            })
    }

    /// FX model of `currency`.
    pub fn fx_factor(&self, currency: Currency) -> ModelResult<&FxFactor> {
        self.fxs
            .iter()
            .find(|f| f.currency == currency)
            .ok_or(ModelError::MissingFactor {
                currency,
                kind: "fx",
            })
    }

    /// State at time zero: initial short rates, then spots.
    pub fn initial_state(&self) -> Vec<f64> {
        self.rates
            .iter()
            .map(|r| r.hull_white.short_rate(0.0, 0.0))
            .chain(self.fxs.iter().map(|f| f.model.spot))
            .collect()
    }

    /// Quanto adjustment on the OU drift of rate factor `rate_pos`
    /// (a position in [`Self::rate_factors`]): `−ρ σ_r σ_fx` for foreign
    /// rates, zero for the domestic rate.
    pub fn quanto_drift(&self, rate_pos: usize) -> f64 {
        if rate_pos == 0 || rate_pos >= self.rates.len() {
            return 0.0;
        }
        let rate = &self.rates[rate_pos];
        let Some(fx_pos) = self.layout.fx_index(rate.currency) else {
            return 0.0;
        };
        let fx = &self.fxs[fx_pos - self.rates.len()];
        -self.correlation[(rate_pos, fx_pos)]
            * rate.hull_white.volatility()
            * fx.model.volatility
    }

    /// State coordinates a swap in `currency` depends on: `[r]` for the
    /// domestic currency, `[r_f, fx_f]` otherwise.
    pub fn instrument_factors(&self, currency: Currency) -> ModelResult<Vec<usize>> {
        let rate = self.layout.rate_index(currency).ok_or(ModelError::MissingFactor {
            currency,
            kind: "rate",
        })?;
        if currency == self.domestic {
            return Ok(vec![rate]);
        }
        let fx = self.layout.fx_index(currency).ok_or(ModelError::MissingFactor {
            currency,
            kind: "fx",
        })?;
        Ok(vec![rate, fx])
    }

    /// Swap value in domestic currency from its own factors, ordered as
    /// returned by [`Self::instrument_factors`].
    pub fn value_from_factors(
        &self,
        swap: &InterestRateSwap,
        t: f64,
        factors: &[f64],
    ) -> ModelResult<f64> {
        let expected = if swap.currency() == self.domestic { 1 } else { 2 };
        if factors.len() != expected {
            return Err(ModelError::invalid_parameter(
                "factors",
                format!(
                    "swap '{}' needs {expected} factors, got {}",
                    swap.id(),
                    factors.len()
                ),
            ));
        }
        let hw = &self.rate_factor(swap.currency())?.hull_white;
        let local = swap.mtm(t, factors[0], hw);
        Ok(if expected == 2 { local * factors[1] } else { local })
    }

    /// Swap value in domestic currency from a full state vector.
    pub fn value_in_domestic(
        &self,
        swap: &InterestRateSwap,
        t: f64,
        state: &[f64],
    ) -> ModelResult<f64> {
        if state.len() != self.layout.len() {
            return Err(ModelError::invalid_parameter(
                "state",
                format!("expected {} coordinates, got {}", self.layout.len(), state.len()),
            ));
        }
        let factors: Vec<f64> = self
            .instrument_factors(swap.currency())?
            .into_iter()
            .map(|i| state[i])
            .collect();
        self.value_from_factors(swap, t, &factors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hw(rate: f64) -> HullWhite {
        HullWhite::new(0.05, 0.01, ZeroCurve::flat(rate).unwrap()).unwrap()
    }

    fn two_currency(rho_r_fx: f64) -> MarketModel {
        let corr = DMatrix::from_row_slice(
            3,
            3,
            &[1.0, 0.3, 0.0, 0.3, 1.0, rho_r_fx, 0.0, rho_r_fx, 1.0],
        );
        MarketModel::new(
            Currency::USD,
            vec![
                RateFactor::new(Currency::USD, hw(0.03)),
                RateFactor::new(Currency::EUR, hw(0.02)),
            ],
            vec![FxFactor::new(Currency::EUR, FxModel::new(1.1, 0.1).unwrap())],
            corr,
        )
        .unwrap()
    }

    #[test]
    fn test_layout() {
        let m = two_currency(0.2);
        let layout = m.layout();
        assert_eq!(layout.names(), &["r_USD", "r_EUR", "fx_EUR"]);
        assert_eq!(layout.rate_index(Currency::EUR), Some(1));
        assert_eq!(layout.fx_index(Currency::EUR), Some(2));
        assert_eq!(layout.fx_index(Currency::USD), None);
        assert_eq!(layout.index_of("fx_EUR"), Some(2));
        assert_eq!(m.instrument_factors(Currency::USD).unwrap(), vec![0]);
        assert_eq!(m.instrument_factors(Currency::EUR).unwrap(), vec![1, 2]);
        assert!(m.instrument_factors(Currency::GBP).is_err());
    }

    #[test]
    fn test_initial_state() {
        let m = two_currency(0.2);
        let s = m.initial_state();
        assert_relative_eq!(s[0], 0.03, epsilon = 1e-12);
        assert_relative_eq!(s[1], 0.02, epsilon = 1e-12);
        assert_relative_eq!(s[2], 1.1);
    }

    #[test]
    fn test_quanto_drift() {
        let m = two_currency(0.5);
        assert_relative_eq!(m.quanto_drift(0), 0.0);
        assert_relative_eq!(m.quanto_drift(1), -0.5 * 0.01 * 0.1, epsilon = 1e-15);
    }

    #[test]
    fn test_foreign_swap_converted() {
        let m = two_currency(0.2);
        let swap = InterestRateSwap::builder()
            .id("EUR-3Y")
            .currency(Currency::EUR)
            .notional(1e6)
            .maturity(3.0)
            .fixed_rate(0.01)
            .build()
            .unwrap();
        let state = [0.03, 0.025, 1.2];
        let local = swap.mtm(1.0, 0.025, &m.rate_factor(Currency::EUR).unwrap().hull_white);
        assert_relative_eq!(
            m.value_in_domestic(&swap, 1.0, &state).unwrap(),
            local * 1.2,
            epsilon = 1e-9
        );
        assert!(m.value_from_factors(&swap, 1.0, &[0.025]).is_err());
    }

    #[test]
    fn test_validation() {
        let one = DMatrix::identity(1, 1);
        assert!(MarketModel::new(Currency::USD, vec![], vec![], one.clone()).is_err());
        assert!(MarketModel::new(
            Currency::USD,
            vec![RateFactor::new(Currency::EUR, hw(0.02))],
            vec![],
            one.clone()
        )
        .is_err());

        // Foreign rate without FX
        let missing_fx = MarketModel::new(
            Currency::USD,
            vec![
                RateFactor::new(Currency::USD, hw(0.03)),
                RateFactor::new(Currency::EUR, hw(0.02)),
            ],
            vec![],
            DMatrix::identity(2, 2),
        );
        assert!(matches!(
            missing_fx,
            Err(ModelError::MissingFactor { kind: "fx", .. })
        ));

        // Wrong correlation size
        assert!(MarketModel::new(
            Currency::USD,
            vec![RateFactor::new(Currency::USD, hw(0.03))],
            vec![],
            DMatrix::identity(2, 2)
        )
        .is_err());
    }
}
