//! Fixed-for-floating interest rate swaps.

use std::fmt;

use gpxva_core::{Currency, Frequency};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::hull_white::HullWhite;

/// Payment times closer than this to zero are dropped from the schedule.
const SCHEDULE_TOLERANCE: f64 = 1e-9;

/// Which side of the fixed leg the holder is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapDirection {
    /// Pay fixed, receive floating.
    #[default]
    Payer,
    /// Receive fixed, pay floating.
    Receiver,
}

impl SwapDirection {
    /// `+1` for payer, `−1` for receiver.
    pub fn sign(self) -> f64 {
        match self {
            SwapDirection::Payer => 1.0,
            SwapDirection::Receiver => -1.0,
        }
    }
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapDirection::Payer => write!(f, "payer"),
            SwapDirection::Receiver => write!(f, "receiver"),
        }
    }
}

/// A vanilla swap starting today, exchanging a fixed rate against the
/// floating rate of its currency.
///
/// Times are year fractions from the valuation date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestRateSwap {
    id: String,
    currency: Currency,
    notional: f64,
    fixed_rate: f64,
    maturity: f64,
    #[serde(default)]
    frequency: Frequency,
    #[serde(default)]
    direction: SwapDirection,
}

impl InterestRateSwap {
    /// Returns a builder.
    pub fn builder() -> SwapBuilder {
        SwapBuilder::default()
    }

    /// Instrument identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Currency of both legs.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Notional in swap currency.
    pub fn notional(&self) -> f64 {
        self.notional
    }

    /// Fixed coupon rate.
    pub fn fixed_rate(&self) -> f64 {
        self.fixed_rate
    }

    /// Final payment time.
    pub fn maturity(&self) -> f64 {
        self.maturity
    }

    /// Fixed leg payment frequency.
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Payer or receiver.
    pub fn direction(&self) -> SwapDirection {
        self.direction
    }

    /// Checks the terms. Deserialized swaps bypass the builder, so callers
    /// loading them should run this.
    pub fn validate(&self) -> ModelResult<()> {
        if self.id.trim().is_empty() {
            return Err(ModelError::invalid_instrument(&self.id, "id must not be empty"));
        }
        if !self.notional.is_finite() || self.notional <= 0.0 {
            return Err(ModelError::invalid_instrument(
                &self.id,
                format!("notional must be positive, got {}", self.notional),
            ));
        }
        if !self.maturity.is_finite() || self.maturity <= 0.0 {
            return Err(ModelError::invalid_instrument(
                &self.id,
                format!("maturity must be positive, got {}", self.maturity),
            ));
        }
        if !self.fixed_rate.is_finite() {
            return Err(ModelError::invalid_instrument(&self.id, "fixed rate must be finite"));
        }
        Ok(())
    }

    /// Whether any cash flow remains after `t`.
    pub fn is_alive(&self, t: f64) -> bool {
        t < self.maturity
    }

    /// Fixed leg payment times, ascending. Counted back from maturity so
    /// that any stub period comes first.
    pub fn payment_times(&self) -> Vec<f64> {
        let period = self.frequency.period_years();
        let mut times = Vec::new();
        let mut k = 0u32;
        loop {
            let t = self.maturity - f64::from(k) * period;
            if t <= SCHEDULE_TOLERANCE {
                break;
            }
            times.push(t);
            k += 1;
        }
        times.reverse();
        times
    }

    /// `(accrual fraction, payment time)` pairs for payments after `t`.
    fn remaining_accruals(&self, t: f64) -> Vec<(f64, f64)> {
        let times = self.payment_times();
        let mut prev = 0.0;
        let mut out = Vec::with_capacity(times.len());
        for pay in times {
            if pay > t {
                out.push((pay - prev, pay));
            }
            prev = pay;
        }
        out
    }

    /// Value at time `t` in swap currency given the short rate `r(t)`.
    ///
    /// The floating leg is valued as if reset at `t`, so it is worth
    /// `1 − P(t, T_n)` per unit notional.
    pub fn mtm(&self, t: f64, short_rate: f64, model: &HullWhite) -> f64 {
        if !self.is_alive(t) {
            return 0.0;
        }
        let floating = 1.0 - model.zcb_price(t, self.maturity, short_rate);
        let annuity: f64 = self
            .remaining_accruals(t)
            .iter()
            .map(|&(tau, pay)| tau * model.zcb_price(t, pay, short_rate))
            .sum();
        self.direction.sign() * self.notional * (floating - self.fixed_rate * annuity)
    }

    /// Fixed rate that sets the value at inception to zero.
    pub fn par_rate(&self, model: &HullWhite) -> f64 {
        let r0 = model.short_rate(0.0, 0.0);
        let annuity: f64 = self
            .remaining_accruals(0.0)
            .iter()
            .map(|&(tau, pay)| tau * model.zcb_price(0.0, pay, r0))
            .sum();
        if annuity <= 0.0 {
            return 0.0;
        }
        (1.0 - model.zcb_price(0.0, self.maturity, r0)) / annuity
    }
}

/// Builder for [`InterestRateSwap`].
#[derive(Debug, Clone, Default)]
pub struct SwapBuilder {
    id: Option<String>,
    currency: Option<Currency>,
    notional: Option<f64>,
    fixed_rate: Option<f64>,
    maturity: Option<f64>,
    frequency: Option<Frequency>,
    direction: Option<SwapDirection>,
}

impl SwapBuilder {
    /// Sets the identifier.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the currency.
    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    /// Sets the notional.
    #[must_use]
    pub fn notional(mut self, notional: f64) -> Self {
        self.notional = Some(notional);
        self
    }

    /// Sets the fixed rate.
    #[must_use]
    pub fn fixed_rate(mut self, rate: f64) -> Self {
        self.fixed_rate = Some(rate);
        self
    }

    /// Sets the maturity in years.
    #[must_use]
    pub fn maturity(mut self, years: f64) -> Self {
        self.maturity = Some(years);
        self
    }

    /// Sets the fixed leg frequency.
    #[must_use]
    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// Sets the direction.
    #[must_use]
    pub fn direction(mut self, direction: SwapDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Builds and validates the swap.
    pub fn build(self) -> ModelResult<InterestRateSwap> {
        let id = self.id.unwrap_or_default();
        let missing = |field: &str| ModelError::invalid_instrument(&id, format!("{field} is required"));
        let swap = InterestRateSwap {
            currency: self.currency.ok_or_else(|| missing("currency"))?,
            notional: self.notional.ok_or_else(|| missing("notional"))?,
            fixed_rate: self.fixed_rate.ok_or_else(|| missing("fixed_rate"))?,
            maturity: self.maturity.ok_or_else(|| missing("maturity"))?,
            frequency: self.frequency.unwrap_or_default(),
            direction: self.direction.unwrap_or_default(),
            id,
        };
        swap.validate()?;
        Ok(swap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::ZeroCurve;
    use approx::assert_relative_eq;

    fn model() -> HullWhite {
        HullWhite::new(0.05, 0.01, ZeroCurve::flat(0.03).unwrap()).unwrap()
    }

    fn swap(maturity: f64, rate: f64, direction: SwapDirection) -> InterestRateSwap {
        InterestRateSwap::builder()
            .id("S1")
            .currency(Currency::USD)
            .notional(1_000_000.0)
            .maturity(maturity)
            .fixed_rate(rate)
            .direction(direction)
            .build()
            .unwrap()
    }

    #[test]
    fn test_payment_schedule() {
        let s = swap(2.0, 0.03, SwapDirection::Payer);
        assert_eq!(s.payment_times(), vec![0.5, 1.0, 1.5, 2.0]);

        let stub = swap(1.25, 0.03, SwapDirection::Payer);
        let times = stub.payment_times();
        assert_eq!(times.len(), 3);
        assert_relative_eq!(times[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(times[2], 1.25);
    }

    #[test]
    fn test_par_swap_has_zero_value() {
        let hw = model();
        let unit = swap(5.0, 0.0, SwapDirection::Payer);
        let par = unit.par_rate(&hw);
        let expected = 2.0 * ((0.015f64).exp() - 1.0);
        assert_relative_eq!(par, expected, epsilon = 1e-10);

        let at_par = swap(5.0, par, SwapDirection::Payer);
        let r0 = hw.short_rate(0.0, 0.0);
        assert_relative_eq!(at_par.mtm(0.0, r0, &hw), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_payer_gains_when_rates_rise() {
        let hw = model();
        let s = swap(5.0, 0.03, SwapDirection::Payer);
        assert!(s.mtm(1.0, 0.05, &hw) > s.mtm(1.0, 0.01, &hw));
    }

    #[test]
    fn test_receiver_mirrors_payer() {
        let hw = model();
        let p = swap(5.0, 0.025, SwapDirection::Payer);
        let r = swap(5.0, 0.025, SwapDirection::Receiver);
        assert_relative_eq!(p.mtm(2.3, 0.04, &hw), -r.mtm(2.3, 0.04, &hw), epsilon = 1e-9);
    }

    #[test]
    fn test_value_after_maturity() {
        let hw = model();
        let s = swap(2.0, 0.03, SwapDirection::Payer);
        assert!(!s.is_alive(2.0));
        assert_relative_eq!(s.mtm(2.0, 0.03, &hw), 0.0);
        assert_relative_eq!(s.mtm(3.0, 0.03, &hw), 0.0);
    }

    #[test]
    fn test_builder_validation() {
        assert!(InterestRateSwap::builder().id("X").build().is_err());
        let bad = InterestRateSwap::builder()
            .id("X")
            .currency(Currency::EUR)
            .notional(-1.0)
            .maturity(1.0)
            .fixed_rate(0.01)
            .build();
        assert!(bad.is_err());
    }

    #[test]
    fn test_serde_defaults() {
        let json = r#"{"id":"E5","currency":"EUR","notional":1e6,"fixed_rate":0.02,"maturity":5.0}"#;
        let s: InterestRateSwap = serde_json::from_str(json).unwrap();
        assert_eq!(s.frequency(), Frequency::SemiAnnual);
        assert_eq!(s.direction(), SwapDirection::Payer);
        assert!(s.validate().is_ok());
    }
}
