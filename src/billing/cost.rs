use serde::Serialize;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

use super::{UsageTotals, FALLBACK_UNIT_PRICE};
use crate::domain::{round2, ConsumptionEntry, UtilityType};

/// Where a unit price came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceSource {
    /// Latest tariff of the resident's active contract
    Tariff { service_id: i64 },
    /// No active contract, or a contract whose service has no tariff
    Fallback,
}

/// Per-utility prices resolved for one resident. Utilities without an entry,
/// or with `None`, are billed at the fallback price.
#[derive(Debug, Clone, Default)]
pub struct PriceSheet {
    prices: BTreeMap<UtilityType, (i64, f64)>,
}

impl PriceSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the contracted service and its latest price; `None` keeps the
    /// utility on the fallback
    pub fn set(&mut self, utility: UtilityType, service_id: i64, price: Option<f64>) {
        match price {
            Some(p) => {
                self.prices.insert(utility, (service_id, p));
            }
            None => {
                self.prices.remove(&utility);
            }
        }
    }

    pub fn with(mut self, utility: UtilityType, service_id: i64, price: f64) -> Self {
        self.set(utility, service_id, Some(price));
        self
    }

    /// Price for `utility` with the given fallback applied
    pub fn resolve(&self, utility: UtilityType, fallback: f64) -> (f64, PriceSource) {
        match self.prices.get(&utility) {
            Some(&(service_id, price)) => (price, PriceSource::Tariff { service_id }),
            None => (fallback, PriceSource::Fallback),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostLine {
    pub usage: UsageTotals,
    /// Consumption that was priced (net for electricity)
    pub billable: f64,
    pub unit_price: f64,
    pub price_source: PriceSource,
    /// `round(billable * unit_price, 2)`
    pub cost: f64,
}

/// Cost of one period, one line per utility
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub lines: BTreeMap<UtilityType, CostLine>,
}

impl CostBreakdown {
    pub fn cost(&self, utility: UtilityType) -> f64 {
        self.lines.get(&utility).map(|l| l.cost).unwrap_or(0.0)
    }

    pub fn costs(&self) -> BTreeMap<UtilityType, f64> {
        self.lines.iter().map(|(u, l)| (*u, l.cost)).collect()
    }

    pub fn total(&self) -> f64 {
        round2(self.lines.values().map(|l| l.cost).sum())
    }

    pub fn billable(&self, utility: UtilityType) -> f64 {
        self.lines.get(&utility).map(|l| l.billable).unwrap_or(0.0)
    }
}

/// Turns period-scoped consumption into money
#[derive(Debug, Clone, Copy)]
pub struct CostCalculator {
    fallback_price: f64,
}

impl Default for CostCalculator {
    fn default() -> Self {
        Self {
            fallback_price: FALLBACK_UNIT_PRICE,
        }
    }
}

impl CostCalculator {
    pub fn new(fallback_price: f64) -> Self {
        Self { fallback_price }
    }

    pub fn fallback_price(&self) -> f64 {
        self.fallback_price
    }

    /// `entries` must already be scoped to one resident and one period
    pub fn compute(&self, entries: &[ConsumptionEntry], prices: &PriceSheet) -> CostBreakdown {
        let lines = UtilityType::iter()
            .map(|utility| {
                let usage = UsageTotals::collect(entries, utility);
                let billable = usage.billable(utility);
                let (unit_price, price_source) = prices.resolve(utility, self.fallback_price);
                let line = CostLine {
                    usage,
                    billable,
                    unit_price,
                    price_source,
                    cost: round2(billable * unit_price),
                };
                (utility, line)
            })
            .collect();
        CostBreakdown { lines }
    }
}

/// Cost per utility for a period-scoped record set
pub fn compute_costs(
    calculator: &CostCalculator,
    entries: &[ConsumptionEntry],
    prices: &PriceSheet,
) -> BTreeMap<UtilityType, f64> {
    calculator.compute(entries, prices).costs()
}
