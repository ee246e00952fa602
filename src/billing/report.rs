use serde::Serialize;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

use super::{
    compute_costs, evaluate_alert, BudgetAlert, CostBreakdown, CostCalculator, PriceSheet,
};
use crate::domain::{
    limit_for, round2, total_limit, BudgetLimit, ConsumptionEntry, DomainError, Period,
    UtilityType,
};

/// Which report a caller asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Monthly,
    Annual,
}

impl std::str::FromStr for ReportKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Self::Monthly),
            "annual" => Ok(Self::Annual),
            other => Err(DomainError::InvalidReportKind(other.to_string())),
        }
    }
}

/// Everything the reports need, already loaded for one resident. `entries`
/// and `limits` may span more than the reported period; each report scopes
/// them itself.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub entries: &'a [ConsumptionEntry],
    pub limits: &'a [BudgetLimit],
    pub prices: &'a PriceSheet,
    pub calculator: CostCalculator,
}

impl<'a> ReportContext<'a> {
    fn scoped(&self, period: Period) -> Vec<ConsumptionEntry> {
        self.entries
            .iter()
            .filter(|e| period.contains(e.recorded_at))
            .cloned()
            .collect()
    }

    pub fn breakdown(&self, period: Period) -> CostBreakdown {
        self.calculator.compute(&self.scoped(period), self.prices)
    }

    /// Per-utility cost of one month
    pub fn costs(&self, period: Period) -> BTreeMap<UtilityType, f64> {
        compute_costs(&self.calculator, &self.scoped(period), self.prices)
    }

    fn utility_lines(&self, period: Period, breakdown: &CostBreakdown) -> Vec<UtilityReport> {
        UtilityType::iter()
            .map(|utility| {
                let cost = breakdown.cost(utility);
                let limit = limit_for(self.limits, utility, period);
                UtilityReport {
                    utility,
                    cost,
                    limit: limit.unwrap_or(0.0),
                    alert: evaluate_alert(cost, limit),
                }
            })
            .collect()
    }
}

/// Month overview: consumption, cost and the total-vs-budget alert
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub period: Period,
    /// Billed consumption per utility (net for electricity), rounded
    pub consumption: BTreeMap<UtilityType, f64>,
    pub costs: BTreeMap<UtilityType, f64>,
    pub total_cost: f64,
    /// Sum of the month's limits across utilities
    pub total_budget: f64,
    pub alert: BudgetAlert,
    pub device_count: usize,
}

pub fn dashboard(ctx: &ReportContext<'_>, period: Period, device_count: usize) -> Dashboard {
    let breakdown = ctx.breakdown(period);
    let total_cost = breakdown.total();
    let total_budget = round2(total_limit(ctx.limits, period));
    Dashboard {
        period,
        consumption: UtilityType::iter()
            .map(|u| (u, round2(breakdown.billable(u))))
            .collect(),
        costs: breakdown.costs(),
        total_cost,
        total_budget,
        alert: evaluate_alert(total_cost, Some(total_budget)),
        device_count,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UtilityReport {
    pub utility: UtilityType,
    pub cost: f64,
    pub limit: f64,
    pub alert: BudgetAlert,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub period: Period,
    pub utilities: Vec<UtilityReport>,
    pub total_cost: f64,
}

pub fn monthly_report(ctx: &ReportContext<'_>, period: Period) -> MonthlyReport {
    let breakdown = ctx.breakdown(period);
    MonthlyReport {
        period,
        utilities: ctx.utility_lines(period, &breakdown),
        total_cost: breakdown.total(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnualReport {
    pub year: i32,
    /// Only months with some cost or some limit
    pub months: Vec<MonthlyReport>,
    pub total_cost: f64,
}

pub fn annual_report(ctx: &ReportContext<'_>, year: i32) -> Result<AnnualReport, DomainError> {
    let mut months = Vec::new();
    let mut total = 0.0;
    for period in Period::months_of(year)? {
        let month = monthly_report(ctx, period);
        total += month.total_cost;
        let has_data = month
            .utilities
            .iter()
            .any(|u| u.cost > 0.0 || u.limit > 0.0);
        if has_data {
            months.push(month);
        }
    }
    Ok(AnnualReport {
        year,
        months,
        total_cost: round2(total),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Report {
    Monthly(MonthlyReport),
    Annual(AnnualReport),
}

pub fn build_report(
    ctx: &ReportContext<'_>,
    kind: ReportKind,
    period: Period,
) -> Result<Report, DomainError> {
    Ok(match kind {
        ReportKind::Monthly => Report::Monthly(monthly_report(ctx, period)),
        ReportKind::Annual => Report::Annual(annual_report(ctx, period.year())?),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthTotal {
    pub month: u32,
    pub total_cost: f64,
}

/// Twelve monthly totals of a year plus the cost split of one month
#[derive(Debug, Clone, Serialize)]
pub struct Trend {
    pub year: i32,
    pub monthly_totals: Vec<MonthTotal>,
    pub distribution: BTreeMap<UtilityType, f64>,
}

pub fn trend(ctx: &ReportContext<'_>, period: Period) -> Result<Trend, DomainError> {
    let monthly_totals = Period::months_of(period.year())?
        .into_iter()
        .map(|p| MonthTotal {
            month: p.month(),
            total_cost: ctx.breakdown(p).total(),
        })
        .collect();
    Ok(Trend {
        year: period.year(),
        monthly_totals,
        distribution: ctx.costs(period),
    })
}
