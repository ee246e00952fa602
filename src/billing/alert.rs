use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::round2;

/// Classification of a cost against a budget limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStatus {
    /// No limit configured (absent or <= 0)
    #[serde(rename = "sem_meta")]
    NoBudget,
    /// Limit set and cost at or under it
    #[serde(rename = "dentro")]
    Within,
    /// Cost strictly above a positive limit
    #[serde(rename = "excedido")]
    Exceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetAlert {
    pub status: AlertStatus,
    pub cost: f64,
    pub limit: f64,
    /// `round(cost - limit, 2)`, only when exceeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overage: Option<f64>,
}

/// Compare a cost with the limit for the same period. Recomputed on every
/// read; there is no alert state.
pub fn evaluate_alert(cost: f64, limit: Option<f64>) -> BudgetAlert {
    let limit = limit.unwrap_or(0.0);
    let (status, overage) = if limit <= 0.0 {
        (AlertStatus::NoBudget, None)
    } else if cost > limit {
        (AlertStatus::Exceeded, Some(round2(cost - limit)))
    } else {
        (AlertStatus::Within, None)
    };
    BudgetAlert {
        status,
        cost,
        limit: limit.max(0.0),
        overage,
    }
}

impl BudgetAlert {
    pub fn is_exceeded(&self) -> bool {
        self.status == AlertStatus::Exceeded
    }
}

impl fmt::Display for BudgetAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.overage) {
            (AlertStatus::Exceeded, Some(over)) => write!(f, "exceeded by {over:.2}"),
            (AlertStatus::Exceeded, None) => write!(f, "exceeded"),
            (AlertStatus::Within, _) => write!(f, "within limit"),
            (AlertStatus::NoBudget, _) => write!(f, "no budget set"),
        }
    }
}
