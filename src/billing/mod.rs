//! Cost aggregation and budget alerts.
//!
//! Everything here is a pure function over data already loaded from the
//! store: the service layer fetches a period's records, contracts, tariffs
//! and limits, and these functions turn them into costs and alerts.

pub mod aggregate;
pub mod alert;
pub mod contract;
pub mod cost;
pub mod report;
pub mod tariff;

pub use aggregate::*;
pub use alert::*;
pub use contract::*;
pub use cost::*;
pub use report::*;
pub use tariff::*;
