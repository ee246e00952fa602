use crate::domain::TariffRecord;

/// Unit price charged when a resident has no active contract for a utility,
/// or the contracted service has no tariff yet. Missing tariffs bill the raw
/// consumption rather than nothing.
pub const FALLBACK_UNIT_PRICE: f64 = 1.0;

/// The current tariff of a service: latest `recorded_at`, and among equal
/// timestamps the one inserted last.
pub fn latest_tariff<'a>(
    history: impl IntoIterator<Item = &'a TariffRecord>,
) -> Option<&'a TariffRecord> {
    history
        .into_iter()
        .max_by(|a, b| a.recorded_at.cmp(&b.recorded_at).then(a.id.cmp(&b.id)))
}

/// Current price of a service, `None` without any history
pub fn latest_price<'a>(history: impl IntoIterator<Item = &'a TariffRecord>) -> Option<f64> {
    latest_tariff(history).map(|t| t.price)
}
