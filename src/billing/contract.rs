use crate::domain::{ResidentContract, UtilityType};

/// The contract currently billing `resident_id` for `utility`. The most
/// recently signed active contract wins; equal timestamps go to the
/// higher id.
pub fn active_contract<'a>(
    contracts: impl IntoIterator<Item = &'a ResidentContract>,
    resident_id: i64,
    utility: UtilityType,
) -> Option<&'a ResidentContract> {
    contracts
        .into_iter()
        .filter(|c| c.active && c.resident_id == resident_id && c.utility == utility)
        .max_by(|a, b| a.signed_at.cmp(&b.signed_at).then(a.id.cmp(&b.id)))
}

/// Deactivate every active contract of the new contract's (resident,
/// utility) and append the new one. Callers must hold exclusive access to
/// `contracts` for the whole call. Returns how many contracts were
/// superseded.
pub fn supersede(contracts: &mut Vec<ResidentContract>, new: ResidentContract) -> usize {
    let mut superseded = 0;
    for c in contracts
        .iter_mut()
        .filter(|c| c.active && c.resident_id == new.resident_id && c.utility == new.utility)
    {
        c.active = false;
        superseded += 1;
    }
    contracts.push(ResidentContract { active: true, ..new });
    superseded
}
