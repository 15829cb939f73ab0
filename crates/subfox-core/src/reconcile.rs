use std::collections::HashMap;

use subfox_domain::{Subscription, SubscriptionId};

/// Temporary-id to authoritative-id substitutions made after remote
/// confirmation of single-record creates.
#[derive(Debug, Default, Clone)]
pub struct ReconciliationMap {
    substitutions: HashMap<SubscriptionId, SubscriptionId>,
}

impl ReconciliationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, temporary: SubscriptionId, authoritative: SubscriptionId) {
        if temporary != authoritative {
            self.substitutions.insert(temporary, authoritative);
        }
    }

    /// Follows a substitution if one exists, otherwise returns `id` itself.
    pub fn resolve<'a>(&'a self, id: &'a SubscriptionId) -> &'a SubscriptionId {
        self.substitutions.get(id).unwrap_or(id)
    }

    pub fn len(&self) -> usize {
        self.substitutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty()
    }

    pub fn clear(&mut self) {
        self.substitutions.clear();
    }
}

/// Replaces the record stored under `temporary` with `confirmed`, keeping its
/// position. Any other record already carrying the confirmed id is dropped so
/// ids stay unique. Returns `false` when `temporary` is no longer present.
pub fn substitute(
    records: &mut Vec<Subscription>,
    temporary: &SubscriptionId,
    confirmed: Subscription,
) -> bool {
    let Some(position) = records.iter().position(|record| &record.id == temporary) else {
        return false;
    };
    records[position] = confirmed;
    let confirmed_id = records[position].id.clone();
    let mut index = 0;
    records.retain(|record| {
        let keep = index == position || record.id != confirmed_id;
        index += 1;
        keep
    });
    true
}
