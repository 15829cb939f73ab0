use std::collections::BTreeMap;

use subfox_domain::{CurrencyCode, Subscription};

/// Bucket for records without tags.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Spend figures derived from one snapshot of the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct SpendSummary {
    pub count: usize,
    pub total_monthly: f64,
    pub total_yearly: f64,
    pub by_tag: BTreeMap<String, f64>,
    pub by_currency: BTreeMap<CurrencyCode, f64>,
}

/// Pure aggregation over a collection. Amounts in different currencies are
/// summed as-is; no conversion is applied.
pub struct SummaryService;

impl SummaryService {
    pub fn monthly_equivalent(record: &Subscription) -> f64 {
        record.amount / record.recurrence.divisor()
    }

    pub fn yearly_equivalent(record: &Subscription) -> f64 {
        Self::monthly_equivalent(record) * 12.0
    }

    pub fn total_monthly(records: &[Subscription]) -> f64 {
        records.iter().map(Self::monthly_equivalent).sum()
    }

    pub fn total_yearly(records: &[Subscription]) -> f64 {
        Self::total_monthly(records) * 12.0
    }

    /// Monthly spend per tag. A record counts in full towards every one of its
    /// tags; untagged records land in [`UNCATEGORIZED`].
    pub fn by_tag(records: &[Subscription]) -> BTreeMap<String, f64> {
        let mut buckets = BTreeMap::new();
        for record in records {
            let monthly = Self::monthly_equivalent(record);
            if record.tags.is_empty() {
                *buckets.entry(UNCATEGORIZED.to_string()).or_insert(0.0) += monthly;
                continue;
            }
            for tag in &record.tags {
                *buckets.entry(tag.clone()).or_insert(0.0) += monthly;
            }
        }
        buckets
    }

    pub fn by_currency(records: &[Subscription]) -> BTreeMap<CurrencyCode, f64> {
        let mut buckets = BTreeMap::new();
        for record in records {
            *buckets.entry(record.currency.clone()).or_insert(0.0) +=
                Self::monthly_equivalent(record);
        }
        buckets
    }

    pub fn summarize(records: &[Subscription]) -> SpendSummary {
        SpendSummary {
            count: records.len(),
            total_monthly: Self::total_monthly(records),
            total_yearly: Self::total_yearly(records),
            by_tag: Self::by_tag(records),
            by_currency: Self::by_currency(records),
        }
    }
}
