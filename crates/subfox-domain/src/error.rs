use thiserror::Error;

/// Input rejected before any store is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("amount `{0}` is not a number")]
    InvalidAmount(String),
    #[error("amount must be a finite, non-negative number (got {0})")]
    AmountOutOfRange(f64),
    #[error("currency `{0}` is not a three-letter code")]
    InvalidCurrency(String),
    #[error("unknown recurrence `{0}` (expected monthly, bimonthly, quarterly or yearly)")]
    UnknownRecurrence(String),
    #[error("icon `{0}` must look like `brand:<slug>` or `generic:<name>`")]
    InvalidIcon(String),
    #[error("invalid date `{0}` (use YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("import file must contain a JSON array of subscriptions")]
    NotAnArray,
    #[error("malformed entry: {0}")]
    MalformedEntry(String),
    #[error("import entry {index}: {reason}")]
    ImportEntry { index: usize, reason: String },
}

impl ValidationError {
    /// Wraps an error with the position of the offending import entry.
    pub fn at_import_entry(self, index: usize) -> Self {
        ValidationError::ImportEntry {
            index,
            reason: self.to_string(),
        }
    }
}
