//! Shared identifiers, recurrence cadences, and icon references.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ValidationError;

/// Exposes a stable identifier for records held in a collection.
pub trait Identifiable {
    fn id(&self) -> &SubscriptionId;
}

/// Provides read-only access to an entity's display name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Supplies a common contract for retrieving numeric amounts.
pub trait Amounted {
    fn amount(&self) -> f64;
}

/// Opaque record identifier. Client-generated ids and server-assigned ids
/// share this type; nothing in the value tells them apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a fresh client-side identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriptionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SubscriptionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of the authenticated user owning a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Records written before accounts existed carry no owner.
    pub fn is_unset(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Billing cycle length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    Monthly,
    Bimonthly,
    Quarterly,
    Yearly,
}

impl Recurrence {
    pub const ALL: [Recurrence; 4] = [
        Recurrence::Monthly,
        Recurrence::Bimonthly,
        Recurrence::Quarterly,
        Recurrence::Yearly,
    ];

    /// Number of months covered by one billing cycle.
    pub fn months(self) -> u32 {
        match self {
            Recurrence::Monthly => 1,
            Recurrence::Bimonthly => 2,
            Recurrence::Quarterly => 3,
            Recurrence::Yearly => 12,
        }
    }

    /// Divisor turning a per-cycle amount into its monthly equivalent.
    pub fn divisor(self) -> f64 {
        f64::from(self.months())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Recurrence::Monthly => "monthly",
            Recurrence::Bimonthly => "bimonthly",
            Recurrence::Quarterly => "quarterly",
            Recurrence::Yearly => "yearly",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Recurrence::Monthly => "Monthly",
            Recurrence::Bimonthly => "Bimonthly (Every 2 months)",
            Recurrence::Quarterly => "Quarterly (Every 3 months)",
            Recurrence::Yearly => "Yearly",
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(Recurrence::Monthly),
            "bimonthly" => Ok(Recurrence::Bimonthly),
            "quarterly" => Ok(Recurrence::Quarterly),
            "yearly" => Ok(Recurrence::Yearly),
            _ => Err(ValidationError::UnknownRecurrence(value.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconKind {
    Brand,
    Generic,
}

/// Reference into the external icon catalog. Stored and forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IconRef(String);

impl IconRef {
    const BRAND_PREFIX: &'static str = "brand:";
    const GENERIC_PREFIX: &'static str = "generic:";

    /// Accepts `brand:<slug>` or `generic:<name>`.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        let rest = trimmed
            .strip_prefix(Self::BRAND_PREFIX)
            .or_else(|| trimmed.strip_prefix(Self::GENERIC_PREFIX));
        match rest {
            Some(rest) if !rest.trim().is_empty() => Ok(Self(trimmed.to_string())),
            _ => Err(ValidationError::InvalidIcon(value.to_string())),
        }
    }

    pub fn brand(slug: &str) -> Self {
        Self(format!("{}{}", Self::BRAND_PREFIX, slug))
    }

    pub fn generic(name: &str) -> Self {
        Self(format!("{}{}", Self::GENERIC_PREFIX, name))
    }

    pub fn kind(&self) -> Option<IconKind> {
        if self.0.starts_with(Self::BRAND_PREFIX) {
            Some(IconKind::Brand)
        } else if self.0.starts_with(Self::GENERIC_PREFIX) {
            Some(IconKind::Generic)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IconRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a `YYYY-MM-DD` date, also accepting a full RFC 3339 timestamp.
pub fn parse_start_date(value: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|stamp| stamp.date_naive())
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

/// Splits comma-separated tag input, trimming and dropping blanks and repeats.
pub fn parse_tags(input: &str) -> Vec<String> {
    normalize_tags(input.split(','))
}

pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() || out.iter().any(|existing| existing == tag) {
            continue;
        }
        out.push(tag.to_string());
    }
    out
}

pub(crate) mod lenient_date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => super::parse_start_date(value)
                .map(Some)
                .map_err(D::Error::custom),
        }
    }
}
