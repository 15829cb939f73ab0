//! Domain types representing recurring charges.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::common::*;
use crate::{CurrencyCode, ValidationError};

/// A recurring expense record as held in the collection and the local cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    pub name: String,
    pub amount: f64,
    pub currency: CurrencyCode,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconRef>,
    #[serde(default, with = "lenient_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "OwnerId::is_unset")]
    pub owner: OwnerId,
}

impl Subscription {
    /// Materializes a draft under the given identity.
    pub fn from_draft(id: SubscriptionId, owner: OwnerId, draft: SubscriptionDraft) -> Self {
        Self {
            id,
            name: draft.name,
            amount: draft.amount,
            currency: draft.currency,
            recurrence: draft.recurrence,
            tags: draft.tags,
            icon: draft.icon,
            start_date: draft.start_date,
            owner,
        }
    }

    /// Strips identity, leaving the user-editable fields.
    pub fn to_draft(&self) -> SubscriptionDraft {
        SubscriptionDraft {
            name: self.name.clone(),
            amount: self.amount,
            currency: self.currency.clone(),
            recurrence: self.recurrence,
            tags: self.tags.clone(),
            icon: self.icon.clone(),
            start_date: self.start_date,
        }
    }

    /// Per-month cost of this charge.
    pub fn monthly_equivalent(&self) -> f64 {
        self.amount / self.recurrence.divisor()
    }

    /// Applies every field present in the patch; absent fields are left as-is.
    pub fn apply(&mut self, patch: &SubscriptionPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(currency) = &patch.currency {
            self.currency = currency.clone();
        }
        if let Some(recurrence) = patch.recurrence {
            self.recurrence = recurrence;
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(icon) = &patch.icon {
            self.icon = icon.clone();
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
    }
}

impl Identifiable for Subscription {
    fn id(&self) -> &SubscriptionId {
        &self.id
    }
}

impl NamedEntity for Subscription {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Amounted for Subscription {
    fn amount(&self) -> f64 {
        self.amount
    }
}

/// A subscription without identity: what the add form and import produce,
/// and what the remote store receives on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDraft {
    pub name: String,
    pub amount: f64,
    pub currency: CurrencyCode,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconRef>,
    #[serde(default, with = "lenient_date")]
    pub start_date: Option<NaiveDate>,
}

impl SubscriptionDraft {
    /// Builds a validated draft starting today.
    pub fn new(
        name: &str,
        amount: f64,
        currency: CurrencyCode,
        recurrence: Recurrence,
    ) -> Result<Self, ValidationError> {
        let draft = Self {
            name: name.trim().to_string(),
            amount,
            currency,
            recurrence,
            tags: Vec::new(),
            icon: None,
            start_date: Some(Utc::now().date_naive()),
        };
        draft.validate()?;
        Ok(draft)
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    pub fn with_icon(mut self, icon: Option<IconRef>) -> Self {
        self.icon = icon;
        self
    }

    pub fn with_start_date(mut self, start_date: Option<NaiveDate>) -> Self {
        self.start_date = start_date;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        validate_amount(self.amount)?;
        Ok(())
    }
}

/// Partial update; `None` leaves a field untouched. `icon` and `start_date`
/// use a nested option so a field can be cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionPatch {
    pub name: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<CurrencyCode>,
    pub recurrence: Option<Recurrence>,
    pub tags: Option<Vec<String>>,
    pub icon: Option<Option<IconRef>>,
    pub start_date: Option<Option<NaiveDate>>,
}

impl SubscriptionPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.amount.is_none()
            && self.currency.is_none()
            && self.recurrence.is_none()
            && self.tags.is_none()
            && self.icon.is_none()
            && self.start_date.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ValidationError::EmptyName);
            }
        }
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        Ok(())
    }
}

/// Parses user-entered amount text.
pub fn parse_amount(input: &str) -> Result<f64, ValidationError> {
    let value: f64 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidAmount(input.to_string()))?;
    validate_amount(value)?;
    Ok(value)
}

fn validate_amount(amount: f64) -> Result<(), ValidationError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::AmountOutOfRange(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eur() -> CurrencyCode {
        CurrencyCode::parse("EUR").unwrap()
    }

    #[test]
    fn draft_rejects_blank_name_and_negative_amount() {
        assert_eq!(
            SubscriptionDraft::new("  ", 5.0, eur(), Recurrence::Monthly),
            Err(ValidationError::EmptyName)
        );
        assert!(matches!(
            SubscriptionDraft::new("Gym", -1.0, eur(), Recurrence::Monthly),
            Err(ValidationError::AmountOutOfRange(_))
        ));
    }

    #[test]
    fn amount_text_must_be_numeric() {
        assert_eq!(parse_amount("12.50"), Ok(12.5));
        assert_eq!(
            parse_amount("twelve"),
            Err(ValidationError::InvalidAmount("twelve".into()))
        );
        assert!(parse_amount("NaN").is_err());
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let draft = SubscriptionDraft::new("Netflix", 12.0, eur(), Recurrence::Monthly)
            .unwrap()
            .with_tags(["streaming"])
            .with_icon(Some(IconRef::brand("netflix")));
        let mut sub = Subscription::from_draft("a".into(), "u1".into(), draft);

        sub.apply(&SubscriptionPatch {
            amount: Some(15.0),
            icon: Some(None),
            ..SubscriptionPatch::default()
        });

        assert_eq!(sub.amount, 15.0);
        assert_eq!(sub.name, "Netflix");
        assert_eq!(sub.tags, vec!["streaming"]);
        assert!(sub.icon.is_none());
    }

    #[test]
    fn legacy_cache_entries_deserialize() {
        let json = r#"{
            "id": "3f1c",
            "name": "Spotify",
            "amount": 9.99,
            "currency": "EUR",
            "recurrence": "monthly",
            "tags": ["music"],
            "startDate": "2024-01-15T00:00:00.000Z"
        }"#;
        let sub: Subscription = serde_json::from_str(json).expect("legacy entry");
        assert!(sub.owner.is_unset());
        assert_eq!(sub.start_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert!(sub.icon.is_none());

        let rendered = serde_json::to_value(&sub).unwrap();
        assert_eq!(rendered["startDate"], "2024-01-15");
        assert!(rendered.get("owner").is_none());
    }
}
