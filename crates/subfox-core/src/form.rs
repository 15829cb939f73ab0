//! Raw text input from the add/edit forms, turned into validated drafts and
//! patches before any store is touched.

use subfox_domain::{
    parse_amount, parse_start_date, parse_tags, CurrencyCode, IconRef, Recurrence,
    SubscriptionDraft, SubscriptionPatch, ValidationError,
};

/// Form fields exactly as typed. `None` means the field was not supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionForm {
    pub name: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub recurrence: Option<String>,
    pub tags: Option<String>,
    pub icon: Option<String>,
    pub start_date: Option<String>,
}

impl SubscriptionForm {
    /// Builds a new-record draft. Name and amount are required; currency falls
    /// back to `default_currency`, recurrence to monthly, start date to today.
    pub fn into_draft(
        self,
        default_currency: &CurrencyCode,
    ) -> Result<SubscriptionDraft, ValidationError> {
        let name = self.name.unwrap_or_default();
        let amount = parse_amount(self.amount.as_deref().unwrap_or_default())?;
        let currency = match self.currency.as_deref() {
            Some(code) => CurrencyCode::parse(code)?,
            None => default_currency.clone(),
        };
        let recurrence = match self.recurrence.as_deref() {
            Some(value) => value.parse()?,
            None => Recurrence::Monthly,
        };
        let mut draft = SubscriptionDraft::new(&name, amount, currency, recurrence)?;
        if let Some(tags) = self.tags.as_deref() {
            draft = draft.with_tags(parse_tags(tags));
        }
        if let Some(icon) = optional_text(self.icon.as_deref()) {
            draft = draft.with_icon(Some(IconRef::parse(icon)?));
        }
        if let Some(date) = optional_text(self.start_date.as_deref()) {
            draft = draft.with_start_date(Some(parse_start_date(date)?));
        }
        Ok(draft)
    }

    /// Builds a partial update from the supplied fields. An empty (or `none`)
    /// icon or start date clears the stored value.
    pub fn into_patch(self) -> Result<SubscriptionPatch, ValidationError> {
        let mut patch = SubscriptionPatch::default();
        if let Some(name) = self.name {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(ValidationError::EmptyName);
            }
            patch.name = Some(trimmed.to_string());
        }
        if let Some(amount) = self.amount.as_deref() {
            patch.amount = Some(parse_amount(amount)?);
        }
        if let Some(code) = self.currency.as_deref() {
            patch.currency = Some(CurrencyCode::parse(code)?);
        }
        if let Some(value) = self.recurrence.as_deref() {
            patch.recurrence = Some(value.parse()?);
        }
        if let Some(tags) = self.tags.as_deref() {
            patch.tags = Some(parse_tags(tags));
        }
        if let Some(icon) = self.icon.as_deref() {
            patch.icon = Some(match optional_text(Some(icon)) {
                Some(value) => Some(IconRef::parse(value)?),
                None => None,
            });
        }
        if let Some(date) = self.start_date.as_deref() {
            patch.start_date = Some(match optional_text(Some(date)) {
                Some(value) => Some(parse_start_date(value)?),
                None => None,
            });
        }
        Ok(patch)
    }
}

fn optional_text(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty() && !text.eq_ignore_ascii_case("none"))
}
