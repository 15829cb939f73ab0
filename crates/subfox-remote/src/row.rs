//! Wire shape of one row in the remote table.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use subfox_core::RemoteError;
use subfox_domain::{
    parse_start_date, CurrencyCode, IconRef, OwnerId, Recurrence, Subscription, SubscriptionDraft,
    SubscriptionId, SubscriptionPatch,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Snake-case row as stored server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub name: String,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub recurrence: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
}

impl RemoteRow {
    /// Insert payload. The id is left for the server to assign.
    pub fn from_draft(owner: &OwnerId, draft: &SubscriptionDraft) -> Self {
        Self {
            id: None,
            user_id: Some(owner.as_str().to_string()),
            name: draft.name.clone(),
            amount: draft.amount,
            currency: draft.currency.as_str().to_string(),
            recurrence: Some(draft.recurrence.as_str().to_string()),
            tags: Some(draft.tags.clone()),
            icon: draft.icon.as_ref().map(|icon| icon.as_str().to_string()),
            start_date: draft
                .start_date
                .map(|date| date.format(DATE_FORMAT).to_string()),
        }
    }

    pub fn into_subscription(self) -> Result<Subscription, RemoteError> {
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RemoteError::Decode("row without id".into()))?;
        let decode = |err: subfox_domain::ValidationError| {
            RemoteError::Decode(format!("row {id}: {err}"))
        };
        let recurrence = match self.recurrence.as_deref() {
            Some(value) => value.parse::<Recurrence>().map_err(decode)?,
            None => Recurrence::default(),
        };
        let icon = match self.icon.as_deref().filter(|icon| !icon.is_empty()) {
            Some(value) => Some(IconRef::parse(value).map_err(decode)?),
            None => None,
        };
        let start_date = match self.start_date.as_deref().filter(|date| !date.is_empty()) {
            Some(value) => Some(parse_start_date(value).map_err(decode)?),
            None => None,
        };
        let currency = CurrencyCode::parse(&self.currency).map_err(decode)?;
        Ok(Subscription {
            id: SubscriptionId::new(id),
            name: self.name,
            amount: self.amount,
            currency,
            recurrence,
            tags: self.tags.unwrap_or_default(),
            icon,
            start_date,
            owner: self.user_id.map(OwnerId::new).unwrap_or_default(),
        })
    }
}

/// Column map holding only the fields a patch changes. Cleared optional
/// fields are sent as `null`.
pub fn patch_body(patch: &SubscriptionPatch) -> Map<String, Value> {
    let mut body = Map::new();
    if let Some(name) = &patch.name {
        body.insert("name".into(), Value::from(name.as_str()));
    }
    if let Some(amount) = patch.amount {
        body.insert("amount".into(), Value::from(amount));
    }
    if let Some(currency) = &patch.currency {
        body.insert("currency".into(), Value::from(currency.as_str()));
    }
    if let Some(recurrence) = patch.recurrence {
        body.insert("recurrence".into(), Value::from(recurrence.as_str()));
    }
    if let Some(tags) = &patch.tags {
        body.insert("tags".into(), Value::from(tags.clone()));
    }
    if let Some(icon) = &patch.icon {
        let value = icon
            .as_ref()
            .map_or(Value::Null, |icon| Value::from(icon.as_str()));
        body.insert("icon".into(), value);
    }
    if let Some(start_date) = &patch.start_date {
        let value = start_date.map_or(Value::Null, |date| {
            Value::from(date.format(DATE_FORMAT).to_string())
        });
        body.insert("start_date".into(), value);
    }
    body
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_server_row() {
        let row: RemoteRow = serde_json::from_value(json!({
            "id": "7f1c",
            "user_id": "alice",
            "name": "Cloud",
            "amount": 120.0,
            "currency": "usd",
            "recurrence": "yearly",
            "tags": ["work"],
            "icon": null,
            "start_date": "2024-01-15",
            "created_at": "2024-01-15T10:00:00+00:00"
        }))
        .expect("row");

        let record = row.into_subscription().expect("subscription");

        assert_eq!(record.id.as_str(), "7f1c");
        assert_eq!(record.owner.as_str(), "alice");
        assert_eq!(record.currency.as_str(), "USD");
        assert_eq!(record.recurrence, Recurrence::Yearly);
        assert_eq!(record.start_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert!(record.icon.is_none());
    }

    #[test]
    fn row_without_id_is_a_decode_error() {
        let row = RemoteRow {
            id: None,
            user_id: None,
            name: "Gym".into(),
            amount: 30.0,
            currency: "EUR".into(),
            recurrence: None,
            tags: None,
            icon: None,
            start_date: None,
        };

        assert!(matches!(row.into_subscription(), Err(RemoteError::Decode(_))));
    }

    #[test]
    fn insert_payload_carries_owner_and_omits_id() {
        let draft = SubscriptionDraft::new(
            "Netflix",
            12.99,
            CurrencyCode::parse("EUR").unwrap(),
            Recurrence::Monthly,
        )
        .unwrap()
        .with_start_date(NaiveDate::from_ymd_opt(2024, 2, 1));

        let value = serde_json::to_value(RemoteRow::from_draft(&OwnerId::new("alice"), &draft))
            .expect("serialize");

        assert_eq!(value["user_id"], "alice");
        assert_eq!(value["start_date"], "2024-02-01");
        assert_eq!(value["recurrence"], "monthly");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn patch_body_only_lists_changed_columns() {
        let patch = SubscriptionPatch {
            amount: Some(9.5),
            icon: Some(None),
            ..SubscriptionPatch::default()
        };

        let body = patch_body(&patch);

        assert_eq!(body.len(), 2);
        assert_eq!(body["amount"], json!(9.5));
        assert_eq!(body["icon"], Value::Null);
    }
}
