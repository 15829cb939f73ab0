//! Backup files: export of the collection and import of drafts.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde_json::Value;
use subfox_core::CoreError;
use subfox_domain::{
    normalize_tags, CurrencyCode, IconRef, Subscription, SubscriptionDraft, ValidationError,
};

use crate::{replace_file, serialize_records, tmp_path, write_atomic};

const EXPORT_PREFIX: &str = "subfox_backup";

/// `subfox_backup_<YYYY-MM-DD>.json`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("{}_{}.json", EXPORT_PREFIX, date.format("%Y-%m-%d"))
}

/// Writes `records` as a pretty JSON array into `dir`, replacing an export
/// from the same day.
pub fn export_to_dir(
    dir: &Path,
    records: &[Subscription],
    date: NaiveDate,
) -> Result<PathBuf, CoreError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(date));
    let tmp = tmp_path(&path);
    write_atomic(&tmp, &serialize_records(records)?)?;
    replace_file(&tmp, &path)?;
    Ok(path)
}

/// Reads an import file into validated drafts. `id` and `owner` fields of
/// the entries are ignored. Any invalid entry rejects the whole file.
pub fn read_import_file(path: &Path) -> Result<Vec<SubscriptionDraft>, CoreError> {
    let data = fs::read_to_string(path)?;
    parse_import(&data)
}

pub fn parse_import(data: &str) -> Result<Vec<SubscriptionDraft>, CoreError> {
    let value: Value =
        serde_json::from_str(data).map_err(|err| CoreError::Serde(err.to_string()))?;
    let Value::Array(entries) = value else {
        return Err(ValidationError::NotAnArray.into());
    };
    let mut drafts = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let draft = entry_to_draft(entry).map_err(|err| err.at_import_entry(index))?;
        drafts.push(draft);
    }
    Ok(drafts)
}

fn entry_to_draft(entry: Value) -> Result<SubscriptionDraft, ValidationError> {
    let mut draft: SubscriptionDraft = serde_json::from_value(entry)
        .map_err(|err| ValidationError::MalformedEntry(err.to_string()))?;
    draft.name = draft.name.trim().to_string();
    draft.currency = CurrencyCode::parse(draft.currency.as_str())?;
    draft.tags = normalize_tags(&draft.tags);
    if let Some(icon) = &draft.icon {
        IconRef::parse(icon.as_str())?;
    }
    draft.validate()?;
    Ok(draft)
}
