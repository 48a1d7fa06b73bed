//! Cookie-header wire format used by the client store.
//! 客戶端儲存所使用的 cookie 標頭格式。
//!
//! A store blob is a flat list of `key=value` pairs joined by `;` (optionally
//! followed by a space, as browsers render `document.cookie`). A single
//! assignment may carry an `expires=<RFC-1123 date>` attribute.

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, Utc};

use crate::store::StoreError;

/// 鍵值對之間的分隔字元。 / Separator between `key=value` pairs.
pub const PAIR_SEPARATOR: char = ';';

/// 複合值內部欄位的分隔字元。 / Sub-field delimiter inside composite values.
pub const FIELD_DELIMITER: char = '|';

/// 單一項目的大小上限（位元組）。 / Upper bound for one serialized `key=value` pair.
pub const MAX_ENTRY_BYTES: usize = 4096;

const EXPIRES_ATTRIBUTE: &str = "expires";
const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";
/// Last year that still renders as a four-digit RFC-1123 date.
const MAX_EXPIRY_YEAR: i32 = 9999;

/// A parsed `key=value[;expires=...]` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub key: String,
    pub value: String,
    pub expires: Option<DateTime<Utc>>,
}

/// 在 cookie 標頭中尋找指定鍵的值。 / Finds the value stored under `key` in a header blob.
///
/// The value runs up to the next pair separator or the end of the blob. An
/// empty blob or a missing key yields `None`.
pub fn find<'a>(blob: &'a str, key: &str) -> Option<&'a str> {
    if blob.is_empty() || key.is_empty() {
        return None;
    }
    blob.split(PAIR_SEPARATOR).find_map(|pair| {
        let (name, value) = pair.trim_start().split_once('=')?;
        (name == key).then_some(value)
    })
}

/// 將鍵值與到期時間序列化為指派字串。 / Serializes a pair and its optional expiry.
pub fn serialize(key: &str, value: &str, expires: Option<DateTime<Utc>>) -> String {
    match expires {
        Some(at) => format!(
            "{key}={value}{PAIR_SEPARATOR}{EXPIRES_ATTRIBUTE}={}",
            format_expires(at)
        ),
        None => format!("{key}={value}"),
    }
}

/// 解析指派字串。 / Parses an assignment produced by [`serialize`].
///
/// Unknown attributes are ignored and an unparseable `expires` date is
/// dropped, which leaves the entry session-scoped.
pub fn parse_assignment(raw: &str) -> Result<Assignment, StoreError> {
    let mut segments = raw.split(PAIR_SEPARATOR);
    let pair = segments.next().unwrap_or_default().trim();
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| StoreError::MalformedAssignment(raw.to_string()))?;
    let key = key.trim();
    validate_key(key)?;

    let mut expires = None;
    for attribute in segments {
        let Some((name, attr_value)) = attribute.trim().split_once('=') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case(EXPIRES_ATTRIBUTE) {
            expires = parse_expires(attr_value);
        }
    }

    Ok(Assignment {
        key: key.to_string(),
        value: value.to_string(),
        expires,
    })
}

/// 檢查鍵值是否可安全寫入。 / Rejects pairs that would corrupt the blob.
pub fn validate_pair(key: &str, value: &str) -> Result<(), StoreError> {
    validate_key(key)?;
    if value.contains(PAIR_SEPARATOR) {
        return Err(StoreError::ReservedSeparator {
            key: key.to_string(),
        });
    }
    let size = key.len() + 1 + value.len();
    if size > MAX_ENTRY_BYTES {
        return Err(StoreError::EntryTooLarge {
            key: key.to_string(),
            size,
            limit: MAX_ENTRY_BYTES,
        });
    }
    Ok(())
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    let invalid = key.is_empty()
        || key
            .chars()
            .any(|ch| ch == '=' || ch == PAIR_SEPARATOR || ch.is_whitespace());
    if invalid {
        Err(StoreError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// Formats `at` as an RFC-1123 date, e.g. `Thu, 15 Oct 2026 08:00:00 GMT`.
pub fn format_expires(at: DateTime<Utc>) -> String {
    at.format(RFC1123_FORMAT).to_string()
}

pub fn parse_expires(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), RFC1123_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// 以整日為單位計算到期時間。 / Absolute expiry `days` whole days after `now`.
///
/// Dates past year 9999 cannot round-trip through the `expires` attribute
/// and are rejected.
pub fn expiry_after_days(now: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>, StoreError> {
    Duration::try_days(i64::from(days))
        .and_then(|delta| now.checked_add_signed(delta))
        .filter(|at| at.year() <= MAX_EXPIRY_YEAR)
        .ok_or(StoreError::ExpiryOutOfRange { days })
}
