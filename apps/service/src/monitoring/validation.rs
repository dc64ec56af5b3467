//! Validation of raw check records read from the store.
//!
//! Records arrive as loose JSON: the CRUD side writes them, and the fields the
//! workers own (`state`, `lastChecked`) are missing until the first probe. Every
//! required field is checked and all failures are reported together; the two
//! worker-owned fields fall back to their first-seen defaults instead.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{CHECK_ID_LEN, Check, CheckState, HttpMethod, PHONE_LEN, Protocol};

pub const MIN_TIMEOUT_SECONDS: u64 = 1;
pub const MAX_TIMEOUT_SECONDS: u64 = 5;

/// A stored record that cannot be probed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("check record is malformed, invalid fields: {}", .fields.join(", "))]
pub struct ValidationError {
    pub fields: Vec<&'static str>,
}

/// Turn a raw record into a [`Check`], or list every field that is wrong with it.
pub fn validate_check(record: &Value) -> Result<Check, ValidationError> {
    let empty = Map::new();
    let object = record.as_object().unwrap_or(&empty);
    let mut invalid = Vec::new();

    let id = trimmed_with_len(object.get("id"), CHECK_ID_LEN);
    let owner_contact = trimmed_with_len(object.get("userPhone"), PHONE_LEN);
    let protocol = object.get("protocol").and_then(Value::as_str).and_then(Protocol::parse);
    let url = object
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string);
    let method = object.get("method").and_then(Value::as_str).and_then(HttpMethod::parse);
    let success_codes = object.get("successCodes").and_then(success_codes);
    let timeout_seconds = object.get("timeoutSeconds").and_then(timeout_seconds);

    if id.is_none() {
        invalid.push("id");
    }
    if owner_contact.is_none() {
        invalid.push("userPhone");
    }
    if protocol.is_none() {
        invalid.push("protocol");
    }
    if url.is_none() {
        invalid.push("url");
    }
    if method.is_none() {
        invalid.push("method");
    }
    if success_codes.is_none() {
        invalid.push("successCodes");
    }
    if timeout_seconds.is_none() {
        invalid.push("timeoutSeconds");
    }

    match (id, owner_contact, protocol, url, method, success_codes, timeout_seconds) {
        (
            Some(id),
            Some(owner_contact),
            Some(protocol),
            Some(url),
            Some(method),
            Some(success_codes),
            Some(timeout_seconds),
        ) => Ok(Check {
            id,
            owner_contact,
            protocol,
            url,
            method,
            success_codes,
            timeout_seconds,
            state: object
                .get("state")
                .and_then(Value::as_str)
                .and_then(CheckState::parse)
                .unwrap_or_default(),
            last_checked: object.get("lastChecked").and_then(last_checked),
        }),
        _ => Err(ValidationError { fields: invalid }),
    }
}

fn trimmed_with_len(value: Option<&Value>, len: usize) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| s.chars().count() == len)
        .map(str::to_string)
}

fn success_codes(value: &Value) -> Option<Vec<u16>> {
    let codes = value.as_array()?;
    if codes.is_empty() {
        return None;
    }

    codes
        .iter()
        .map(|code| {
            code.as_u64()
                .filter(|code| (100..=599).contains(code))
                .and_then(|code| u16::try_from(code).ok())
        })
        .collect()
}

/// Accepts `3` as well as `3.0`, since JSON writers disagree on integers.
fn timeout_seconds(value: &Value) -> Option<u8> {
    let seconds = match value.as_u64() {
        Some(seconds) => seconds,
        None => {
            let float = value.as_f64()?;
            if float.fract() != 0.0 || float < 0.0 {
                return None;
            }
            float as u64
        }
    };

    if !(MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(&seconds) {
        return None;
    }

    u8::try_from(seconds).ok()
}

fn last_checked(value: &Value) -> Option<DateTime<Utc>> {
    let millis = value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))?;
    if millis <= 0 {
        return None;
    }
    Utc.timestamp_millis_opt(millis).single()
}
