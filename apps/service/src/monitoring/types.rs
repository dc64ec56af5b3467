use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a check id as generated by [`crate::store::random_id`].
pub const CHECK_ID_LEN: usize = 20;

/// Length of a user phone number, without country prefix.
pub const PHONE_LEN: usize = 9;

/// Transport used to probe a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "http" => Some(Protocol::Http),
            "https" => Some(Protocol::Https),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP verb used for the probe. Stored lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
        }
    }

    /// Verb as it goes on the wire
    pub fn to_uppercase(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            _ => None,
        }
    }
}

/// Last known state of a check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Up,
    #[default]
    Down,
}

impl CheckState {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(CheckState::Up),
            "down" => Some(CheckState::Down),
            _ => None,
        }
    }
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckState::Up => write!(f, "up"),
            CheckState::Down => write!(f, "down"),
        }
    }
}

/// A validated check record, as stored in the `checks` collection.
///
/// Field names on disk are camelCase so records stay readable by the rest of
/// the application (`userPhone`, `successCodes`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    /// 20 character primary key
    pub id: String,

    /// Phone number of the owner, alerts go here
    #[serde(rename = "userPhone")]
    pub owner_contact: String,

    pub protocol: Protocol,

    /// Host, path and query without the scheme
    pub url: String,

    pub method: HttpMethod,

    /// Status codes that count as "up"
    pub success_codes: Vec<u16>,

    /// Probe deadline, 1 to 5 seconds
    pub timeout_seconds: u8,

    #[serde(default)]
    pub state: CheckState,

    /// `None` until the first probe has completed
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_checked: Option<DateTime<Utc>>,
}

impl Check {
    /// `protocol://url`, the string the probe target is parsed from
    pub fn target(&self) -> String {
        format!("{}://{}", self.protocol, self.url)
    }

    /// Whether this check has ever completed a probe
    pub fn has_been_checked(&self) -> bool {
        self.last_checked.is_some()
    }
}

/// Result of exactly one probe attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A response arrived with this status code
    Status(u16),
    /// Connection refused, DNS failure, reset, unparsable target...
    TransportError,
    /// The deadline passed before anything else happened
    Timeout,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Status(code) => write!(f, "{code}"),
            Outcome::TransportError => write!(f, "transport-error"),
            Outcome::Timeout => write!(f, "timeout"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Check {
        Check {
            id: "abcdefghij0123456789".to_string(),
            owner_contact: "123456789".to_string(),
            protocol: Protocol::Https,
            url: "example.com/health?full=1".to_string(),
            method: HttpMethod::Get,
            success_codes: vec![200, 201],
            timeout_seconds: 3,
            state: CheckState::Down,
            last_checked: None,
        }
    }

    #[test]
    fn test_target_joins_protocol_and_url() {
        assert_eq!(sample().target(), "https://example.com/health?full=1");
    }

    #[test]
    fn test_serialized_field_names() {
        let mut check = sample();
        check.last_checked = Some(Utc.timestamp_millis_opt(1_700_000_000_123).unwrap());

        let value = serde_json::to_value(&check).unwrap();
        assert_eq!(value["userPhone"], "123456789");
        assert_eq!(value["successCodes"], serde_json::json!([200, 201]));
        assert_eq!(value["timeoutSeconds"], 3);
        assert_eq!(value["method"], "get");
        assert_eq!(value["state"], "down");
        assert_eq!(value["lastChecked"], 1_700_000_000_123_i64);
    }

    #[test]
    fn test_never_checked_omits_last_checked() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("lastChecked").is_none());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Status(503).to_string(), "503");
        assert_eq!(Outcome::TransportError.to_string(), "transport-error");
        assert_eq!(Outcome::Timeout.to_string(), "timeout");
    }
}
