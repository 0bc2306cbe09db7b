//! Masking of sensitive values before they reach the audit trail.

use serde_json::{Map, Value};

const REDACTED: &str = "[REDACTED]";
const MASKED: &str = "[MASKED]";

const SECRET_KEYS: [&str; 4] = ["token", "secret", "password", "otp"];
const ACCOUNT_KEYS: [&str; 3] = ["bank", "account", "ifsc"];
const PAY_KEYS: [&str; 3] = ["salary", "ctc", "compensation"];
const LINK_KEYS: [&str; 3] = ["url", "storage", "document"];
const SECRET_CONFIG_MARKERS: [&str; 3] = ["SECRET", "PASSWORD", "TOKEN"];

/// Returns `value` with sensitive fields masked, at any depth.
///
/// For `system_config` entries the `value` field is redacted when the
/// entry's `key` names a secret.
#[must_use]
pub fn scrub(entity_type: &str, value: Value) -> Value {
    let value = if entity_type.eq_ignore_ascii_case("system_config") {
        redact_secret_config(value)
    } else {
        value
    };
    scrub_value(value)
}

fn scrub_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, field)| {
                    let masked = mask_field(&key, field);
                    (key, masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(scrub_value).collect()),
        other => other,
    }
}

fn mask_field(key: &str, value: Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Object(_) | Value::Array(_) => scrub_value(value),
        scalar => mask_scalar(&key.to_ascii_lowercase(), scalar),
    }
}

fn mask_scalar(key: &str, value: Value) -> Value {
    let key_has = |needles: &[&str]| needles.iter().any(|needle| key.contains(needle));

    if key_has(&SECRET_KEYS) {
        Value::String(REDACTED.to_string())
    } else if key_has(&ACCOUNT_KEYS) {
        mask_account(&value)
    } else if key_has(&PAY_KEYS) || (key_has(&LINK_KEYS) && is_link(&value)) {
        Value::String(MASKED.to_string())
    } else {
        value
    }
}

fn mask_account(value: &Value) -> Value {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let digits: Vec<char> = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 4 {
        return Value::String("****".to_string());
    }
    let last4: String = digits[digits.len() - 4..].iter().collect();
    Value::String(format!("****{last4}"))
}

fn is_link(value: &Value) -> bool {
    value.as_str().is_some_and(|s| {
        let lower = s.trim_start().to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:")
    })
}

fn redact_secret_config(value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };
    if names_secret(&map) {
        map.insert("value".to_string(), Value::String(REDACTED.to_string()));
    }
    Value::Object(map)
}

fn names_secret(map: &Map<String, Value>) -> bool {
    map.get("key")
        .and_then(Value::as_str)
        .is_some_and(|key| {
            let upper = key.to_ascii_uppercase();
            SECRET_CONFIG_MARKERS
                .iter()
                .any(|marker| upper.contains(marker))
        })
}
