//! Tracing setup and log-safe text helpers.

use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::AppError;

/// Env var holding the tracing filter directive.
pub const ENV_LOG: &str = "SWIFTKYC_LOG";

const REDACTED: &str = "<redacted>";

const SENSITIVE_KEYS: [&str; 7] = [
    "mobile",
    "doc_number",
    "entered",
    "ocr",
    "token",
    "password",
    "authorization",
];

/// Installs the global subscriber, writing to `log_file` when given.
///
/// The filter comes from `SWIFTKYC_LOG` and falls back to `info`.
///
/// # Errors
/// Returns [`AppError::Config`] when the log file cannot be opened or a
/// subscriber is already installed.
pub fn init_tracing(log_file: Option<&Path>) -> Result<(), AppError> {
    let filter = std::env::var(ENV_LOG)
        .ok()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|error| {
                AppError::Config(format!("failed to open log file {}: {error}", path.display()))
            })?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .try_init()
            .map_err(|error| AppError::Config(format!("tracing init failed: {error}")))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init()
            .map_err(|error| AppError::Config(format!("tracing init failed: {error}")))
    }
}

/// Masks values of personal or secret `key=value` / `"key": value` pairs.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for key in SENSITIVE_KEYS {
        redacted = redact_key_values(&redacted, key);
    }
    redacted
}

fn redact_key_values(input: &str, key: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;

    while let Some(found) = lower[cursor..].find(key) {
        let key_end = cursor + found + key.len();
        match value_start_after(input.as_bytes(), key_end) {
            Some(value_start) => {
                let value_end = value_end_from(input.as_bytes(), value_start);
                out.push_str(&input[cursor..value_start]);
                out.push_str(REDACTED);
                cursor = value_end;
            }
            None => {
                out.push_str(&input[cursor..key_end]);
                cursor = key_end;
            }
        }
    }

    out.push_str(&input[cursor..]);
    out
}

fn value_start_after(bytes: &[u8], mut index: usize) -> Option<usize> {
    while index < bytes.len() && matches!(bytes[index], b'"' | b'\'') {
        index += 1;
    }
    while index < bytes.len() && bytes[index] == b' ' {
        index += 1;
    }
    if index >= bytes.len() || !matches!(bytes[index], b'=' | b':') {
        return None;
    }
    index += 1;
    while index < bytes.len() && matches!(bytes[index], b' ' | b'"' | b'\'') {
        index += 1;
    }
    // Auth schemes keep their name; the credential after it is the value.
    let scheme = b"bearer ";
    if bytes.len() >= index + scheme.len()
        && bytes[index..index + scheme.len()].eq_ignore_ascii_case(scheme)
    {
        index += scheme.len();
    }
    Some(index)
}

fn value_end_from(bytes: &[u8], mut index: usize) -> usize {
    while index < bytes.len()
        && !matches!(
            bytes[index],
            b' ' | b'\t' | b'\n' | b',' | b';' | b'&' | b'}' | b']' | b')' | b'"' | b'\''
        )
    {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    //! Unit tests for log redaction.

    use super::*;

    #[test]
    fn masks_key_value_and_json_forms() {
        let raw = r#"mismatch entered=ABCDE1234F ocr=ABCDE1284F {"mobile": "9876543210"}"#;
        let redacted = redact_sensitive(raw);

        assert!(!redacted.contains("ABCDE1234F"));
        assert!(!redacted.contains("ABCDE1284F"));
        assert!(!redacted.contains("9876543210"));
        assert!(redacted.starts_with("mismatch entered=<redacted> ocr=<redacted>"));
    }

    #[test]
    fn leaves_plain_words_alone() {
        let raw = "mobile number must be exactly 10 digits";
        assert_eq!(redact_sensitive(raw), raw);
    }
}
