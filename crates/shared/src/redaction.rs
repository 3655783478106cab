//! Secret detection and redaction utilities.
//!
//! Configuration objects routinely carry credentials (SMTP passwords, API
//! keys for remote services). Log fields and error metadata pass their keys
//! through these helpers before anything is written out.

/// The redacted placeholder string.
pub const REDACTED: &str = "<redacted>";

const SECRET_MARKERS: [&str; 6] = ["KEY", "TOKEN", "SECRET", "PASSWORD", "CREDENTIAL", "AUTH"];

/// Checks if a key/variable name likely refers to a secret.
///
/// Matching is case-insensitive and substring based.
///
/// # Examples
///
/// ```
/// use config_ignore_shared::is_secret_key;
///
/// assert!(is_secret_key("smtp_password"));
/// assert!(is_secret_key("API_KEY"));
/// assert!(!is_secret_key("CFGI_LOG_LEVEL"));
/// ```
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    SECRET_MARKERS.iter().any(|marker| key.contains(marker))
}

/// Redacts a value if the key is likely a secret.
///
/// # Examples
///
/// ```
/// use config_ignore_shared::redact_if_secret;
///
/// assert_eq!(redact_if_secret("auth_token", "abc"), "<redacted>");
/// assert_eq!(redact_if_secret("site_name", "Example"), "Example");
/// ```
pub fn redact_if_secret(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_owned()
    } else {
        value.to_owned()
    }
}
