//! Redaction wrapper for personal contact details
//!
//! Phone numbers and e-mail addresses of the people under watch must never
//! reach a log line in clear text. `Sensitive<T>` prints as a redaction
//! marker; `masked()` keeps the last four characters so operators can still
//! tell two recipients apart.

use std::fmt;

const REDACTED: &str = "***REDACTED***";

/// Wrapper that redacts itself in Debug and Display
///
/// # Example
///
/// ```
/// use beatwatch_core_types::Sensitive;
///
/// let phone = Sensitive::new("+15551234567".to_string());
/// assert_eq!(format!("{}", phone), "***REDACTED***");
/// assert_eq!(phone.masked(), "********4567");
/// assert_eq!(phone.expose(), "+15551234567");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Access the clear value; only for handing it to a delivery transport
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: AsRef<str>> Sensitive<T> {
    /// All but the last four characters replaced by `*`
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.as_ref().chars().collect();
        let keep = chars.len().min(4);
        let hidden = chars.len() - keep;
        let mut out = "*".repeat(hidden);
        out.extend(&chars[hidden..]);
        out
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}
