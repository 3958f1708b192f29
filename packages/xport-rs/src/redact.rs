//! Secret redaction for private keys in logs and configuration dumps.
//!
//! [`Redacted`] wraps a value so that `Debug` and `Display` print
//! `"<redacted>"`. The inner value stays reachable through `expose()` for the
//! one place that needs it (building a signer).

use std::fmt::{self, Debug, Display};

/// Wrapper that hides its inner value when formatted.
///
/// ```ignore
/// use xport_rs::redact::Redacted;
///
/// let key = Redacted::new("0xac09...".to_string());
/// tracing::info!(key = %key, "Loaded signer");
/// // Logs: key = <redacted>
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Redacted<T>(T);

impl<T> Redacted<T> {
    pub fn new(value: T) -> Self {
        Redacted(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_hides_value() {
        let secret = Redacted::new("0xdeadbeef".to_string());
        assert_eq!(format!("{:?}", secret), "<redacted>");
        assert_eq!(format!("{}", secret), "<redacted>");
        assert_eq!(secret.expose(), "0xdeadbeef");
    }

    #[test]
    fn test_redacted_inside_option_debug() {
        let key: Option<Redacted<String>> = Some(Redacted::new("k".into()));
        assert_eq!(format!("{:?}", key), "Some(<redacted>)");
    }
}
