//! Shared field validation helpers.

use std::sync::OnceLock;

use regex::Regex;

/// Whether `s` looks like an email address (local@domain.tld, no spaces).
pub fn is_valid_email(s: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"))
        .is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("jane@x.com"));
        assert!(is_valid_email("jane.doe+leads@sub.example.co.uk"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "not-an-email", "a@b", "a b@c.com", "@x.com", "a@.com "] {
            assert!(!is_valid_email(bad), "accepted {bad:?}");
        }
    }
}
