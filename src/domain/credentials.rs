//! Exchange credentials (§3, §6): opaque to the core beyond equality, which
//! defines exchange-pool identity in the [`crate::manager::ExchangeManager`].

use std::fmt;

/// One configured credentials record. `name` is the label the parser's
/// `exchange(symbol)` block name is matched against (case-insensitively,
/// first match wins, §4.5); `exchange` names the venue the adapter speaks.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    pub name: String,
    pub exchange: String,
    pub key: String,
    pub secret: String,
    pub passphrase: Option<String>,
    pub endpoint: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("name", &self.name)
            .field("exchange", &self.exchange)
            .field("key", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Find the first credentials record whose `name` case-insensitively
/// matches `exchange_name` (§4.5 point 2).
pub fn find_credentials<'a>(
    list: &'a [Credentials],
    exchange_name: &str,
) -> Option<&'a Credentials> {
    list.iter()
        .find(|c| c.name.eq_ignore_ascii_case(exchange_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(name: &str) -> Credentials {
        Credentials {
            name: name.to_string(),
            exchange: name.to_string(),
            key: "k".into(),
            secret: "s".into(),
            passphrase: None,
            endpoint: None,
        }
    }

    #[test]
    fn matches_case_insensitively_and_takes_first() {
        let list = vec![creds("Deribit"), creds("deribit")];
        let found = find_credentials(&list, "DERIBIT").unwrap();
        assert_eq!(found.exchange, "Deribit");
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = Credentials {
            key: "top-secret-key".into(),
            secret: "top-secret-secret".into(),
            ..creds("deribit")
        };
        let formatted = format!("{c:?}");
        assert!(!formatted.contains("top-secret"));
        assert!(formatted.contains("<redacted>"));
    }
}
