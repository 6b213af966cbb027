use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// One stored TOTP key. Wire field names match the JSON backup format.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TotpKey {
    /// Display label (service name). Required for a usable key, but
    /// defaulted on deserialize so one bad backup row drops instead of
    /// failing the whole file.
    #[serde(default)]
    pub name: String,
    /// Issuer-qualifying identifier, usually an e-mail. Optional;
    /// absent and empty are equivalent.
    #[serde(default)]
    pub account: String,
    /// Base32 secret in canonical form: uppercase, no whitespace.
    #[serde(default)]
    pub secret: String,
    /// Creation timestamp, RFC 3339. Advisory only, never used for
    /// code generation.
    #[serde(default, rename = "createdAt")]
    pub created_at: String,
}

impl TotpKey {
    pub fn new(name: impl Into<String>, account: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            account: account.into(),
            secret: secret.into(),
            created_at: now_rfc3339(),
        }
    }

    /// Duplicate policy: same `name` and same `account`, with an empty
    /// account treated as absent.
    pub fn is_duplicate_of(&self, other: &TotpKey) -> bool {
        self.name == other.name && self.account.trim() == other.account.trim()
    }
}

/// Current UTC time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_requires_name_and_account() {
        let a = TotpKey::new("GitHub", "alice@example.com", "JBSWY3DPEHPK3PXP");
        let b = TotpKey::new("GitHub", "alice@example.com", "GEZDGNBVGY3TQOJQ");
        let c = TotpKey::new("GitHub", "bob@example.com", "JBSWY3DPEHPK3PXP");
        assert!(a.is_duplicate_of(&b));
        assert!(!a.is_duplicate_of(&c));
    }

    #[test]
    fn empty_account_normalized() {
        let a = TotpKey::new("GitHub", "", "JBSWY3DPEHPK3PXP");
        let b = TotpKey::new("GitHub", "  ", "JBSWY3DPEHPK3PXP");
        assert!(a.is_duplicate_of(&b));
    }

    #[test]
    fn json_uses_camel_case_created_at() {
        let key = TotpKey::new("GitHub", "alice", "JBSWY3DPEHPK3PXP");
        let json = serde_json::to_string(&key).unwrap();
        assert!(json.contains("\"createdAt\""));
        let back: TotpKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn missing_optional_fields_default() {
        let key: TotpKey =
            serde_json::from_str(r#"{"name":"A","secret":"JBSWY3DPEHPK3PXP"}"#).unwrap();
        assert_eq!(key.account, "");
        assert_eq!(key.created_at, "");
    }
}
