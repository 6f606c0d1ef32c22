//! Logical domains and the versioned envelope their payloads travel in.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::VaultError;

/// One independently encrypted record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Transactions,
    Inventory,
    Credits,
    Profits,
    Settings,
    Profile,
}

impl Domain {
    pub const ALL: [Self; 6] = [
        Self::Transactions,
        Self::Inventory,
        Self::Credits,
        Self::Profits,
        Self::Settings,
        Self::Profile,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Transactions => "transactions",
            Self::Inventory => "inventory",
            Self::Credits => "credits",
            Self::Profits => "profits",
            Self::Settings => "settings",
            Self::Profile => "profile",
        }
    }

    /// Key of the encrypted blob in the key-value store.
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::Transactions => "vault.transactions",
            Self::Inventory => "vault.inventory",
            Self::Credits => "vault.credits",
            Self::Profits => "vault.profits",
            Self::Settings => "vault.settings",
            Self::Profile => "vault.profile",
        }
    }

    /// Key the pre-vault app used for the plaintext JSON.
    pub fn legacy_key(self) -> &'static str {
        self.name()
    }

    /// AAD binding a blob to its domain.
    pub fn aad(self) -> String {
        format!("domain:{}", self.name())
    }

    /// Current payload schema version.
    pub fn schema_version(self) -> u32 {
        1
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing an unknown domain name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown domain: {0}")]
pub struct UnknownDomain(pub String);

impl FromStr for Domain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownDomain(s.to_string()))
    }
}

/// What actually gets encrypted: the payload tagged with its schema version.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Envelope<T> {
    pub schema: u32,
    pub data: T,
}

/// Parse decrypted bytes, refusing anything not written for `domain`'s schema.
pub(crate) fn open_envelope(
    domain: Domain,
    plaintext: &[u8],
) -> Result<serde_json::Value, VaultError> {
    let envelope: Envelope<serde_json::Value> =
        serde_json::from_slice(plaintext).map_err(|_| VaultError::DecryptionFailed)?;
    let expected = domain.schema_version();
    if envelope.schema != expected {
        return Err(VaultError::SchemaMismatch {
            domain: domain.name(),
            expected,
            found: envelope.schema,
        });
    }
    Ok(envelope.data)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn keys_are_distinct() {
        let mut keys: Vec<&str> = Domain::ALL
            .iter()
            .flat_map(|d| [d.storage_key(), d.legacy_key()])
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 12);
    }

    #[test]
    fn parse_names() {
        for domain in Domain::ALL {
            assert_eq!(domain.name().parse::<Domain>().unwrap(), domain);
        }
        assert_eq!("Inventory".parse::<Domain>().unwrap(), Domain::Inventory);
        assert_eq!(
            "ledger".parse::<Domain>(),
            Err(UnknownDomain("ledger".into()))
        );
    }

    #[test]
    fn serde_uses_names() {
        assert_eq!(
            serde_json::to_value(Domain::Credits).unwrap(),
            json!("credits")
        );
    }

    #[test]
    fn envelope_checks_schema() {
        let ok = serde_json::to_vec(&json!({"schema": 1, "data": [1, 2]})).unwrap();
        assert_eq!(
            open_envelope(Domain::Profits, &ok).unwrap(),
            json!([1, 2])
        );

        let future = serde_json::to_vec(&json!({"schema": 9, "data": []})).unwrap();
        assert!(matches!(
            open_envelope(Domain::Profits, &future),
            Err(VaultError::SchemaMismatch {
                domain: "profits",
                expected: 1,
                found: 9
            })
        ));
    }

    #[test]
    fn envelope_rejects_bare_payload() {
        let bare = serde_json::to_vec(&json!([{"id": "t1"}])).unwrap();
        assert!(matches!(
            open_envelope(Domain::Transactions, &bare),
            Err(VaultError::DecryptionFailed)
        ));
    }
}
