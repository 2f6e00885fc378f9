//! CTI metadata records and their storage encoding.

use crate::{Error, Result};
use policy::Protected;
use serde::{Deserialize, Deserializer, Serialize};

/// Prefix of every metadata key in world state.
pub const KEY_PREFIX: &str = "CTI_";

/// Record kind used in error messages.
pub(crate) const KIND: &str = "CTI metadata";

/// Storage key for the record with `uuid`.
pub fn metadata_key(uuid: &str) -> String {
    format!("{KEY_PREFIX}{uuid}")
}

/// One ledger entry describing an encrypted CTI artifact held elsewhere.
///
/// Missing fields decode as empty so that incomplete submissions fail
/// validation rather than parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CtiMetadata {
    #[serde(rename = "UUID")]
    pub uuid: String,
    pub description: String,
    /// RFC3339 submission time.
    pub timestamp: String,
    /// Role name of the submitting unit.
    pub sender_identity: String,
    /// Content locator of the encrypted artifact.
    #[serde(rename = "CID")]
    pub cid: String,
    /// Key-vault reference of the artifact's encryption key.
    pub vault_key: String,
    #[serde(rename = "SHA256Hash")]
    pub sha256_hash: String,
    /// Role names granted visibility beyond the privileged roles.
    #[serde(deserialize_with = "null_as_empty")]
    pub access_list: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl CtiMetadata {
    /// Decode a submitted record.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| Error::Parse {
            what: "metadata",
            source,
        })
    }

    /// Decode a value read from world state.
    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| Error::Serialization {
            key: key.to_string(),
            source,
        })
    }

    /// Encode for storage.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| Error::Serialization {
            key: self.key(),
            source,
        })
    }

    pub fn key(&self) -> String {
        metadata_key(&self.uuid)
    }

    /// Names of required fields that are empty. The access list is optional.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("UUID", &self.uuid),
            ("Description", &self.description),
            ("Timestamp", &self.timestamp),
            ("SenderIdentity", &self.sender_identity),
            ("CID", &self.cid),
            ("VaultKey", &self.vault_key),
            ("SHA256Hash", &self.sha256_hash),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "all fields in metadata must be non-empty (empty: {})",
                missing.join(", ")
            )))
        }
    }

    /// Records written by `InitLedger`.
    pub fn seed() -> [CtiMetadata; 2] {
        [
            CtiMetadata {
                uuid: "12345".into(),
                description: "Initial metadata entry 12345".into(),
                timestamp: "2023-10-01T12:00:00Z".into(),
                sender_identity: "HeadOfOperations".into(),
                cid: "CID12345".into(),
                vault_key: "vaultKey12345".into(),
                sha256_hash: "sha256hash12345".into(),
                access_list: vec!["HeadOfOperations".into(), "IntelligenceUnit".into()],
            },
            CtiMetadata {
                uuid: "67890".into(),
                description: "Initial metadata entry 67890".into(),
                timestamp: "2023-10-02T12:00:00Z".into(),
                sender_identity: "SpecialOperationsUnit".into(),
                cid: "CID67890".into(),
                vault_key: "vaultKey67890".into(),
                sha256_hash: "sha256hash67890".into(),
                access_list: vec!["TacticalUnit".into()],
            },
        ]
    }
}

impl Protected for CtiMetadata {
    fn id(&self) -> &str {
        &self.uuid
    }

    fn sender_identity(&self) -> &str {
        &self.sender_identity
    }

    fn access_list(&self) -> &[String] {
        &self.access_list
    }
}
