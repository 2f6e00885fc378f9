//! STIX 2.1 object types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A STIX object kind storable in a [`TypedRecordStore`](super::TypedRecordStore).
pub trait StixObject: Serialize + DeserializeOwned {
    /// Value the `type` property must carry.
    const TYPE: &'static str;

    fn id(&self) -> &str;

    fn type_tag(&self) -> &str;

    /// Properties that must be non-empty, by JSON name.
    fn required_fields(&self) -> Vec<(&'static str, &str)>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalReference {
    pub source_name: String,
    pub url: String,
}

/// A detection pattern, e.g. `[ipv4-addr:value = '203.0.113.45']`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Indicator {
    #[serde(rename = "type")]
    pub object_type: String,
    pub id: String,
    pub spec_version: String,
    pub created: String,
    pub modified: String,
    pub name: String,
    pub description: String,
    pub pattern: String,
    pub pattern_type: String,
    pub valid_from: String,
    pub labels: Vec<String>,
    pub confidence: i64,
    pub external_references: Vec<ExternalReference>,
}

impl StixObject for Indicator {
    const TYPE: &'static str = "indicator";

    fn id(&self) -> &str {
        &self.id
    }

    fn type_tag(&self) -> &str {
        &self.object_type
    }

    fn required_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("id", self.id.as_str()),
            ("spec_version", self.spec_version.as_str()),
            ("created", self.created.as_str()),
            ("modified", self.modified.as_str()),
            ("pattern", self.pattern.as_str()),
            ("pattern_type", self.pattern_type.as_str()),
            ("valid_from", self.valid_from.as_str()),
        ]
    }
}

/// A typed edge between two STIX objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub object_type: String,
    pub id: String,
    pub spec_version: String,
    pub created: String,
    pub modified: String,
    pub relationship_type: String,
    pub source_ref: String,
    pub target_ref: String,
}

impl StixObject for Relationship {
    const TYPE: &'static str = "relationship";

    fn id(&self) -> &str {
        &self.id
    }

    fn type_tag(&self) -> &str {
        &self.object_type
    }

    fn required_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("id", self.id.as_str()),
            ("spec_version", self.spec_version.as_str()),
            ("created", self.created.as_str()),
            ("modified", self.modified.as_str()),
            ("relationship_type", self.relationship_type.as_str()),
            ("source_ref", self.source_ref.as_str()),
            ("target_ref", self.target_ref.as_str()),
        ]
    }
}

/// A report that something was seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sighting {
    #[serde(rename = "type")]
    pub object_type: String,
    pub id: String,
    pub spec_version: String,
    pub created: String,
    pub modified: String,
    pub first_seen: String,
    pub last_seen: String,
    pub count: i64,
    pub sighting_of_ref: String,
    pub where_sighted_refs: Vec<String>,
}

impl StixObject for Sighting {
    const TYPE: &'static str = "sighting";

    fn id(&self) -> &str {
        &self.id
    }

    fn type_tag(&self) -> &str {
        &self.object_type
    }

    fn required_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("id", self.id.as_str()),
            ("spec_version", self.spec_version.as_str()),
            ("created", self.created.as_str()),
            ("modified", self.modified.as_str()),
            ("sighting_of_ref", self.sighting_of_ref.as_str()),
        ]
    }
}

/// A collection of arbitrary STIX objects, kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bundle {
    #[serde(rename = "type")]
    pub object_type: String,
    pub id: String,
    pub spec_version: String,
    pub objects: Vec<Value>,
}

impl StixObject for Bundle {
    const TYPE: &'static str = "bundle";

    fn id(&self) -> &str {
        &self.id
    }

    fn type_tag(&self) -> &str {
        &self.object_type
    }

    fn required_fields(&self) -> Vec<(&'static str, &str)> {
        vec![("id", self.id.as_str())]
    }
}
