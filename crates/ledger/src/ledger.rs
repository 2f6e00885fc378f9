//! The access-controlled CTI metadata contract.

use crate::metadata::{self, CtiMetadata, KIND};
use crate::{Error, Result};
use policy::{AccessPolicy, CallerIdentity, Decision, Request, Role};
use serde::{Deserialize, Serialize};
use storage::{WorldState, atomically};

/// Role reported for callers when the policy does not identify them.
const ANONYMOUS: &str = "anonymous";

/// One page of a listing.
///
/// `metadata_list` holds only the records visible to the caller, so it can
/// be shorter than the requested page size (even empty) while more records
/// remain. Keep paging with `bookmark` until it comes back empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(rename = "metadataList")]
    pub metadata_list: Vec<CtiMetadata>,
    pub bookmark: String,
}

/// CTI metadata ledger over a world state `S`, identifying callers with `I`.
///
/// Each public operation is one invocation: it resolves the caller's role,
/// asks the [`AccessPolicy`], and only then writes. All writes of an
/// invocation commit together.
pub struct MetadataLedger<S, I> {
    state: S,
    identity: I,
    policy: AccessPolicy,
}

impl<S: WorldState, I: CallerIdentity> MetadataLedger<S, I> {
    /// Create a ledger enforcing role-based access.
    pub fn new(state: S, identity: I) -> Self {
        Self {
            state,
            identity,
            policy: AccessPolicy::rbac(),
        }
    }

    /// Replace the access policy.
    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Act as a different caller for subsequent invocations.
    pub fn set_identity(&mut self, identity: I) {
        self.identity = identity;
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }

    /// Write the two seed records, overwriting any existing copies.
    pub fn init_ledger(&mut self) -> Result<()> {
        let Self {
            ref mut state,
            ref identity,
            ref policy,
        } = *self;

        atomically(state, |s| {
            let role = caller_role(identity, policy)?;
            authorize(policy, &role, Request::InitLedger)?;

            for record in CtiMetadata::seed() {
                s.put_state(&record.key(), &record.encode()?)?;
            }
            tracing::info!(role = %role, "ledger initialized");
            Ok(())
        })
    }

    /// Create a record from its JSON encoding.
    pub fn create_cti_metadata(&mut self, json: &str) -> Result<()> {
        let record = CtiMetadata::from_json(json)?;
        self.create(record)
    }

    /// Store a new record. Fails if one with the same UUID exists.
    pub fn create(&mut self, record: CtiMetadata) -> Result<()> {
        record.validate()?;
        let Self {
            ref mut state,
            ref identity,
            ref policy,
        } = *self;

        atomically(state, |s| {
            let role = caller_role(identity, policy)?;
            authorize(policy, &role, Request::Create)?;

            let key = record.key();
            if s.get_state(&key)?.is_some() {
                return Err(Error::Conflict {
                    kind: KIND,
                    id: record.uuid.clone(),
                });
            }
            s.put_state(&key, &record.encode()?)?;
            tracing::info!(uuid = %record.uuid, role = %role, "CTI metadata created");
            Ok(())
        })
    }

    /// Read a record the caller is allowed to see.
    pub fn read_cti_metadata(&mut self, uuid: &str) -> Result<CtiMetadata> {
        let Self {
            ref mut state,
            ref identity,
            ref policy,
        } = *self;

        atomically(state, |s| {
            let record = load(s, uuid)?;
            let role = caller_role(identity, policy)?;
            authorize(policy, &role, Request::Read(&record))?;
            Ok(record)
        })
    }

    /// Replace a record from its JSON encoding.
    pub fn update_cti_metadata(&mut self, json: &str) -> Result<()> {
        let record = CtiMetadata::from_json(json)?;
        self.update(record)
    }

    /// Replace an existing record entirely.
    ///
    /// Permission is judged against the stored record, never the incoming
    /// one. The replacement may change `SenderIdentity` and `AccessList`,
    /// which changes who can see and update the record afterwards.
    pub fn update(&mut self, record: CtiMetadata) -> Result<()> {
        let Self {
            ref mut state,
            ref identity,
            ref policy,
        } = *self;

        atomically(state, |s| {
            let existing = load(s, &record.uuid)?;
            let role = caller_role(identity, policy)?;
            authorize(policy, &role, Request::Update(&existing))?;

            if existing.sender_identity != record.sender_identity
                || existing.access_list != record.access_list
            {
                tracing::warn!(
                    uuid = %record.uuid,
                    role = %role,
                    sender_identity = %record.sender_identity,
                    access_list = ?record.access_list,
                    "update rewrites record visibility"
                );
            }

            s.put_state(&record.key(), &record.encode()?)?;
            tracing::info!(uuid = %record.uuid, role = %role, "CTI metadata updated");
            Ok(())
        })
    }

    /// Remove a record.
    pub fn delete_cti_metadata(&mut self, uuid: &str) -> Result<()> {
        let Self {
            ref mut state,
            ref identity,
            ref policy,
        } = *self;

        atomically(state, |s| {
            let key = metadata::metadata_key(uuid);
            if s.get_state(&key)?.is_none() {
                return Err(not_found(uuid));
            }
            let role = caller_role(identity, policy)?;
            authorize(policy, &role, Request::Delete(uuid))?;

            s.del_state(&key)?;
            tracing::info!(uuid, role = %role, "CTI metadata deleted");
            Ok(())
        })
    }

    /// List one store page of records, keeping those the caller may see.
    ///
    /// The page is cut by the store before filtering. A corrupt entry
    /// anywhere in the page fails the whole call.
    pub fn get_all_cti(&mut self, page_size: i32, bookmark: &str) -> Result<Page> {
        let Self {
            ref mut state,
            ref identity,
            ref policy,
        } = *self;

        atomically(state, |s| {
            let role = caller_role(identity, policy)?;
            authorize(policy, &role, Request::List)?;
            if page_size <= 0 {
                return Err(Error::Validation(format!(
                    "page size must be positive, got {page_size}"
                )));
            }

            let page = s.range_scan("", "", page_size, bookmark)?;
            let next = page.bookmark().to_string();

            let mut metadata_list = Vec::new();
            let mut hidden = 0usize;
            for entry in page {
                let (key, value) = entry?;
                let record = CtiMetadata::decode(&key, &value)?;
                if policy.can_read(&role, &record) {
                    metadata_list.push(record);
                } else {
                    tracing::debug!(uuid = %record.uuid, role = %role, "record hidden from caller");
                    hidden += 1;
                }
            }
            tracing::debug!(
                role = %role,
                visible = metadata_list.len(),
                hidden,
                more = !next.is_empty(),
                "listed CTI metadata page"
            );

            Ok(Page {
                metadata_list,
                bookmark: next,
            })
        })
    }
}

fn load<S: WorldState + ?Sized>(state: &S, uuid: &str) -> Result<CtiMetadata> {
    let key = metadata::metadata_key(uuid);
    match state.get_state(&key)? {
        Some(bytes) => CtiMetadata::decode(&key, &bytes),
        None => Err(not_found(uuid)),
    }
}

fn not_found(uuid: &str) -> Error {
    Error::NotFound {
        kind: KIND,
        id: uuid.to_string(),
    }
}

fn caller_role<I: CallerIdentity>(identity: &I, policy: &AccessPolicy) -> Result<Role> {
    if !policy.requires_identity() {
        return Ok(Role::Unrecognized(ANONYMOUS.to_string()));
    }
    identity.role()?.ok_or(Error::AttributeMissing)
}

fn authorize(policy: &AccessPolicy, role: &Role, request: Request<'_>) -> Result<()> {
    let Decision::Deny { reason } = policy.check(role, request) else {
        return Ok(());
    };
    tracing::warn!(role = %role, operation = ?request.operation(), "{reason}");

    match request {
        Request::Read(record) | Request::Update(record) => Err(Error::Forbidden {
            role: role.to_string(),
            id: record.id().to_string(),
            reason,
        }),
        _ => Err(Error::Unauthorized {
            role: role.to_string(),
            id: request.target().map(str::to_string),
            reason,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::StaticIdentity;
    use storage::{MemoryState, ScanPage};

    /// Memory state whose writes start failing after `puts_left` succeed.
    struct FailingWrites {
        inner: MemoryState,
        puts_left: usize,
    }

    impl WorldState for FailingWrites {
        fn get_state(&self, key: &str) -> storage::Result<Option<Vec<u8>>> {
            self.inner.get_state(key)
        }

        fn put_state(&mut self, key: &str, value: &[u8]) -> storage::Result<()> {
            if self.puts_left == 0 {
                return Err(storage::Error::Transaction("disk full".into()));
            }
            self.puts_left -= 1;
            self.inner.put_state(key, value)
        }

        fn del_state(&mut self, key: &str) -> storage::Result<()> {
            self.inner.del_state(key)
        }

        fn range_scan(
            &self,
            start: &str,
            end: &str,
            page_size: i32,
            bookmark: &str,
        ) -> storage::Result<ScanPage<'_>> {
            self.inner.range_scan(start, end, page_size, bookmark)
        }

        fn begin(&mut self) -> storage::Result<()> {
            self.inner.begin()
        }

        fn commit(&mut self) -> storage::Result<()> {
            self.inner.commit()
        }

        fn rollback(&mut self) -> storage::Result<()> {
            self.inner.rollback()
        }
    }

    struct Unreachable;

    impl CallerIdentity for Unreachable {
        fn attribute(&self, _name: &str) -> policy::Result<Option<String>> {
            Err(policy::Error::Identity("oracle down".into()))
        }
    }

    fn ledger_as(role: &str) -> MetadataLedger<MemoryState, StaticIdentity> {
        MetadataLedger::new(MemoryState::new(), StaticIdentity::with_role(role))
    }

    fn record(uuid: &str, sender: &str, access: &[&str]) -> CtiMetadata {
        CtiMetadata {
            uuid: uuid.into(),
            description: format!("report {uuid}"),
            timestamp: "2024-05-01T10:00:00Z".into(),
            sender_identity: sender.into(),
            cid: format!("cid-{uuid}"),
            vault_key: format!("kv-v2/data/key-{uuid}"),
            sha256_hash: format!("hash-{uuid}"),
            access_list: access.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_init_requires_head() {
        let mut ledger = ledger_as("SpecialOperationsUnit");
        assert!(matches!(
            ledger.init_ledger(),
            Err(Error::Unauthorized { .. })
        ));
        assert!(ledger.state().is_empty());

        ledger.set_identity(StaticIdentity::with_role("HeadOfOperations"));
        ledger.init_ledger().unwrap();
        assert_eq!(
            ledger.state().keys().collect::<Vec<_>>(),
            ["CTI_12345", "CTI_67890"]
        );
    }

    #[test]
    fn test_init_overwrites_seed_records() {
        let mut ledger = ledger_as("HeadOfOperations");
        ledger.init_ledger().unwrap();

        let mut changed = CtiMetadata::seed()[0].clone();
        changed.description = "edited".into();
        ledger.update(changed).unwrap();

        ledger.init_ledger().unwrap();
        let restored = ledger.read_cti_metadata("12345").unwrap();
        assert_eq!(restored.description, "Initial metadata entry 12345");
    }

    #[test]
    fn test_missing_role_attribute() {
        let mut ledger = MetadataLedger::new(MemoryState::new(), StaticIdentity::anonymous());
        assert!(matches!(ledger.init_ledger(), Err(Error::AttributeMissing)));
        assert!(matches!(
            ledger.create(record("1", "HeadOfOperations", &[])),
            Err(Error::AttributeMissing)
        ));
        assert!(matches!(
            ledger.get_all_cti(10, ""),
            Err(Error::AttributeMissing)
        ));
    }

    #[test]
    fn test_missing_role_attribute_on_existing_record() {
        let mut head = ledger_as("HeadOfOperations");
        head.create(record("r", "HeadOfOperations", &[])).unwrap();

        let mut ledger = MetadataLedger::new(head.into_state(), StaticIdentity::anonymous());
        assert!(matches!(
            ledger.read_cti_metadata("r"),
            Err(Error::AttributeMissing)
        ));
        assert!(matches!(
            ledger.update(record("r", "TacticalUnit", &[])),
            Err(Error::AttributeMissing)
        ));
        assert!(matches!(
            ledger.delete_cti_metadata("r"),
            Err(Error::AttributeMissing)
        ));
        assert_eq!(
            ledger.state().keys().collect::<Vec<_>>(),
            ["CTI_r"]
        );
    }

    #[test]
    fn test_identity_failure_is_reported() {
        let mut ledger = MetadataLedger::new(MemoryState::new(), Unreachable);
        let err = ledger.create(record("1", "HeadOfOperations", &[])).unwrap_err();
        assert!(matches!(
            err,
            Error::Identity(policy::Error::Identity(ref m)) if m == "oracle down"
        ));
        assert!(matches!(ledger.get_all_cti(10, ""), Err(Error::Identity(_))));
        assert!(ledger.state().is_empty());
    }

    #[test]
    fn test_failed_write_rolls_back_invocation() {
        let state = FailingWrites {
            inner: MemoryState::new(),
            puts_left: 1,
        };
        let mut ledger = MetadataLedger::new(state, StaticIdentity::with_role("HeadOfOperations"));

        // The first seed record is written, the second fails.
        let err = ledger.init_ledger().unwrap_err();
        assert!(matches!(
            err,
            Error::Store(storage::Error::Transaction(ref m)) if m == "disk full"
        ));
        assert!(ledger.state().inner.is_empty());

        assert!(matches!(
            ledger.create(record("2", "HeadOfOperations", &[])),
            Err(Error::Store(_))
        ));
        assert!(ledger.state().inner.is_empty());
    }

    #[test]
    fn test_create_checks_fields_before_role() {
        let mut ledger = ledger_as("TacticalUnit");
        let mut incomplete = record("1", "TacticalUnit", &[]);
        incomplete.vault_key.clear();
        assert!(matches!(
            ledger.create(incomplete),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            ledger.create(record("1", "TacticalUnit", &[])),
            Err(Error::Unauthorized { .. })
        ));
        assert!(ledger.state().is_empty());
    }

    #[test]
    fn test_create_rejects_malformed_json() {
        let mut ledger = ledger_as("HeadOfOperations");
        assert!(matches!(
            ledger.create_cti_metadata("[1, 2"),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_create_twice_conflicts() {
        for role in ["HeadOfOperations", "IntelligenceUnit", "SpecialOperationsUnit"] {
            let mut ledger = ledger_as(role);
            ledger.create(record("dup", role, &[])).unwrap();
            let err = ledger.create(record("dup", role, &[])).unwrap_err();
            assert!(matches!(err, Error::Conflict { ref id, .. } if id == "dup"));
        }
    }

    #[test]
    fn test_read_not_found_precedes_role_check() {
        let mut ledger = MetadataLedger::new(MemoryState::new(), StaticIdentity::anonymous());
        assert!(matches!(
            ledger.read_cti_metadata("nope"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_not_found() {
        let mut ledger = ledger_as("HeadOfOperations");
        assert!(matches!(
            ledger.update(record("ghost", "HeadOfOperations", &[])),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_judged_against_stored_record() {
        let mut ledger = ledger_as("HeadOfOperations");
        ledger.create(record("7", "HeadOfOperations", &[])).unwrap();

        ledger.set_identity(StaticIdentity::with_role("SpecialOperationsUnit"));
        let takeover = record("7", "SpecialOperationsUnit", &["SpecialOperationsUnit"]);
        let err = ledger.update(takeover).unwrap_err();
        assert!(matches!(err, Error::Forbidden { ref id, .. } if id == "7"));

        ledger.set_identity(StaticIdentity::with_role("HeadOfOperations"));
        let stored = ledger.read_cti_metadata("7").unwrap();
        assert_eq!(stored.sender_identity, "HeadOfOperations");
    }

    #[test]
    fn test_update_replaces_whole_record() {
        let mut ledger = ledger_as("IntelligenceUnit");
        ledger
            .create(record("9", "IntelligenceUnit", &["IntelligenceUnit"]))
            .unwrap();

        let mut replacement = record(
            "9",
            "IntelligenceUnit",
            &["IntelligenceUnit", "TacticalUnit"],
        );
        replacement.description = "revised".into();
        ledger.update(replacement.clone()).unwrap();
        assert_eq!(ledger.read_cti_metadata("9").unwrap(), replacement);

        // Handing the record to another sender locks intelligence out.
        let handover = record("9", "SpecialOperationsUnit", &[]);
        ledger.update(handover).unwrap();
        assert!(matches!(
            ledger.read_cti_metadata("9"),
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            ledger.update(record("9", "IntelligenceUnit", &["IntelligenceUnit"])),
            Err(Error::Forbidden { .. })
        ));
    }

    #[test]
    fn test_delete_only_head() {
        let mut ledger = ledger_as("HeadOfOperations");
        ledger.create(record("d", "HeadOfOperations", &[])).unwrap();

        for role in ["SpecialOperationsUnit", "IntelligenceUnit", "TacticalUnit", "Janitor"] {
            ledger.set_identity(StaticIdentity::with_role(role));
            let err = ledger.delete_cti_metadata("d").unwrap_err();
            let Error::Unauthorized { role: denied, id, reason } = err else {
                panic!("expected unauthorized");
            };
            assert_eq!(denied, role);
            assert_eq!(id.as_deref(), Some("d"));
            assert!(reason.ends_with("delete CTI metadata with UUID d"), "{reason}");
        }

        ledger.set_identity(StaticIdentity::with_role("HeadOfOperations"));
        ledger.delete_cti_metadata("d").unwrap();
        assert!(matches!(
            ledger.delete_cti_metadata("d"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_list_rejects_unrecognized_role_and_bad_page_size() {
        let mut ledger = ledger_as("Janitor");
        assert!(matches!(
            ledger.get_all_cti(10, ""),
            Err(Error::Unauthorized { id: None, .. })
        ));

        ledger.set_identity(StaticIdentity::with_role("TacticalUnit"));
        assert!(matches!(
            ledger.get_all_cti(0, ""),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_open_access_mode() {
        let mut ledger = MetadataLedger::new(MemoryState::new(), StaticIdentity::anonymous())
            .with_policy(AccessPolicy::open_access());

        ledger.init_ledger().unwrap();
        ledger.create(record("open", "TacticalUnit", &[])).unwrap();

        let page = ledger.get_all_cti(10, "").unwrap();
        assert_eq!(page.metadata_list.len(), 3);
        ledger.delete_cti_metadata("12345").unwrap();
    }

    #[test]
    fn test_page_json_shape() {
        let page = Page {
            metadata_list: vec![],
            bookmark: "CTI_2".into(),
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json, serde_json::json!({"metadataList": [], "bookmark": "CTI_2"}));
    }
}
