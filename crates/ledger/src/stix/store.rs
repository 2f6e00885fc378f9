//! Typed create/read views over the STIX world state.

use super::types::{Bundle, Indicator, Relationship, Sighting, StixObject};
use crate::{Error, Result};
use serde_json::Value;
use std::marker::PhantomData;
use storage::{WorldState, atomically};

/// Page size used when walking the whole state.
const SCAN_PAGE: i32 = 100;

/// Create/read/exists for one STIX object kind, keyed by STIX id.
pub struct TypedRecordStore<'s, T, S: ?Sized> {
    state: &'s mut S,
    _kind: PhantomData<fn() -> T>,
}

impl<'s, T: StixObject, S: WorldState + ?Sized> TypedRecordStore<'s, T, S> {
    pub fn new(state: &'s mut S) -> Self {
        Self {
            state,
            _kind: PhantomData,
        }
    }

    /// Store a new object from its JSON encoding and return it.
    pub fn create(&mut self, json: &str) -> Result<T> {
        let object: T = serde_json::from_str(json).map_err(|source| Error::Parse {
            what: T::TYPE,
            source,
        })?;

        if object.type_tag() != T::TYPE {
            return Err(Error::Validation(format!(
                "asset type must be '{}', got '{}'",
                T::TYPE,
                object.type_tag()
            )));
        }
        let missing: Vec<_> = object
            .required_fields()
            .into_iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| name)
            .collect();
        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "{} is missing required properties: {}",
                T::TYPE,
                missing.join(", ")
            )));
        }

        atomically(&mut *self.state, |s| {
            let id = object.id();
            if s.get_state(id)?.is_some() {
                return Err(Error::Conflict {
                    kind: T::TYPE,
                    id: id.to_string(),
                });
            }
            let bytes = serde_json::to_vec(&object).map_err(|source| Error::Serialization {
                key: id.to_string(),
                source,
            })?;
            s.put_state(id, &bytes)?;
            tracing::info!(kind = T::TYPE, id, "STIX object created");
            Ok(())
        })?;

        Ok(object)
    }

    /// Read the object stored under `id`.
    pub fn read(&self, id: &str) -> Result<T> {
        let bytes = self.state.get_state(id)?.ok_or_else(|| Error::NotFound {
            kind: T::TYPE,
            id: id.to_string(),
        })?;
        serde_json::from_slice(&bytes).map_err(|source| Error::Serialization {
            key: id.to_string(),
            source,
        })
    }

    pub fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.state.get_state(id)?.is_some())
    }
}

/// The STIX contract: typed views plus an unfiltered dump of every object.
pub struct StixLedger<S> {
    state: S,
}

impl<S: WorldState> StixLedger<S> {
    pub fn new(state: S) -> Self {
        Self { state }
    }

    pub fn indicators(&mut self) -> TypedRecordStore<'_, Indicator, S> {
        TypedRecordStore::new(&mut self.state)
    }

    pub fn relationships(&mut self) -> TypedRecordStore<'_, Relationship, S> {
        TypedRecordStore::new(&mut self.state)
    }

    pub fn sightings(&mut self) -> TypedRecordStore<'_, Sighting, S> {
        TypedRecordStore::new(&mut self.state)
    }

    pub fn bundles(&mut self) -> TypedRecordStore<'_, Bundle, S> {
        TypedRecordStore::new(&mut self.state)
    }

    /// Every stored object as raw JSON, in key order.
    pub fn all_objects(&self) -> Result<Vec<Value>> {
        let mut objects = Vec::new();
        let mut bookmark = String::new();
        loop {
            let page = self.state.range_scan("", "", SCAN_PAGE, &bookmark)?;
            let next = page.bookmark().to_string();
            for entry in page {
                let (key, value) = entry?;
                let object = serde_json::from_slice(&value)
                    .map_err(|source| Error::Serialization { key, source })?;
                objects.push(object);
            }
            if next.is_empty() {
                return Ok(objects);
            }
            bookmark = next;
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }
}
