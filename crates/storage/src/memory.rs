//! In-memory world state.

use crate::state::{exhausted, page_limit, resume_key};
use crate::{Error, KeyValue, Result, ScanPage, WorldState};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Ordered in-memory state. Rollback restores the snapshot taken at `begin`.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    entries: BTreeMap<String, Vec<u8>>,
    snapshot: Option<BTreeMap<String, Vec<u8>>>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every key currently stored, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl WorldState for MemoryState {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn del_state(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn range_scan(
        &self,
        start: &str,
        end: &str,
        page_size: i32,
        bookmark: &str,
    ) -> Result<ScanPage<'_>> {
        let limit = page_limit(page_size)?;
        let from = resume_key(start, bookmark);
        if exhausted(from, end) {
            return Ok(ScanPage::new(std::iter::empty(), String::new()));
        }

        let upper = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end)
        };
        let range = self.entries.range::<str, _>((Bound::Included(from), upper));

        let bookmark = range
            .clone()
            .nth(limit)
            .map(|(key, _)| key.clone())
            .unwrap_or_default();
        let entries = range
            .take(limit)
            .map(|(key, value)| Ok::<KeyValue, Error>((key.clone(), value.clone())));

        Ok(ScanPage::new(entries, bookmark))
    }

    fn begin(&mut self) -> Result<()> {
        if self.snapshot.is_some() {
            return Err(Error::Transaction("invocation already in progress".into()));
        }
        self.snapshot = Some(self.entries.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| Error::Transaction("no invocation in progress".into()))
    }

    fn rollback(&mut self) -> Result<()> {
        let snapshot = self
            .snapshot
            .take()
            .ok_or_else(|| Error::Transaction("no invocation in progress".into()))?;
        self.entries = snapshot;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomically;

    fn seeded(keys: &[&str]) -> MemoryState {
        let mut state = MemoryState::new();
        for key in keys {
            state.put_state(key, key.as_bytes()).unwrap();
        }
        state
    }

    fn page_keys(state: &MemoryState, page_size: i32, bookmark: &str) -> (Vec<String>, String) {
        let page = state.range_scan("", "", page_size, bookmark).unwrap();
        let bookmark = page.bookmark().to_string();
        let keys = page.map(|entry| entry.unwrap().0).collect();
        (keys, bookmark)
    }

    #[test]
    fn test_get_put_delete() {
        let mut state = MemoryState::new();
        assert_eq!(state.get_state("k").unwrap(), None);
        state.put_state("k", b"v1").unwrap();
        state.put_state("k", b"v2").unwrap();
        assert_eq!(state.get_state("k").unwrap(), Some(b"v2".to_vec()));
        state.del_state("k").unwrap();
        state.del_state("k").unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_scan_pages_through_everything() {
        let state = seeded(&["a", "b", "c", "d", "e"]);

        let (keys, bookmark) = page_keys(&state, 2, "");
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(bookmark, "c");

        let (keys, bookmark) = page_keys(&state, 2, &bookmark);
        assert_eq!(keys, ["c", "d"]);

        let (keys, bookmark) = page_keys(&state, 2, &bookmark);
        assert_eq!(keys, ["e"]);
        assert!(bookmark.is_empty());
    }

    #[test]
    fn test_exact_fit_page_has_no_bookmark() {
        let state = seeded(&["a", "b"]);
        let (keys, bookmark) = page_keys(&state, 2, "");
        assert_eq!(keys.len(), 2);
        assert!(bookmark.is_empty());
    }

    #[test]
    fn test_scan_respects_bounds() {
        let state = seeded(&["CTI_1", "CTI_2", "indicator--1"]);
        let keys: Vec<_> = state
            .range_scan("CTI_", "CTI`", 10, "")
            .unwrap()
            .map(|entry| entry.unwrap().0)
            .collect();
        assert_eq!(keys, ["CTI_1", "CTI_2"]);

        assert_eq!(state.range_scan("z", "a", 10, "").unwrap().count(), 0);
    }

    #[test]
    fn test_scan_rejects_non_positive_page_size() {
        let state = seeded(&["a"]);
        assert!(matches!(
            state.range_scan("", "", 0, ""),
            Err(Error::InvalidPageSize(0))
        ));
    }

    #[test]
    fn test_atomically_rolls_back_on_error() {
        let mut state = seeded(&["a"]);
        let result: Result<()> = atomically(&mut state, |s| {
            s.put_state("b", b"b")?;
            s.del_state("a")?;
            assert_eq!(s.get_state("b")?, Some(b"b".to_vec()));
            Err(Error::Transaction("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(state.keys().collect::<Vec<_>>(), ["a"]);
    }

    #[test]
    fn test_atomically_commits_on_success() {
        let mut state = MemoryState::new();
        atomically(&mut state, |s| s.put_state("a", b"1")).unwrap();
        assert_eq!(state.len(), 1);
        assert!(state.commit().is_err());
    }
}
