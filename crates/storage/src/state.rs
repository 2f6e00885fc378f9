//! World-state interface shared by every contract.

use crate::{Error, Result};

/// A stored key and its raw value.
pub type KeyValue = (String, Vec<u8>);

/// Ordered key-value state with paginated range scans.
///
/// One contract invocation is bracketed by [`WorldState::begin`] and
/// [`WorldState::commit`]; writes made in between become visible to later
/// reads in the same invocation and are discarded by [`WorldState::rollback`].
/// Use [`atomically`] rather than calling these directly.
pub trait WorldState {
    /// Read the value stored under `key`.
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn del_state(&mut self, key: &str) -> Result<()>;

    /// Scan keys in `[start, end)` in lexical order, at most `page_size` of them.
    ///
    /// Empty `start` and `end` mean unbounded. A non-empty `bookmark` taken
    /// from a previous page resumes the scan where that page stopped.
    fn range_scan(&self, start: &str, end: &str, page_size: i32, bookmark: &str)
    -> Result<ScanPage<'_>>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}

/// One page of a range scan.
///
/// Entries are handed out one at a time for the consumer to decode. The
/// backend may buffer the rows it fetched (SQLite does); the bookmark is
/// known up front and is empty once the range is exhausted.
pub struct ScanPage<'a> {
    entries: Box<dyn Iterator<Item = Result<KeyValue>> + 'a>,
    bookmark: String,
}

impl<'a> ScanPage<'a> {
    pub fn new(entries: impl Iterator<Item = Result<KeyValue>> + 'a, bookmark: String) -> Self {
        Self {
            entries: Box::new(entries),
            bookmark,
        }
    }

    /// Continuation token for the next page.
    pub fn bookmark(&self) -> &str {
        &self.bookmark
    }

    /// Whether more entries remain after this page.
    pub fn has_more(&self) -> bool {
        !self.bookmark.is_empty()
    }
}

impl Iterator for ScanPage<'_> {
    type Item = Result<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }
}

/// Run `f` as one invocation: commit if it succeeds, roll back if it fails.
pub fn atomically<S, T, E, F>(state: &mut S, f: F) -> std::result::Result<T, E>
where
    S: WorldState + ?Sized,
    E: From<Error>,
    F: FnOnce(&mut S) -> std::result::Result<T, E>,
{
    state.begin()?;
    match f(state) {
        Ok(value) => {
            state.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = state.rollback() {
                tracing::error!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}

/// Validate a caller-supplied page size.
pub(crate) fn page_limit(page_size: i32) -> Result<usize> {
    if page_size <= 0 {
        return Err(Error::InvalidPageSize(page_size));
    }
    Ok(page_size as usize)
}

/// First key a scan should consider.
pub(crate) fn resume_key<'k>(start: &'k str, bookmark: &'k str) -> &'k str {
    if bookmark > start { bookmark } else { start }
}

/// Whether `[from, end)` is empty.
pub(crate) fn exhausted(from: &str, end: &str) -> bool {
    !end.is_empty() && from >= end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_limit() {
        assert_eq!(page_limit(5).unwrap(), 5);
        assert!(matches!(page_limit(0), Err(Error::InvalidPageSize(0))));
        assert!(matches!(page_limit(-3), Err(Error::InvalidPageSize(-3))));
    }

    #[test]
    fn test_resume_key_prefers_later_key() {
        assert_eq!(resume_key("", ""), "");
        assert_eq!(resume_key("CTI_", ""), "CTI_");
        assert_eq!(resume_key("", "CTI_2"), "CTI_2");
        assert_eq!(resume_key("CTI_5", "CTI_2"), "CTI_5");
    }

    #[test]
    fn test_exhausted() {
        assert!(!exhausted("a", ""));
        assert!(!exhausted("a", "b"));
        assert!(exhausted("b", "b"));
        assert!(exhausted("c", "b"));
    }
}
