//! Process-wide table of source paths.
//!
//! A located error does not carry its file name; it carries a [`FileId`],
//! the 1-based index of the path in a sorted, deduplicated [`FileTable`].
//! The table is installed once at startup and never mutated afterwards, so
//! encoders and decoders read it without synchronization.
//!
//! ```
//! use merr::files::{FileTable, FileId};
//!
//! let table = FileTable::new(["src/kvs/cursor.rs", "src/cn/omf.rs", "src/cn/omf.rs"]).unwrap();
//! assert_eq!(table.len(), 2);
//! let id = table.lookup("src/kvs/cursor.rs").unwrap();
//! assert_eq!(table.path(id), Some("src/kvs/cursor.rs"));
//! assert!(table.path(FileId::new(7)).is_none());
//! ```

use std::sync::OnceLock;

use crate::error::MerrError;
use crate::kinfo;

/// Index of a path in a [`FileTable`]. Zero never names a file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct FileId(u32);

impl FileId {
    /// Wrap a raw index. The table decides whether it names anything.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Sorted, deduplicated source paths.
#[derive(Debug, Clone, Default)]
pub struct FileTable {
    paths: Vec<&'static str>,
}

impl FileTable {
    pub const fn empty() -> Self {
        Self { paths: Vec::new() }
    }

    /// Build a table from build-time paths (usually `file!()` values).
    ///
    /// Duplicates collapse to one entry. Empty strings are rejected.
    pub fn new<I>(paths: I) -> Result<Self, MerrError>
    where
        I: IntoIterator<Item = &'static str>,
    {
        let mut paths: Vec<&'static str> = paths.into_iter().collect();
        if paths.iter().any(|p| p.is_empty()) {
            return Err(MerrError::EmptyPath);
        }
        paths.sort_unstable();
        paths.dedup();
        paths.shrink_to_fit();

        debug_assert!(paths.windows(2).all(|w| w[0] < w[1]));

        Ok(Self { paths })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Id of `path`, if present.
    pub fn lookup(&self, path: &str) -> Option<FileId> {
        let pos = self.paths.binary_search(&path).ok()?;
        u32::try_from(pos + 1).ok().map(FileId)
    }

    /// `true` if `id` was issued by this table.
    #[inline]
    pub fn contains(&self, id: FileId) -> bool {
        id.0 != 0 && (id.0 as usize) <= self.paths.len()
    }

    pub fn path(&self, id: FileId) -> Option<&'static str> {
        if !self.contains(id) {
            return None;
        }
        Some(self.paths[id.0 as usize - 1])
    }

    /// Resolve a decoded (signed) file offset.
    pub(crate) fn at_offset(&self, off: i64) -> Option<&'static str> {
        let raw = u32::try_from(off).ok()?;
        self.path(FileId(raw))
    }

    pub fn iter(&self) -> impl Iterator<Item = (FileId, &'static str)> + '_ {
        self.paths
            .iter()
            .enumerate()
            .map(|(i, p)| (FileId(i as u32 + 1), *p))
    }
}

// ── Process-wide table ────────────────────────────────────────────

static TABLE: OnceLock<FileTable> = OnceLock::new();
static EMPTY: FileTable = FileTable::empty();

/// Install the process-wide table. Only the first call succeeds.
///
/// ```
/// use merr::files::{self, FileTable};
/// use merr::MerrError;
///
/// let t = files::install(FileTable::new(["lib/kvdb/kvdb.rs"]).unwrap()).unwrap();
/// assert_eq!(t.len(), 1);
/// assert!(files::lookup("lib/kvdb/kvdb.rs").is_some());
/// assert_eq!(files::install(FileTable::empty()).unwrap_err(), MerrError::AlreadyInstalled);
/// ```
pub fn install(table: FileTable) -> Result<&'static FileTable, MerrError> {
    let mut fresh = false;
    let installed = TABLE.get_or_init(|| {
        fresh = true;
        table
    });
    if !fresh {
        return Err(MerrError::AlreadyInstalled);
    }
    kinfo!("file table installed: {} paths", installed.len());
    Ok(installed)
}

/// The installed table, or an empty one before [`install`].
#[inline]
pub fn global() -> &'static FileTable {
    TABLE.get().unwrap_or(&EMPTY)
}

/// Look `path` up in the process-wide table.
#[inline]
pub fn lookup(path: &str) -> Option<FileId> {
    global().lookup(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FileTable {
        FileTable::new([
            "/build/hse/lib/kvs/kvs_cursor.c",
            "/build/hse/lib/cn/omf.c",
            "src/util/hse_err.rs",
            "/build/hse/lib/cn/omf.c",
        ])
        .unwrap()
    }

    #[test]
    fn dedup_and_sort() {
        let t = table();
        assert_eq!(t.len(), 3);
        let paths: Vec<_> = t.iter().map(|(_, p)| p).collect();
        assert_eq!(
            paths,
            ["/build/hse/lib/cn/omf.c", "/build/hse/lib/kvs/kvs_cursor.c", "src/util/hse_err.rs"]
        );
    }

    #[test]
    fn ids_are_one_based() {
        let t = table();
        let (first, path) = t.iter().next().unwrap();
        assert_eq!(first.get(), 1);
        assert_eq!(t.lookup(path), Some(first));
        assert!(!t.contains(FileId::new(0)));
        assert!(t.contains(FileId::new(3)));
        assert!(!t.contains(FileId::new(4)));
    }

    #[test]
    fn lookup_missing() {
        assert!(table().lookup("nope.rs").is_none());
        assert!(FileTable::empty().lookup("src/util/hse_err.rs").is_none());
    }

    #[test]
    fn offsets_resolve_only_in_range() {
        let t = table();
        assert_eq!(t.at_offset(3), Some("src/util/hse_err.rs"));
        assert!(t.at_offset(0).is_none());
        assert!(t.at_offset(-1).is_none());
        assert!(t.at_offset(4).is_none());
        assert!(t.at_offset(i64::MAX).is_none());
    }

    #[test]
    fn empty_path_rejected() {
        assert_eq!(FileTable::new(["a.rs", ""]).unwrap_err(), MerrError::EmptyPath);
    }

    #[test]
    fn global_defaults_to_empty() {
        // Nothing in this test binary installs a table.
        assert!(global().is_empty());
        assert!(lookup(file!()).is_none());
    }
}
