//! Decoding the location half of a packed code.
//!
//! Every function here is total over `u64`: codes read back from logs or
//! handed over by another process may carry any bit pattern, so a bad
//! offset or an unprintable path turns into a fixed sentinel string instead
//! of a panic or an out-of-bounds read.

use crate::code::Merr;
use crate::files::{self, FileTable};
use crate::kdebug;
use crate::layout::PATH_MAX;

/// Returned when the file offset does not name an entry of the table.
pub const BUG_CORRUPT_OFFSET: &str = "hse_merr_bug3u";

/// Returned when the tail of the path holds a non-printable byte.
pub const BUG_UNPRINTABLE: &str = "hse_merr_bug2u";

/// Errno magnitude of `err` (0 for success).
#[inline]
pub fn merr_errno(err: Merr) -> i32 {
    err.errno()
}

#[inline]
pub fn merr_lineno(err: Merr) -> u32 {
    err.lineno()
}

/// Shortened source path of `err`, resolved in the process-wide table.
#[inline]
pub fn merr_file(err: Merr) -> Option<&'static str> {
    file_in(files::global(), err)
}

/// Shortened source path of `err`, resolved in `table`.
///
/// `None` for success, for the all-ones sentinel and for codes without a
/// file. At most the last two path components are kept.
pub fn file_in(table: &FileTable, err: Merr) -> Option<&'static str> {
    if err == Merr::SUCCESS || err == Merr::NO_LOCATION {
        return None;
    }

    let off = err.file_offset();
    if off == 0 {
        return None;
    }

    match table.at_offset(off) {
        Some(path) => Some(shorten(path)),
        None => {
            kdebug!("file offset {} outside table of {} paths", off, table.len());
            Some(BUG_CORRUPT_OFFSET)
        }
    }
}

/// Keep the last two `/`-separated components of `path`.
///
/// Scans backward over at most `PATH_MAX` bytes.
fn shorten(path: &'static str) -> &'static str {
    let bytes = path.as_bytes();
    let len = bytes.len().min(PATH_MAX);
    let mut slashes = 0;

    for i in (0..len).rev() {
        let c = bytes[i];
        if !is_print(c) {
            return BUG_UNPRINTABLE;
        }
        if c == b'/' {
            slashes += 1;
            if slashes == 2 {
                return &path[i + 1..len];
            }
        }
    }

    &path[..len]
}

#[inline]
fn is_print(c: u8) -> bool {
    (0x20..0x7f).contains(&c)
}
