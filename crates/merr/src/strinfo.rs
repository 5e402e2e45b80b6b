//! Formatting a packed code into a caller-supplied buffer.
//!
//! Same two-phase contract as `snprintf`: the message is truncated to fit
//! and always NUL-terminated, and the returned size says how many bytes
//! (terminator included) a retry needs to get all of it.
//!
//! ```text
//! Merr ──► 0 ? ─────────────────────────────► "success"
//!          │
//!          ├─ reserved bits clear ───────────► DomainFormatter::strinfo
//!          │
//!          └─ located ─► "<file>:<line>: " ─► strerror_into(errno)
//! ```

use core::fmt::{self, Write};
use std::sync::OnceLock;

use crate::code::Merr;
use crate::error::MerrError;
use crate::files::{self, FileTable};
use crate::layout::{MSG_MAX, PREFIX_SLACK};
use crate::location;
use crate::strerror::{strerror_into, strlcpy};
use crate::{kinfo, kwarn};

/// Formats codes whose reserved bits are clear.
///
/// Those codes belong to another subsystem; their bits are opaque here.
/// Implementations follow the same contract as [`strinfo`]: write a
/// NUL-terminated (possibly truncated) message into `buf` and return the
/// size the full message needs, terminator included.
pub trait DomainFormatter: Send + Sync {
    fn strinfo(&self, err: Merr, buf: &mut [u8]) -> usize;
}

/// Fallback domain formatter: prints the raw word in hex.
#[derive(Debug, Clone, Copy, Default)]
pub struct HexFormatter;

impl DomainFormatter for HexFormatter {
    fn strinfo(&self, err: Merr, buf: &mut [u8]) -> usize {
        let mut w = SliceWriter::new(buf);
        let _ = write!(w, "domain error {:#x}", err.raw());
        w.finish() + 1
    }
}

static DOMAIN: OnceLock<Box<dyn DomainFormatter>> = OnceLock::new();

/// Install the process-wide domain formatter. Only the first call succeeds.
///
/// ```
/// use merr::{DomainFormatter, Merr, MerrError};
///
/// struct Mpool;
/// impl DomainFormatter for Mpool {
///     fn strinfo(&self, _err: Merr, buf: &mut [u8]) -> usize {
///         let msg = b"mpool: media error\0";
///         let n = msg.len().min(buf.len());
///         buf[..n].copy_from_slice(&msg[..n]);
///         msg.len()
///     }
/// }
///
/// merr::set_domain_formatter(Box::new(Mpool)).unwrap();
/// assert_eq!(merr::set_domain_formatter(Box::new(Mpool)), Err(MerrError::FormatterAlreadySet));
///
/// let mut buf = [0u8; 64];
/// let info = merr::strinfo(Merr::from_raw(0x1234), &mut buf);
/// assert_eq!(info.as_str(), "mpool: media error");
/// assert_eq!(info.need(), 19);
/// ```
pub fn set_domain_formatter(formatter: Box<dyn DomainFormatter>) -> Result<(), MerrError> {
    match DOMAIN.set(formatter) {
        Ok(()) => {
            kinfo!("domain formatter installed");
            Ok(())
        }
        Err(_) => {
            kwarn!("domain formatter already installed");
            Err(MerrError::FormatterAlreadySet)
        }
    }
}

/// The installed domain formatter, or [`HexFormatter`].
pub fn domain_formatter() -> &'static dyn DomainFormatter {
    match DOMAIN.get() {
        Some(f) => f.as_ref(),
        None => &HexFormatter,
    }
}

// ── StrInfo ───────────────────────────────────────────────────────

/// What [`strinfo`] wrote, and what it would have needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrInfo<'a> {
    text: &'a str,
    need: usize,
}

impl<'a> StrInfo<'a> {
    fn new(buf: &'a [u8], need: usize) -> Self {
        Self { text: terminated(buf), need }
    }

    /// The message as written (up to the terminator).
    #[inline]
    pub fn as_str(&self) -> &'a str {
        self.text
    }

    /// Bytes, terminator included, needed for the complete message.
    #[inline]
    pub fn need(&self) -> usize {
        self.need
    }

    /// `true` if a larger buffer would have produced more text.
    #[inline]
    pub fn truncated(&self) -> bool {
        self.need > self.text.len() + 1
    }
}

/// Text before the first NUL, cut back to a UTF-8 boundary.
fn terminated(buf: &[u8]) -> &str {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let bytes = &buf[..end];
    match std::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => std::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
    }
}

// ── Reporter ──────────────────────────────────────────────────────

/// A file table and a domain formatter: everything needed to turn a
/// [`Merr`] into text.
#[derive(Clone, Copy)]
pub struct Reporter<'a> {
    table: &'a FileTable,
    domain: &'a dyn DomainFormatter,
}

impl<'a> Reporter<'a> {
    pub fn new(table: &'a FileTable, domain: &'a dyn DomainFormatter) -> Self {
        Self { table, domain }
    }

    /// Process-wide table and formatter.
    pub fn global() -> Reporter<'static> {
        Reporter {
            table: files::global(),
            domain: domain_formatter(),
        }
    }

    /// Format `err` into `buf`.
    pub fn strinfo<'b>(&self, err: Merr, buf: &'b mut [u8]) -> StrInfo<'b> {
        let need = if err.is_ok() {
            strlcpy(buf, "success") + 1
        } else if !err.is_located() {
            self.domain.strinfo(err, buf)
        } else {
            self.located(err, buf)
        };
        StrInfo::new(buf, need)
    }

    fn located(&self, err: Merr, buf: &mut [u8]) -> usize {
        let mut w = SliceWriter::new(buf);
        if let Some(file) = location::file_in(self.table, err) {
            let _ = write!(w, "{}:{}: ", file, err.lineno());
        }
        let off = w.finish();

        // Not even the prefix fits: give the caller an estimate to retry with.
        if off >= buf.len() {
            return off + PREFIX_SLACK;
        }

        off + strerror_into(err.errno(), &mut buf[off..])
    }

    /// Write the complete message to `out`, retrying on the heap when the
    /// stack buffer is too small.
    ///
    /// The retry is capped at [`MSG_MAX`]; if even that cannot be
    /// allocated the truncated stack text is written.
    pub fn write_to<W: Write + ?Sized>(&self, err: Merr, out: &mut W) -> fmt::Result {
        let mut stack = [0u8; 256];
        let info = self.strinfo(err, &mut stack);
        if !info.truncated() {
            return out.write_str(info.as_str());
        }

        let want = info.need().min(MSG_MAX);
        let mut heap = Vec::new();
        if heap.try_reserve_exact(want).is_err() {
            kwarn!("no memory for a {} byte message, truncating", want);
            return out.write_str(info.as_str());
        }
        heap.resize(want, 0);
        out.write_str(self.strinfo(err, &mut heap).as_str())
    }
}

/// Format `err` with the process-wide table and domain formatter.
///
/// ```
/// use merr::Merr;
///
/// let mut buf = [0u8; 64];
/// let info = merr::strinfo(Merr::SUCCESS, &mut buf);
/// assert_eq!(info.as_str(), "success");
/// assert_eq!(info.need(), 8);
/// ```
#[inline]
pub fn strinfo(err: Merr, buf: &mut [u8]) -> StrInfo<'_> {
    Reporter::global().strinfo(err, buf)
}

// ── SliceWriter ───────────────────────────────────────────────────

/// `fmt::Write` over a fixed buffer with `snprintf` semantics: output past
/// the end is counted but dropped, and one byte is kept for the terminator.
pub(crate) struct SliceWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
    len: usize,
}

impl<'a> SliceWriter<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0, len: 0 }
    }

    /// Terminate and return the untruncated length (terminator excluded).
    pub(crate) fn finish(self) -> usize {
        if let Some(b) = self.buf.get_mut(self.pos) {
            *b = 0;
        }
        self.len
    }
}

impl Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.buf.len().saturating_sub(1).saturating_sub(self.pos);
        let n = s.len().min(room);
        self.buf[self.pos..self.pos + n].copy_from_slice(&s.as_bytes()[..n]);
        self.pos += n;
        self.len += s.len();
        Ok(())
    }
}
