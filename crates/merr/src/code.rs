use std::fmt;
use std::io;

use crate::files::{self, FileId, FileTable};
use crate::layout::{
    self, ERRNO_MASK, FILE_SHIFT, LINE_MASK, LINE_SHIFT, RSVD_BIT, RSVD_MASK,
};
use crate::strinfo::{self, Reporter, StrInfo};
use crate::{kdebug, ktrace};

/// A packed error code: errno, line and source file in one `u64`.
///
/// `Merr` is `Copy` and never allocates, so it can travel through any
/// number of frames by value. Only the reporting boundary pays for
/// formatting (see [`Merr::strinfo`] and the `Display` impl).
///
/// Three shapes share the word:
///
/// - `0` is success.
/// - reserved bits clear: an opaque domain error, formatted by the
///   installed [`DomainFormatter`](crate::DomainFormatter).
/// - reserved bit set: a located error built by [`Merr::pack`].
///
/// ```
/// use merr::Merr;
///
/// let err = Merr::pack(-libc::ENOENT, None, 42);
/// assert!(err.is_located());
/// assert_eq!(err.errno(), libc::ENOENT);
/// assert_eq!(err.lineno(), 42);
/// assert!(err.file().is_none());
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Merr(u64);

/// Result alias for code paths that report a packed error.
pub type MerrResult<T> = Result<T, Merr>;

// ── Constructors ──────────────────────────────────────────────────

impl Merr {
    pub const SUCCESS: Merr = Merr(0);

    /// All bits set. Never produced by the encoder; decodes as "no location".
    pub const NO_LOCATION: Merr = Merr(u64::MAX);

    /// Reinterpret a raw word (from a log line, a C caller, another subsystem).
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Encode against the process-wide [`FileTable`].
    ///
    /// Prefer the [`merr!`](crate::merr) macro, which fills in the file
    /// and line of the call site.
    #[inline]
    pub fn pack(errnum: i32, file: Option<FileId>, line: u32) -> Self {
        Self::pack_in(files::global(), errnum, file, line)
    }

    /// Encode against an explicit table.
    ///
    /// Never fails: an id the table did not issue, or an offset too wide
    /// for the file field, degrades to an anonymous located error.
    pub fn pack_in(table: &FileTable, errnum: i32, file: Option<FileId>, line: u32) -> Self {
        if errnum == 0 {
            return Self::SUCCESS;
        }

        let errnum = errnum.unsigned_abs() as u64;
        let mut raw = 0u64;

        if let Some(id) = file {
            if table.contains(id) {
                debug_assert!(table.path(id).is_some_and(|p| !p.is_empty()));

                let off = id.get() as i64;
                if layout::offset_fits(off) {
                    raw = (off as u64) << FILE_SHIFT;
                } else {
                    kdebug!("file offset {} does not fit the file field", off);
                }
            } else {
                ktrace!("file id {} outside table of {} paths", id.get(), table.len());
            }
        }

        raw |= RSVD_BIT;
        raw |= ((line as u64) << LINE_SHIFT) & LINE_MASK;
        raw |= errnum & ERRNO_MASK;

        Self(raw)
    }

    /// Encode an `io::Error`, keeping its OS errno when it has one.
    pub fn from_io(err: &io::Error, file: Option<FileId>, line: u32) -> Self {
        let errnum = err.raw_os_error().unwrap_or_else(|| io_kind_errno(err.kind()));
        Self::pack(errnum, file, line)
    }
}

/// Best errno for an `io::Error` that did not come from the OS.
fn io_kind_errno(kind: io::ErrorKind) -> i32 {
    match kind {
        io::ErrorKind::NotFound          => libc::ENOENT,
        io::ErrorKind::PermissionDenied  => libc::EACCES,
        io::ErrorKind::ConnectionRefused => libc::ECONNREFUSED,
        io::ErrorKind::ConnectionReset   => libc::ECONNRESET,
        io::ErrorKind::ConnectionAborted => libc::ECONNABORTED,
        io::ErrorKind::NotConnected      => libc::ENOTCONN,
        io::ErrorKind::AddrInUse         => libc::EADDRINUSE,
        io::ErrorKind::AddrNotAvailable  => libc::EADDRNOTAVAIL,
        io::ErrorKind::BrokenPipe        => libc::EPIPE,
        io::ErrorKind::AlreadyExists     => libc::EEXIST,
        io::ErrorKind::WouldBlock        => libc::EAGAIN,
        io::ErrorKind::InvalidInput      => libc::EINVAL,
        io::ErrorKind::InvalidData       => libc::EINVAL,
        io::ErrorKind::TimedOut          => libc::ETIMEDOUT,
        io::ErrorKind::Interrupted       => libc::EINTR,
        io::ErrorKind::Unsupported       => libc::ENOTSUP,
        io::ErrorKind::OutOfMemory       => libc::ENOMEM,
        _                                => libc::EIO,
    }
}

// ── Accessors ─────────────────────────────────────────────────────

impl Merr {
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// `true` if the reserved bits mark this as a located error.
    #[inline]
    pub const fn is_located(self) -> bool {
        self.0 & RSVD_MASK != 0
    }

    /// Errno magnitude. Zero for success.
    #[inline]
    pub const fn errno(self) -> i32 {
        (self.0 & ERRNO_MASK) as i32
    }

    /// Line number (low 16 bits of the source line).
    #[inline]
    pub const fn lineno(self) -> u32 {
        ((self.0 & LINE_MASK) >> LINE_SHIFT) as u32
    }

    /// Raw signed file offset; 0 when no file was recorded.
    #[inline]
    pub const fn file_offset(self) -> i64 {
        layout::file_offset(self.0)
    }

    /// Printable, shortened source path, if the code carries one.
    #[inline]
    pub fn file(self) -> Option<&'static str> {
        crate::location::merr_file(self)
    }

    /// Format into `buf`; see [`strinfo::strinfo`].
    #[inline]
    pub fn strinfo(self, buf: &mut [u8]) -> StrInfo<'_> {
        strinfo::strinfo(self, buf)
    }
}

// ── Display / Debug / Error ───────────────────────────────────────

impl fmt::Display for Merr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Reporter::global().write_to(*self, f)
    }
}

impl fmt::Debug for Merr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return f.write_str("Merr(success)");
        }
        if !self.is_located() {
            return write!(f, "Merr(domain {:#018x})", self.0);
        }

        let mut d = f.debug_struct("Merr");
        d.field("errno", &self.errno());
        d.field("line", &self.lineno());
        if let Some(file) = self.file() {
            d.field("file", &file);
        }
        d.finish()
    }
}

impl std::error::Error for Merr {}

// ── io::Error conversions ─────────────────────────────────────────

impl From<io::Error> for Merr {
    /// Anonymous conversion for `?`. Use [`merr_io!`](crate::merr_io) to
    /// keep the call site.
    fn from(err: io::Error) -> Self {
        Merr::from_io(&err, None, 0)
    }
}

impl From<Merr> for io::Error {
    /// Located errors become raw OS errors; anything else is wrapped.
    /// `EBUG` is not an OS errno and keeps its own message.
    fn from(err: Merr) -> Self {
        if err.is_located() && err.errno() != 0 && err.errno() != layout::EBUG {
            return io::Error::from_raw_os_error(err.errno());
        }
        io::Error::new(io::ErrorKind::Other, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::FILE_MASK;

    fn table() -> FileTable {
        FileTable::new([
            "/build/hse/lib/kvdb/ikvdb.c",
            "/build/hse/lib/cn/cn_tree.c",
            "crates/merr/src/code.rs",
        ])
        .unwrap()
    }

    #[test]
    fn zero_errno_is_success() {
        let t = table();
        let id = t.lookup("crates/merr/src/code.rs");
        for file in [None, id, Some(FileId::new(999))] {
            for line in [0, 1, 77, u32::MAX] {
                assert_eq!(Merr::pack_in(&t, 0, file, line), Merr::SUCCESS);
            }
        }
    }

    #[test]
    fn anonymous_keeps_errno_and_line() {
        let e = Merr::pack_in(&table(), libc::EINVAL, None, 1234);
        assert!(e.is_located());
        assert_eq!(e.raw() & FILE_MASK, 0);
        assert_eq!(e.errno(), libc::EINVAL);
        assert_eq!(e.lineno(), 1234);
    }

    #[test]
    fn negative_errno_is_magnitude() {
        let e = Merr::pack_in(&table(), -libc::EAGAIN, None, 1);
        assert_eq!(e.errno(), libc::EAGAIN);
    }

    #[test]
    fn file_id_round_trips() {
        let t = table();
        let id = t.lookup("/build/hse/lib/cn/cn_tree.c").unwrap();
        let e = Merr::pack_in(&t, libc::ENOSPC, Some(id), 501);
        assert_eq!(e.file_offset(), id.get() as i64);
        assert_eq!(e.errno(), libc::ENOSPC);
        assert_eq!(e.lineno(), 501);
    }

    #[test]
    fn foreign_file_id_is_anonymous() {
        let t = table();
        for raw in [0, 4, 1000, u32::MAX] {
            let e = Merr::pack_in(&t, libc::EIO, Some(FileId::new(raw)), 9);
            assert!(e.is_located());
            assert_eq!(e.file_offset(), 0);
            assert_eq!(e.errno(), libc::EIO);
        }
    }

    #[test]
    fn line_wraps_without_spilling() {
        let e = Merr::pack_in(&table(), libc::EIO, None, 0x1_0005);
        assert_eq!(e.lineno(), 5);
        assert_eq!(e.errno(), libc::EIO);
        assert_eq!(e.file_offset(), 0);
        assert_eq!(e.raw() & RSVD_MASK, RSVD_BIT);
    }

    #[test]
    fn errno_wraps_without_spilling() {
        let e = Merr::pack_in(&table(), 0x1_0002, None, 3);
        assert_eq!(e.errno(), 2);
        assert_eq!(e.lineno(), 3);

        // |i32::MIN| has no bits in the errno field but is still an error.
        let e = Merr::pack_in(&table(), i32::MIN, None, 3);
        assert!(!e.is_ok());
        assert!(e.is_located());
        assert_eq!(e.errno(), 0);
    }

    #[test]
    fn errno_of_every_supported_value() {
        let t = table();
        let id = t.lookup("crates/merr/src/code.rs");
        for n in 1..=ERRNO_MASK as i32 {
            assert_eq!(Merr::pack_in(&t, n, id, 10).errno(), n);
            assert_eq!(Merr::pack_in(&t, -n, None, 10).errno(), n);
        }
    }

    #[test]
    fn encoder_never_yields_sentinel() {
        let e = Merr::pack_in(&table(), -1, Some(FileId::new(3)), u32::MAX);
        assert_ne!(e, Merr::NO_LOCATION);
    }

    #[test]
    fn from_io_prefers_os_errno() {
        let e = Merr::from_io(&io::Error::from_raw_os_error(libc::EBADF), None, 7);
        assert_eq!(e.errno(), libc::EBADF);
        assert_eq!(e.lineno(), 7);

        let e = Merr::from_io(&io::Error::new(io::ErrorKind::NotFound, "gone"), None, 7);
        assert_eq!(e.errno(), libc::ENOENT);
    }

    #[test]
    fn question_mark_conversion() {
        fn inner() -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::WouldBlock, "later"))
        }
        fn outer() -> MerrResult<()> {
            inner()?;
            Ok(())
        }
        assert_eq!(outer().unwrap_err().errno(), libc::EAGAIN);
    }

    #[test]
    fn into_io_error() {
        let e = Merr::pack(libc::EPERM, None, 1);
        let io_err: io::Error = e.into();
        assert_eq!(io_err.raw_os_error(), Some(libc::EPERM));

        let io_err: io::Error = Merr::from_raw(0xdead_0000_0000_0000).into();
        assert_eq!(io_err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn software_bug_survives_into_io_error() {
        let io_err: io::Error = Merr::pack(-layout::EBUG, None, 12).into();
        assert_eq!(io_err.kind(), io::ErrorKind::Other);
        assert!(io_err.raw_os_error().is_none());
        assert_eq!(io_err.to_string(), "HSE software bug");
    }

    #[test]
    fn debug_by_shape() {
        assert_eq!(format!("{:?}", Merr::SUCCESS), "Merr(success)");
        assert!(format!("{:?}", Merr::from_raw(0x42)).starts_with("Merr(domain"));

        let s = format!("{:?}", Merr::pack(libc::EIO, None, 12));
        assert!(s.contains("errno: 5"), "{s}");
        assert!(s.contains("line: 12"), "{s}");
    }

    #[test]
    fn send_sync_copy() {
        fn assert_send_sync<T: Send + Sync + Copy>() {}
        assert_send_sync::<Merr>();
        assert_eq!(std::mem::size_of::<Merr>(), 8);
    }
}
