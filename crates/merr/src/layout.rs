//! Bit layout of a packed [`Merr`](crate::Merr).
//!
//! ```text
//! 63                        38 37      32 31           16 15            0
//! ┌───────────────────────────┬──────────┬───────────────┬───────────────┐
//! │  file offset (i26)        │ reserved │  line (u16)   │  errno (u16)  │
//! │  index into FileTable     │ ≠0 ⇒ loc │  wraps        │  magnitude    │
//! └───────────────────────────┴──────────┴───────────────┴───────────────┘
//! ```
//!
//! The reserved bits are the only discriminator between a located error and
//! an opaque domain error. The encoder sets bit 32; a domain error leaves all
//! six bits clear.

pub const FILE_SHIFT: u32 = 38;
pub const RSVD_SHIFT: u32 = 32;
pub const LINE_SHIFT: u32 = 16;
pub const ERRNO_SHIFT: u32 = 0;

pub const FILE_MASK: u64 = 0xffff_ffc0_0000_0000;
pub const RSVD_MASK: u64 = 0x0000_003f_0000_0000;
pub const LINE_MASK: u64 = 0x0000_0000_ffff_0000;
pub const ERRNO_MASK: u64 = 0x0000_0000_0000_ffff;

/// Bit set by the encoder on every located error.
pub const RSVD_BIT: u64 = 1 << RSVD_SHIFT;

/// Largest file offset representable in the signed field.
pub const FILE_OFFSET_MAX: i64 = (1 << (63 - FILE_SHIFT)) - 1;

/// "Software defect" errno. Never handed to the platform lookup.
pub const EBUG: i32 = 991;

/// Upper bound on the bytes scanned when shortening a path.
pub const PATH_MAX: usize = 4096;

/// Slack added to the required size when even the location prefix
/// does not fit the caller's buffer.
pub const PREFIX_SLACK: usize = 200;

/// Ceiling on any heap buffer sized from a reported message length.
pub const MSG_MAX: usize = 64 * 1024;

/// Sign-extend the file field of `raw`.
#[inline]
pub const fn file_offset(raw: u64) -> i64 {
    ((raw & FILE_MASK) as i64) >> FILE_SHIFT
}

/// `true` if `off` survives a store into the file field unchanged.
#[inline]
pub const fn offset_fits(off: i64) -> bool {
    ((((off as u64) << FILE_SHIFT) as i64) >> FILE_SHIFT) == off
}
