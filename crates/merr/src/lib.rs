//! # merr: packed located errors
//!
//! An error is one `u64`: errno, line number and an index into a table of
//! source paths. It is `Copy`, never allocates, and can be returned through
//! any number of frames. Only the reporting boundary turns it into text:
//!
//! ```text
//! kvs/kvs_cursor.c:412: No space left on device
//! ```
//!
//! ## Design
//!
//! A [`Merr`] has three shapes:
//!
//! - **success**: zero.
//! - **located** (reserved bit set): errno + line + optional [`FileId`],
//!   built by [`merr!`] or [`Merr::pack`].
//! - **domain** (reserved bits clear): owned by another subsystem and
//!   formatted by the installed [`DomainFormatter`].
//!
//! Source paths live in a [`FileTable`] installed once at startup; the code
//! stores the path's index, never an address. Decoding is total: any `u64`
//! formats to *something* printable without panicking, with fixed sentinel
//! strings standing in for corrupted offsets or unprintable paths.
//!
//! ## Quick Start
//!
//! ```rust
//! use merr::{merr, FileTable, MerrResult};
//!
//! merr::files::install(FileTable::new([file!()]).unwrap()).unwrap();
//!
//! fn flush() -> MerrResult<()> {
//!     Err(merr!(libc::ENOSPC))
//! }
//!
//! let err = flush().unwrap_err();
//! assert_eq!(err.errno(), libc::ENOSPC);
//! assert!(err.file().is_some());
//!
//! let mut buf = [0u8; 256];
//! let info = err.strinfo(&mut buf);
//! assert!(info.as_str().ends_with("No space left on device"));
//! assert_eq!(info.need(), info.as_str().len() + 1);
//! ```
//!
//! ## Environment
//!
//! | Variable            | Effect |
//! |---------------------|--------|
//! | `MERR_LOG_LEVEL`    | off, error, warn (default), info, debug, trace |
//! | `MERR_FLUSH_EPRINT` | flush stderr after each log line |

pub mod layout;
pub mod files;
mod code;
pub mod location;
mod strerror;
pub mod strinfo;
#[macro_use]
mod macros;
mod error;
pub mod kprint;
pub mod env;

// ── Public API ────────────────────────────────────────────────────

pub use code::{Merr, MerrResult};
pub use error::MerrError;
pub use files::{FileId, FileTable};
pub use layout::EBUG;
pub use location::{merr_errno, merr_file, merr_lineno};
pub use strerror::{strerror, strerror_into};
pub use strinfo::{
    set_domain_formatter, strinfo, DomainFormatter, HexFormatter, Reporter, StrInfo,
};
pub use kprint::{set_log_level, LogLevel};
