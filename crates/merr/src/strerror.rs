//! errno → message.
//!
//! The platform lookup writes into one growable scratch buffer that lives
//! only for the duration of the call. Callers with a fixed-size buffer use
//! [`strerror_into`], which copies what fits and reports the size the full
//! message needs, terminator included.

use crate::layout::EBUG;

/// Message for [`EBUG`]; the platform is never asked about it.
pub const MSG_SOFTWARE_BUG: &str = "HSE software bug";

/// The platform does not know the errno.
pub const MSG_INVALID: &str = "<invalid error code>";

/// The scratch buffer could not be allocated.
pub const MSG_FORMAT_FAILED: &str = "<error formatting error message>";

/// Message for `errnum` as an owned string.
///
/// ```
/// assert_eq!(merr::strerror(merr::EBUG), "HSE software bug");
/// ```
pub fn strerror(errnum: i32) -> String {
    with_message(errnum, str::to_owned)
}

/// Copy the message for `errnum` into `buf` (NUL-terminated, truncated to
/// fit) and return the size the whole message needs, terminator included.
pub fn strerror_into(errnum: i32, buf: &mut [u8]) -> usize {
    with_message(errnum, |msg| strlcpy(buf, msg) + 1)
}

/// Resolve `errnum` and hand the message to `f`. Scratch is freed on return.
fn with_message<R>(errnum: i32, f: impl FnOnce(&str) -> R) -> R {
    if errnum == EBUG {
        return f(MSG_SOFTWARE_BUG);
    }
    os_message(errnum, f)
}

/// BSD `strlcpy`: copy as much of `src` as fits, always terminate (unless
/// `buf` is empty), return `src.len()`.
pub(crate) fn strlcpy(buf: &mut [u8], src: &str) -> usize {
    if let Some(room) = buf.len().checked_sub(1) {
        let n = src.len().min(room);
        buf[..n].copy_from_slice(&src.as_bytes()[..n]);
        buf[n] = 0;
    }
    src.len()
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        use crate::layout::MSG_MAX;

        /// Initial scratch size; large enough that growing is rare.
        const SCRATCH_SZ: usize = 1000;

        enum Lookup {
            Found(usize),
            Invalid,
            NoMemory,
        }

        fn os_message<R>(errnum: i32, f: impl FnOnce(&str) -> R) -> R {
            let mut scratch = Vec::new();
            let found = lookup(errnum, &mut scratch, SCRATCH_SZ, MSG_MAX);
            render(errnum, found, &scratch, f)
        }

        fn render<R>(
            errnum: i32,
            found: Lookup,
            scratch: &[u8],
            f: impl FnOnce(&str) -> R,
        ) -> R {
            match found {
                Lookup::Found(len) => f(&String::from_utf8_lossy(&scratch[..len])),
                Lookup::Invalid => f(MSG_INVALID),
                Lookup::NoMemory => {
                    crate::kwarn!("no scratch memory to format errno {}", errnum);
                    f(MSG_FORMAT_FAILED)
                }
            }
        }

        /// Ask the platform for the message, doubling the scratch from
        /// `start` bytes on `ERANGE` until it fits or reaches `max`.
        fn lookup(errnum: i32, scratch: &mut Vec<u8>, start: usize, max: usize) -> Lookup {
            let mut cap = start.max(1);
            loop {
                if scratch.try_reserve_exact(cap - scratch.len()).is_err() {
                    return Lookup::NoMemory;
                }
                scratch.resize(cap, 0);

                // SAFETY: the pointer and length describe `scratch`, which
                // outlives the call; strerror_r writes at most `len` bytes.
                let rc = unsafe {
                    let ptr = scratch.as_mut_ptr().cast::<libc::c_char>();
                    libc::strerror_r(errnum, ptr, scratch.len())
                };
                // Pre-2.13 glibc reports through errno instead.
                let rc = if rc == -1 {
                    std::io::Error::last_os_error().raw_os_error().unwrap_or(libc::EINVAL)
                } else {
                    rc
                };

                match rc {
                    0 => return Lookup::Found(nul_pos(scratch)),
                    libc::ERANGE if cap < max => cap = (cap * 2).min(max),
                    libc::ERANGE => return Lookup::Found(nul_pos(scratch)),
                    _ => return Lookup::Invalid,
                }
            }
        }

        fn nul_pos(buf: &[u8]) -> usize {
            buf.iter().position(|&b| b == 0).unwrap_or(buf.len())
        }
    } else {
        fn os_message<R>(errnum: i32, f: impl FnOnce(&str) -> R) -> R {
            let msg = std::io::Error::from_raw_os_error(errnum).to_string();
            let suffix = format!(" (os error {})", errnum);
            let head = msg.strip_suffix(suffix.as_str()).unwrap_or(&msg);
            if head.is_empty() {
                return f(MSG_INVALID);
            }
            f(head)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_str(buf: &[u8]) -> &str {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        std::str::from_utf8(&buf[..end]).unwrap()
    }

    #[test]
    fn software_bug_bypasses_platform() {
        assert_eq!(strerror(EBUG), MSG_SOFTWARE_BUG);

        let mut buf = [0u8; 64];
        let need = strerror_into(EBUG, &mut buf);
        assert_eq!(need, MSG_SOFTWARE_BUG.len() + 1);
        assert_eq!(as_str(&buf), MSG_SOFTWARE_BUG);
    }

    #[test]
    fn known_errno() {
        assert_eq!(strerror(libc::ENOENT), "No such file or directory");
    }

    #[test]
    fn small_buffer_reports_full_size() {
        let full = strerror(libc::ENOENT);
        let mut buf = [0xffu8; 8];
        let need = strerror_into(libc::ENOENT, &mut buf);
        assert_eq!(need, full.len() + 1);
        assert_eq!(as_str(&buf), &full[..7]);
        assert_eq!(buf[7], 0);
    }

    #[test]
    fn empty_buffer_is_untouched() {
        let mut buf = [0u8; 0];
        let need = strerror_into(libc::EIO, &mut buf);
        assert_eq!(need, strerror(libc::EIO).len() + 1);
    }

    #[cfg(any(all(target_os = "linux", target_env = "gnu"), target_os = "macos"))]
    #[test]
    fn unknown_errno() {
        assert_eq!(strerror(9999), MSG_INVALID);

        let mut buf = [0u8; 64];
        assert_eq!(strerror_into(9999, &mut buf), MSG_INVALID.len() + 1);
        assert_eq!(as_str(&buf), MSG_INVALID);
    }

    #[test]
    fn strlcpy_semantics() {
        let mut buf = [0xffu8; 4];
        assert_eq!(strlcpy(&mut buf, "abcdef"), 6);
        assert_eq!(&buf, b"abc\0");

        let mut buf = [0xffu8; 8];
        assert_eq!(strlcpy(&mut buf, "ab"), 2);
        assert_eq!(&buf[..3], b"ab\0");

        assert_eq!(strlcpy(&mut [], "ab"), 2);
    }

    #[cfg(unix)]
    #[test]
    fn scratch_grows_from_a_tiny_start() {
        let full = strerror(libc::ENOENT);
        let mut scratch = Vec::new();
        match lookup(libc::ENOENT, &mut scratch, 4, MSG_MAX) {
            Lookup::Found(len) => {
                assert!(scratch.len() > 4);
                assert_eq!(&scratch[..len], full.as_bytes());
            }
            _ => panic!("ENOENT not found"),
        }

        assert_eq!(with_scratch_start(libc::ENOENT, 4), full);
    }

    #[cfg(unix)]
    fn with_scratch_start(errnum: i32, start: usize) -> String {
        let mut scratch = Vec::new();
        let found = lookup(errnum, &mut scratch, start, MSG_MAX);
        render(errnum, found, &scratch, str::to_owned)
    }

    #[cfg(any(all(target_os = "linux", target_env = "gnu"), target_os = "macos"))]
    #[test]
    fn growth_stops_at_the_cap() {
        let full = strerror(libc::ENOENT);
        let mut scratch = Vec::new();
        match lookup(libc::ENOENT, &mut scratch, 4, 8) {
            Lookup::Found(len) => {
                assert_eq!(scratch.len(), 8);
                assert!(len < full.len());
                assert!(full.as_bytes().starts_with(&scratch[..len]));
            }
            _ => panic!("capped lookup not found"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn scratch_exhaustion_has_its_own_message() {
        let msg = render(libc::EIO, Lookup::NoMemory, &[], str::to_owned);
        assert_eq!(msg, MSG_FORMAT_FAILED);

        let msg = render(libc::EIO, Lookup::Invalid, &[], str::to_owned);
        assert_eq!(msg, MSG_INVALID);
    }

    #[test]
    fn repeatable() {
        for n in [libc::EPERM, libc::EAGAIN, libc::ENOSPC, EBUG] {
            assert_eq!(strerror(n), strerror(n));
        }
    }
}
