/// Build a located [`Merr`](crate::Merr) for the call site.
///
/// The file is looked up in the process-wide table; a file missing from
/// the table (or no table at all) yields an anonymous located error that
/// still carries errno and line.
///
/// ```ignore
/// fn open_kvs(name: &str) -> MerrResult<Kvs> {
///     if name.is_empty() {
///         return Err(merr!(libc::EINVAL));
///     }
///     // ...
/// }
/// ```
#[macro_export]
macro_rules! merr {
    ($errnum:expr) => {
        $crate::Merr::pack($errnum, $crate::files::lookup(file!()), line!())
    };
}

/// Build a located [`Merr`](crate::Merr) from an `std::io::Error`.
///
/// ```ignore
/// let file = File::open(path).map_err(|e| merr_io!(e))?;
/// ```
#[macro_export]
macro_rules! merr_io {
    ($err:expr) => {
        $crate::Merr::from_io(&$err, $crate::files::lookup(file!()), line!())
    };
}

/// Early-return a located error if a condition is false.
///
/// ```ignore
/// merr_ensure!(klen <= KLEN_MAX, libc::EMSGSIZE);
/// ```
#[macro_export]
macro_rules! merr_ensure {
    ($cond:expr, $errnum:expr) => {
        if !$cond {
            return Err($crate::merr!($errnum));
        }
    };
}
