//! Errors from the setup API (file table and formatter installation).
//!
//! Packed codes themselves never fail to decode; these cover the few calls
//! that configure process-wide state.

use core::fmt;

/// Errors that can occur while configuring the process-wide state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MerrError {
    /// A file table was already installed
    AlreadyInstalled,

    /// A domain formatter was already installed
    FormatterAlreadySet,

    /// An empty path was offered to the file table
    EmptyPath,
}

impl fmt::Display for MerrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MerrError::AlreadyInstalled => write!(f, "file table already installed"),
            MerrError::FormatterAlreadySet => write!(f, "domain formatter already installed"),
            MerrError::EmptyPath => write!(f, "empty source path"),
        }
    }
}

impl std::error::Error for MerrError {}
