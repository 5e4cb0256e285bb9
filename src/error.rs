//! Error handling for service and registry operations.
//!
//! Every fatal failure carries enough context (the offending path, service
//! name and Win32 error code) to be diagnosed from the message alone. Errors
//! are grouped into an [`ErrorCategory`] so callers can tell caller mistakes
//! apart from privilege problems and failed mutations.

use thiserror::Error;

#[cfg(windows)]
use windows::core::Error as WinError;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// A Windows API error that has no more specific classification.
    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    Windows(#[from] WinError),

    /// The leading token of a registry path is not a recognized hive.
    #[error("Invalid registry hive '{token}'")]
    InvalidHive {
        /// The token that failed to match.
        token: String,
    },

    /// A caller-supplied value was outside its enumerated set.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The service control manager could not be opened.
    #[error("Could not open the service control manager (error {code}): {message}")]
    OpenManager {
        /// The Win32 error code.
        code: u32,
        /// The system message for `code`.
        message: String,
    },

    /// A service could not be opened with the requested access.
    #[error("Could not open service '{service}' (error {code}): {message}")]
    OpenService {
        /// The service short name.
        service: String,
        /// The Win32 error code.
        code: u32,
        /// The system message for `code`.
        message: String,
    },

    /// A change was rejected after every handle had been acquired.
    #[error("Could not modify '{target}' (error {code}): {message}")]
    Mutation {
        /// The service name or registry path that was being changed.
        target: String,
        /// The Win32 error code.
        code: u32,
        /// The system message for `code`.
        message: String,
    },

    /// An invalid handle was provided or returned.
    #[error("Invalid handle: {context}")]
    InvalidHandle {
        /// Description of the invalid handle context.
        context: &'static str,
    },

    /// Raw data returned by the system did not have the expected layout.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A string conversion error occurred.
    #[error("String conversion error: {0}")]
    StringConversion(String),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classes of failure, used to choose a recovery policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller mistake; fails before any native call and is never retried.
    InvalidInput,
    /// A manager or service handle could not be opened.
    HandleAcquisition,
    /// A native change failed after its handles were acquired.
    Mutation,
    /// Any other platform failure.
    Platform,
}

impl Error {
    /// Creates a new invalid hive error.
    pub fn invalid_hive(token: impl Into<String>) -> Self {
        Error::InvalidHive {
            token: token.into(),
        }
    }

    /// Creates a new invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Creates a new invalid handle error with the given context.
    pub fn invalid_handle(context: &'static str) -> Self {
        Error::InvalidHandle { context }
    }

    /// Creates a new invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Error::InvalidData(msg.into())
    }

    /// Creates a new string conversion error.
    pub fn string_conversion(msg: impl Into<String>) -> Self {
        Error::StringConversion(msg.into())
    }

    /// Returns the class of this failure.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidHive { .. } | Error::InvalidInput(_) => ErrorCategory::InvalidInput,
            Error::OpenManager { .. } | Error::OpenService { .. } => {
                ErrorCategory::HandleAcquisition
            }
            Error::Mutation { .. } => ErrorCategory::Mutation,
            _ => ErrorCategory::Platform,
        }
    }

    /// Returns the Win32 error code carried by this error, if any.
    pub fn win32_error_code(&self) -> Option<u32> {
        match self {
            #[cfg(windows)]
            Error::Windows(e) => Some(win32_code(e.code().0)),
            Error::OpenManager { code, .. }
            | Error::OpenService { code, .. }
            | Error::Mutation { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Recovers a Win32 error code from an HRESULT.
///
/// HRESULTs built with `HRESULT_FROM_WIN32` carry the code in the low word
/// under facility 7; any other HRESULT is returned as its raw bit pattern.
pub fn win32_code(hresult: i32) -> u32 {
    let bits = hresult as u32;
    if bits & 0xFFFF_0000 == 0x8007_0000 {
        bits & 0xFFFF
    } else {
        bits
    }
}

/// Extension trait for converting Windows `Result` types.
#[cfg(windows)]
pub trait ResultExt<T> {
    /// Converts a Windows result to our Result type.
    fn to_result(self) -> Result<T>;

    /// Maps a failure to [`Error::Mutation`] naming `target`.
    fn or_mutation(self, target: &str) -> Result<T>;
}

#[cfg(windows)]
impl<T> ResultExt<T> for windows::core::Result<T> {
    fn to_result(self) -> Result<T> {
        self.map_err(Error::from)
    }

    fn or_mutation(self, target: &str) -> Result<T> {
        self.map_err(|e| {
            let (code, message) = describe(&e);
            Error::Mutation {
                target: target.to_string(),
                code,
                message,
            }
        })
    }
}

/// Splits a Windows error into its Win32 code and system message.
#[cfg(windows)]
pub(crate) fn describe(e: &WinError) -> (u32, String) {
    (win32_code(e.code().0), e.message().to_string())
}

/// Gets the last Windows error as our Error type.
#[cfg(windows)]
pub fn last_error() -> Error {
    Error::Windows(WinError::from_win32())
}
