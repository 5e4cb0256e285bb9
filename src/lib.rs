//! # winctl
//!
//! Resource-control utilities for a Windows host: services, registry values
//! and program launching, as safe synchronous wrappers over the Win32 API.
//!
//! - **Services**: query status, start/stop/pause, change the persisted start mode
//! - **Registry**: typed reads with delete-on-mismatch repair, bulk deletion
//! - **Processes**: launch programs hidden, elevated, or waiting for exit
//! - **Handles**: every native handle is closed on drop, on every exit path
//!
//! ## Quick Start
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> winctl::error::Result<()> {
//! use winctl::prelude::*;
//!
//! // Make sure a service does not start on boot
//! service::set_startup_type("DiagTrack", StartMode::Disabled)?;
//!
//! // Read a DWORD, removing it if someone stored it with the wrong type
//! let lookup = registry::get_value(
//!     r"HKEY_LOCAL_MACHINE\SOFTWARE\Vendor\Product",
//!     "Retries",
//!     ValueKind::DWord,
//!     Mismatch::Delete,
//! )?;
//! if let Lookup::Present(value) = lookup {
//!     println!("Retries = {value}");
//! }
//!
//! // Run an installer and wait for it
//! let launched = Launcher::new("setup.exe").arg("/quiet").hidden().wait().launch()?;
//! println!("exit code: {:?}", launched.exit_code);
//!
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
//!
//! ## Failure model
//!
//! Errors are grouped by [`error::ErrorCategory`]: invalid input is rejected
//! before any native call, handle acquisition and mutation failures carry the
//! Win32 error code, and handles are released before an error propagates.
//! A registry value with the wrong kind is not an error; it is reported as
//! [`registry::Lookup::WrongKind`]. Bulk deletions report partial failure as
//! a `bool`.

#![warn(missing_docs)]

// Core modules
pub mod error;
pub mod string;

// Windows-only plumbing
#[cfg(windows)]
pub mod handle;
#[cfg(windows)]
pub mod scm;

// Resource modules
pub mod process;
pub mod registry;
pub mod service;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::process::{Launched, Launcher};
    pub use crate::registry::{
        self, Hive, Lookup, Mismatch, OnError, RawValue, RegistryPath, Value, ValueKind,
    };
    pub use crate::service::{self, ServiceStatus, StartMode};
    pub use crate::string::{from_wide, to_wide, WideString};
}
