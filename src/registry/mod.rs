//! Windows Registry access.
//!
//! Paths are given as human-readable strings such as
//! `HKEY_LOCAL_MACHINE\SOFTWARE\Vendor`. Every call opens its own key handle
//! and closes it before returning.
//!
//! - [`RegistryPath`] / [`resolve`]: parse a path and open its key
//! - [`get_value`]: typed read with optional delete-on-mismatch
//! - [`delete_values`] / [`delete_subtrees`]: bulk removal with an [`OnError`] policy
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> winctl::error::Result<()> {
//! use winctl::registry::{delete_values, OnError};
//!
//! let failed = delete_values(
//!     r"HKEY_CURRENT_USER\Software\Vendor",
//!     &["LastRun", "CachePath"],
//!     OnError::Continue,
//! )?;
//! if failed {
//!     eprintln!("some values could not be removed");
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```

mod bulk;
mod path;
mod value;

#[cfg(windows)]
mod accessor;
#[cfg(windows)]
pub mod key;

pub use bulk::{delete_each, OnError};
pub use path::{Hive, RegistryPath};
pub use value::{Lookup, Mismatch, RawValue, Value, ValueKind};

#[cfg(windows)]
pub use accessor::{get_value, set_value, value_exists};
#[cfg(windows)]
pub use bulk::{delete_subtrees, delete_values};
#[cfg(windows)]
pub use key::{Access, Key};
#[cfg(windows)]
pub use path::resolve;
