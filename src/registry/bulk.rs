//! Bulk deletion of values and subtrees under one key.
//!
//! Both operations resolve the key once, walk the names in the order given,
//! and report only whether anything failed.

use crate::error::Result;
use tracing::warn;

/// Failure policy for bulk deletions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OnError {
    /// Record the failure and carry on with the next item.
    #[default]
    Continue,
    /// Stop at the first failure.
    Abort,
}

/// Applies `delete` to each item in order; returns true if any call failed.
///
/// With [`OnError::Abort`] the remaining items are skipped after the first
/// failure.
pub fn delete_each<S, F>(items: &[S], on_error: OnError, mut delete: F) -> bool
where
    S: AsRef<str>,
    F: FnMut(&str) -> Result<()>,
{
    let mut failed = false;
    for item in items {
        let item = item.as_ref();
        if let Err(e) = delete(item) {
            warn!(item, error = %e, "registry deletion failed");
            failed = true;
            if on_error == OnError::Abort {
                break;
            }
        }
    }
    failed
}

#[cfg(windows)]
pub use native::{delete_subtrees, delete_values};

#[cfg(windows)]
mod native {
    use super::{delete_each, OnError};
    use crate::error::Result;
    use crate::registry::path::resolve;
    use tracing::debug;

    /// Deletes each named value under `path`.
    ///
    /// Returns `Ok(false)` without doing anything when the key does not
    /// exist, and otherwise `Ok(true)` iff at least one value could not be
    /// deleted (a missing value counts as a failure). Only an invalid hive is
    /// an `Err`.
    pub fn delete_values<S: AsRef<str>>(path: &str, names: &[S], on_error: OnError) -> Result<bool> {
        let Some(key) = resolve(path)? else {
            debug!(path, "key not found; no values to delete");
            return Ok(false);
        };
        Ok(delete_each(names, on_error, |name| key.delete_value(name)))
    }

    /// Deletes each named subkey of `path` together with everything below it.
    ///
    /// Same outcome rules as [`delete_values`].
    pub fn delete_subtrees<S: AsRef<str>>(path: &str, keys: &[S], on_error: OnError) -> Result<bool> {
        let Some(key) = resolve(path)? else {
            debug!(path, "key not found; no subtrees to delete");
            return Ok(false);
        };
        Ok(delete_each(keys, on_error, |name| key.delete_tree(name)))
    }
}
