//! Typed reads with optional repair of mis-typed values.

use super::key::{Access, Key, NOT_FOUND};
use super::path::{resolve, RegistryPath};
use super::value::{Lookup, Mismatch, RawValue, Value, ValueKind};
use crate::error::{Error, Result};
use tracing::{debug, info, warn};

/// Reads `name` under `path` and checks it against `expected`.
///
/// Returns [`Lookup::Absent`] when the key or value does not exist,
/// [`Lookup::Present`] when the kinds match, and otherwise either
/// [`Lookup::WrongKind`] (`Mismatch::Keep`) or, after deleting the value,
/// [`Lookup::Absent`] (`Mismatch::Delete`). A value removed by someone else
/// between the read and the delete is not an error.
///
/// # Errors
///
/// [`Error::InvalidHive`] for a bad path, before any native call; platform
/// errors from the read; [`Error::Mutation`] if the repair delete is rejected.
///
/// ```no_run
/// use winctl::registry::{get_value, Lookup, Mismatch, ValueKind};
///
/// let path = r"HKEY_CURRENT_USER\Software\Vendor\Product";
/// match get_value(path, "Retries", ValueKind::DWord, Mismatch::Delete)? {
///     Lookup::Present(value) => println!("retries = {value}"),
///     _ => println!("retries not configured"),
/// }
/// # Ok::<(), winctl::error::Error>(())
/// ```
pub fn get_value(path: &str, name: &str, expected: ValueKind, on_mismatch: Mismatch) -> Result<Lookup> {
    let parsed = RegistryPath::parse(path)?;
    let raw = read(&parsed, name)?;
    let lookup = Lookup::classify(raw, expected);

    if !lookup.is_wrong_kind() {
        return Ok(lookup);
    }
    debug!(path, name, %expected, "registry value has the wrong kind");

    match on_mismatch {
        Mismatch::Keep => Ok(Lookup::WrongKind),
        Mismatch::Delete => {
            if let Some(key) = resolve(path)? {
                delete_if_present(&key, name)?;
            }
            Ok(Lookup::Absent)
        }
    }
}

/// Returns true if `name` exists under `path`, whatever its kind.
pub fn value_exists(path: &str, name: &str) -> Result<bool> {
    let parsed = RegistryPath::parse(path)?;
    Ok(read(&parsed, name)?.is_some())
}

/// Writes `value` as `name` under `path`, creating the key if needed.
pub fn set_value(path: &str, name: &str, value: &Value) -> Result<()> {
    let parsed = RegistryPath::parse(path)?;
    Key::create(&parsed, Access::READ_WRITE)?.set_value(name, value)
}

fn read(path: &RegistryPath, name: &str) -> Result<Option<RawValue>> {
    match Key::open_optional(path, Access::READ)? {
        Some(key) => key.get_raw(name),
        None => Ok(None),
    }
}

fn delete_if_present(key: &Key, name: &str) -> Result<()> {
    match key.delete_value(name) {
        Ok(()) => {
            info!(path = key.path(), name, "deleted mis-typed registry value");
            Ok(())
        }
        Err(e) if e.win32_error_code() == Some(NOT_FOUND) => {
            warn!(path = key.path(), name, "mis-typed value already removed");
            Ok(())
        }
        Err(e) => Err(Error::Mutation {
            target: format!("{}\\{name}", key.path()),
            code: e.win32_error_code().unwrap_or_default(),
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::registry::key::tests::Scratch;

    #[test]
    fn test_absent_value_and_absent_key() {
        let scratch = Scratch::new("absent");
        assert_eq!(
            get_value(&scratch.text(), "nope", ValueKind::String, Mismatch::Keep).unwrap(),
            Lookup::Absent
        );
        let missing = format!(r"{}\no\such\key", scratch.text());
        assert_eq!(
            get_value(&missing, "nope", ValueKind::String, Mismatch::Delete).unwrap(),
            Lookup::Absent
        );
    }

    #[test]
    fn test_present_value_round_trips() {
        let scratch = Scratch::new("present");
        let path = scratch.text();
        set_value(&path, "Count", &Value::dword(0xFFFF_FFFF)).unwrap();
        assert_eq!(
            get_value(&path, "Count", ValueKind::DWord, Mismatch::Delete).unwrap(),
            Lookup::Present(Value::dword(0xFFFF_FFFF))
        );
    }

    #[test]
    fn test_wrong_kind_kept() {
        let scratch = Scratch::new("keep");
        let path = scratch.text();
        set_value(&path, "Count", &Value::string("12")).unwrap();

        assert_eq!(
            get_value(&path, "Count", ValueKind::DWord, Mismatch::Keep).unwrap(),
            Lookup::WrongKind
        );
        assert!(value_exists(&path, "Count").unwrap());
    }

    #[test]
    fn test_wrong_kind_deleted() {
        let scratch = Scratch::new("repair");
        let path = scratch.text();
        set_value(&path, "Count", &Value::qword(12)).unwrap();

        assert_eq!(
            get_value(&path, "Count", ValueKind::DWord, Mismatch::Delete).unwrap(),
            Lookup::Absent
        );
        assert!(!value_exists(&path, "Count").unwrap());
    }

    /// `REG_SZ` holding an unpaired high surrogate, then `A`.
    fn lone_surrogate() -> RawValue {
        RawValue::new(1, vec![0x00, 0xD8, 0x41, 0x00, 0x00, 0x00])
    }

    /// `REG_DWORD` with only two bytes of payload.
    fn short_dword() -> RawValue {
        RawValue::new(4, vec![1, 2])
    }

    #[test]
    fn test_corrupt_value_of_other_kind_is_kept_as_wrong_kind() {
        let scratch = Scratch::new("corrupt-keep");
        let path = scratch.text();
        let key = scratch.key();
        key.set_raw("Text", &lone_surrogate()).unwrap();
        key.set_raw("Count", &short_dword()).unwrap();
        drop(key);

        assert_eq!(
            get_value(&path, "Text", ValueKind::DWord, Mismatch::Keep).unwrap(),
            Lookup::WrongKind
        );
        assert_eq!(
            get_value(&path, "Count", ValueKind::String, Mismatch::Keep).unwrap(),
            Lookup::WrongKind
        );
        assert!(value_exists(&path, "Text").unwrap());
        assert!(value_exists(&path, "Count").unwrap());
    }

    #[test]
    fn test_corrupt_value_is_deleted_on_repair() {
        let scratch = Scratch::new("corrupt-delete");
        let path = scratch.text();
        let key = scratch.key();
        key.set_raw("Text", &lone_surrogate()).unwrap();
        key.set_raw("Count", &short_dword()).unwrap();
        drop(key);

        assert_eq!(
            get_value(&path, "Text", ValueKind::DWord, Mismatch::Delete).unwrap(),
            Lookup::Absent
        );
        // A short DWORD cannot be read as a DWORD either.
        assert_eq!(
            get_value(&path, "Count", ValueKind::DWord, Mismatch::Delete).unwrap(),
            Lookup::Absent
        );
        assert!(!value_exists(&path, "Text").unwrap());
        assert!(!value_exists(&path, "Count").unwrap());
    }

    #[test]
    fn test_delete_race_is_tolerated() {
        let scratch = Scratch::new("race");
        // The value is already gone when the repair runs.
        assert!(delete_if_present(&scratch.key(), "gone").is_ok());
    }

    #[test]
    fn test_invalid_hive() {
        let err = get_value(r"HKEY_LOCAL\x", "v", ValueKind::String, Mismatch::Keep).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidInput);
        assert!(value_exists(r"HKCU\x", "v").is_err());
    }
}
