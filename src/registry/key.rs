//! Open registry keys.
//!
//! [`Key`] owns an `HKEY` and closes it on drop. Reads return `Ok(None)` for
//! missing values so callers can tell "absent" apart from real failures.

use super::path::RegistryPath;
use super::value::{RawValue, Value};
use crate::error::{Error, Result};
use crate::string::WideString;
use tracing::{debug, info};
use windows::Win32::Foundation::{
    ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, ERROR_SUCCESS, WIN32_ERROR,
};
use windows::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegDeleteTreeW, RegDeleteValueW, RegOpenKeyExW,
    RegQueryValueExW, RegSetValueExW, HKEY, KEY_READ, KEY_WRITE, REG_OPTION_NON_VOLATILE,
    REG_SAM_FLAGS, REG_VALUE_TYPE,
};

/// Attempts made to read a value that keeps growing between size query and read.
const READ_ATTEMPTS: usize = 3;

/// Standard `DELETE` right, needed to remove subtrees.
const KEY_DELETE: REG_SAM_FLAGS = REG_SAM_FLAGS(0x0001_0000);

/// Win32 code for a missing key or value.
pub(crate) const NOT_FOUND: u32 = ERROR_FILE_NOT_FOUND.0;

fn check_error(err: WIN32_ERROR) -> Result<()> {
    if err == ERROR_SUCCESS {
        Ok(())
    } else {
        Err(Error::Windows(windows::core::Error::from(err.to_hresult())))
    }
}

/// Registry access rights.
#[derive(Clone, Copy, Debug)]
pub struct Access(pub REG_SAM_FLAGS);

impl Access {
    /// Read access.
    pub const READ: Self = Self(KEY_READ);

    /// Read, write and delete access.
    pub const READ_WRITE: Self = Self(REG_SAM_FLAGS(KEY_READ.0 | KEY_WRITE.0 | KEY_DELETE.0));
}

/// An opened registry key.
#[derive(Debug)]
pub struct Key {
    hkey: HKEY,
    path: String,
}

impl Key {
    /// Opens an existing key.
    ///
    /// # Errors
    ///
    /// Fails if the key does not exist or access is denied.
    pub fn open(path: &RegistryPath, access: Access) -> Result<Self> {
        Self::open_optional(path, access)?.ok_or_else(|| {
            Error::Windows(windows::core::Error::from(ERROR_FILE_NOT_FOUND))
        })
    }

    /// Opens an existing key, returning `Ok(None)` if it does not exist.
    pub fn open_optional(path: &RegistryPath, access: Access) -> Result<Option<Self>> {
        let subkey = WideString::new(path.subkey());
        let mut hkey = HKEY::default();

        // SAFETY: the hive root is a predefined key, subkey is a valid
        // null-terminated string and hkey is a valid output parameter.
        let err = unsafe {
            RegOpenKeyExW(path.hive().root(), subkey.as_pcwstr(), 0, access.0, &mut hkey)
        };
        if err == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        check_error(err)?;

        debug!(path = %path, "opened registry key");
        Ok(Some(Self {
            hkey,
            path: path.to_string(),
        }))
    }

    /// Creates a key, or opens it if it already exists.
    pub fn create(path: &RegistryPath, access: Access) -> Result<Self> {
        let subkey = WideString::new(path.subkey());
        let mut hkey = HKEY::default();

        // SAFETY: the hive root is a predefined key, subkey is a valid
        // null-terminated string and hkey is a valid output parameter.
        let err = unsafe {
            RegCreateKeyExW(
                path.hive().root(),
                subkey.as_pcwstr(),
                0,
                None,
                REG_OPTION_NON_VOLATILE,
                access.0,
                None,
                &mut hkey,
                None,
            )
        };
        check_error(err)?;

        debug!(path = %path, "created or opened registry key");
        Ok(Self {
            hkey,
            path: path.to_string(),
        })
    }

    /// Returns the full path this key was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reads and decodes a value, returning `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Besides platform failures, fails when the stored payload does not
    /// decode as its declared type; use [`Key::get_raw`] to inspect such data.
    pub fn get_value(&self, name: &str) -> Result<Option<Value>> {
        self.get_raw(name)?.map(RawValue::decode).transpose()
    }

    /// Reads a value without decoding it, returning `Ok(None)` if it does
    /// not exist.
    pub fn get_raw(&self, name: &str) -> Result<Option<RawValue>> {
        let name_wide = WideString::new(name);
        let mut value_type = REG_VALUE_TYPE::default();
        let mut size = 0u32;

        // SAFETY: self.hkey is open; a null data pointer only reports the size.
        let err = unsafe {
            RegQueryValueExW(
                self.hkey,
                name_wide.as_pcwstr(),
                None,
                Some(&mut value_type),
                None,
                Some(&mut size),
            )
        };
        if err == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        if err != ERROR_SUCCESS && err != ERROR_MORE_DATA {
            return Err(Error::Windows(windows::core::Error::from(err.to_hresult())));
        }

        // Another writer may grow the value between the size query and the
        // read; take the new size and try again a bounded number of times.
        for _ in 0..READ_ATTEMPTS {
            let mut buffer = vec![0u8; size as usize];

            // SAFETY: buffer holds `size` bytes and size reports its length.
            let err = unsafe {
                RegQueryValueExW(
                    self.hkey,
                    name_wide.as_pcwstr(),
                    None,
                    Some(&mut value_type),
                    Some(buffer.as_mut_ptr()),
                    Some(&mut size),
                )
            };
            if err == ERROR_MORE_DATA {
                continue;
            }
            if err == ERROR_FILE_NOT_FOUND {
                return Ok(None);
            }
            check_error(err)?;

            buffer.truncate(size as usize);
            debug!(path = %self.path, name, raw_type = value_type.0, "read registry value");
            return Ok(Some(RawValue::new(value_type.0, buffer)));
        }

        Err(Error::invalid_data(format!(
            "value '{name}' under '{}' kept changing size",
            self.path
        )))
    }

    /// Writes a value.
    pub fn set_value(&self, name: &str, value: &Value) -> Result<()> {
        self.set_raw(name, &RawValue::from(value))
    }

    /// Writes a type code and payload as given, without validating the bytes.
    pub fn set_raw(&self, name: &str, raw: &RawValue) -> Result<()> {
        let name_wide = WideString::new(name);

        // SAFETY: self.hkey is open with write access and raw.data is a
        // complete buffer of the length passed.
        let err = unsafe {
            RegSetValueExW(
                self.hkey,
                name_wide.as_pcwstr(),
                0,
                REG_VALUE_TYPE(raw.raw_type),
                Some(&raw.data),
            )
        };
        check_error(err)?;

        info!(path = %self.path, name, raw_type = raw.raw_type, "wrote registry value");
        Ok(())
    }

    /// Deletes a value.
    ///
    /// # Errors
    ///
    /// Fails if the value does not exist or access is denied.
    pub fn delete_value(&self, name: &str) -> Result<()> {
        let name_wide = WideString::new(name);
        // SAFETY: self.hkey is open and name_wide is valid.
        let err = unsafe { RegDeleteValueW(self.hkey, name_wide.as_pcwstr()) };
        check_error(err)?;
        info!(path = %self.path, name, "deleted registry value");
        Ok(())
    }

    /// Deletes a subkey together with all of its subkeys and values.
    ///
    /// # Errors
    ///
    /// Fails if the subkey does not exist or access is denied.
    pub fn delete_tree(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            // RegDeleteTreeW with an empty name would empty this key instead.
            return Err(Error::invalid_input("subkey name must not be empty"));
        }
        let name_wide = WideString::new(name);
        // SAFETY: self.hkey is open and name_wide is valid.
        let err = unsafe { RegDeleteTreeW(self.hkey, name_wide.as_pcwstr()) };
        check_error(err)?;
        info!(path = %self.path, subkey = name, "deleted registry subtree");
        Ok(())
    }

    /// Returns the raw HKEY handle.
    pub fn as_raw(&self) -> HKEY {
        self.hkey
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        // SAFETY: the key is owned exclusively and closed only here.
        unsafe {
            let _ = RegCloseKey(self.hkey);
        }
        debug!(path = %self.path, "closed registry key");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::registry::Hive;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A scratch key under `HKEY_CURRENT_USER\Software\winctl-tests`,
    /// removed with its subtree on drop.
    pub(crate) struct Scratch {
        pub(crate) path: RegistryPath,
    }

    impl Scratch {
        pub(crate) fn new(tag: &str) -> Self {
            static NEXT: AtomicUsize = AtomicUsize::new(0);
            let n = NEXT.fetch_add(1, Ordering::SeqCst);
            let path = RegistryPath::new(
                Hive::CurrentUser,
                format!(
                    r"Software\winctl-tests\{tag}-{}-{n}",
                    std::process::id()
                ),
            );
            Key::create(&path, Access::READ_WRITE).unwrap();
            Self { path }
        }

        pub(crate) fn key(&self) -> Key {
            Key::open(&self.path, Access::READ_WRITE).unwrap()
        }

        pub(crate) fn text(&self) -> String {
            self.path.to_string()
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let parent = RegistryPath::new(Hive::CurrentUser, r"Software\winctl-tests");
            if let Ok(Some(key)) = Key::open_optional(&parent, Access::READ_WRITE) {
                if let Some(leaf) = self.path.segments().last() {
                    let _ = key.delete_tree(leaf);
                }
            }
        }
    }

    #[test]
    fn test_set_and_get_each_kind() {
        let scratch = Scratch::new("kinds");
        let key = scratch.key();
        let values = [
            ("s", Value::string("hello")),
            ("e", Value::ExpandString("%SystemRoot%".into())),
            ("m", Value::multi_string(["a", "b"])),
            ("d", Value::dword(42)),
            ("q", Value::qword(1 << 40)),
            ("b", Value::binary(vec![1, 2, 3])),
        ];
        for (name, value) in &values {
            key.set_value(name, value).unwrap();
        }
        for (name, value) in &values {
            assert_eq!(key.get_value(name).unwrap().as_ref(), Some(value));
        }
    }

    #[test]
    fn test_raw_write_is_read_back_unchanged() {
        let scratch = Scratch::new("raw");
        let key = scratch.key();
        let raw = RawValue::new(4, vec![1, 2]);
        key.set_raw("short", &raw).unwrap();

        assert_eq!(key.get_raw("short").unwrap(), Some(raw));
        assert!(key.get_value("short").is_err());
    }

    #[test]
    fn test_missing_value_is_none() {
        let scratch = Scratch::new("missing");
        assert!(scratch.key().get_value("nope").unwrap().is_none());
    }

    #[test]
    fn test_delete_missing_value_fails_with_not_found() {
        let scratch = Scratch::new("delete");
        let err = scratch.key().delete_value("nope").unwrap_err();
        assert_eq!(err.win32_error_code(), Some(NOT_FOUND));
    }

    #[test]
    fn test_delete_tree_removes_nested_keys() {
        let scratch = Scratch::new("tree");
        let nested = scratch.path.join(r"a\b\c");
        Key::create(&nested, Access::READ_WRITE)
            .unwrap()
            .set_value("v", &Value::dword(1))
            .unwrap();

        scratch.key().delete_tree("a").unwrap();
        assert!(Key::open_optional(&scratch.path.join("a"), Access::READ)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete_tree_rejects_empty_name() {
        let scratch = Scratch::new("empty");
        assert!(scratch.key().delete_tree("").is_err());
    }
}
