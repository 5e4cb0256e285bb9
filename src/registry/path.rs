//! Hive-qualified registry paths.
//!
//! A path has the form `HKEY_LOCAL_MACHINE\SOFTWARE\Vendor\Product`. The hive
//! token is matched case-insensitively against the five predefined roots; the
//! remainder is kept verbatim and opened under that root.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Predefined registry roots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hive {
    /// `HKEY_LOCAL_MACHINE` - system-wide settings.
    LocalMachine,
    /// `HKEY_CURRENT_USER` - settings for the current user.
    CurrentUser,
    /// `HKEY_CLASSES_ROOT` - file associations and COM registration.
    ClassesRoot,
    /// `HKEY_USERS` - all loaded user profiles.
    Users,
    /// `HKEY_CURRENT_CONFIG` - the current hardware profile.
    CurrentConfig,
}

impl Hive {
    /// All hives, in token order.
    pub const ALL: [Hive; 5] = [
        Hive::LocalMachine,
        Hive::CurrentUser,
        Hive::ClassesRoot,
        Hive::Users,
        Hive::CurrentConfig,
    ];

    /// Returns the canonical token, e.g. `HKEY_LOCAL_MACHINE`.
    pub fn token(self) -> &'static str {
        match self {
            Hive::LocalMachine => "HKEY_LOCAL_MACHINE",
            Hive::CurrentUser => "HKEY_CURRENT_USER",
            Hive::ClassesRoot => "HKEY_CLASSES_ROOT",
            Hive::Users => "HKEY_USERS",
            Hive::CurrentConfig => "HKEY_CURRENT_CONFIG",
        }
    }

    /// Matches a hive token, ignoring ASCII case.
    ///
    /// Abbreviations such as `HKLM` are not accepted.
    pub fn from_token(token: &str) -> Result<Self> {
        Hive::ALL
            .into_iter()
            .find(|hive| hive.token().eq_ignore_ascii_case(token))
            .ok_or_else(|| Error::invalid_hive(token))
    }

    /// Returns the predefined root key handle.
    #[cfg(windows)]
    pub fn root(self) -> windows::Win32::System::Registry::HKEY {
        use windows::Win32::System::Registry::{
            HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE,
            HKEY_USERS,
        };
        match self {
            Hive::LocalMachine => HKEY_LOCAL_MACHINE,
            Hive::CurrentUser => HKEY_CURRENT_USER,
            Hive::ClassesRoot => HKEY_CLASSES_ROOT,
            Hive::Users => HKEY_USERS,
            Hive::CurrentConfig => HKEY_CURRENT_CONFIG,
        }
    }
}

impl FromStr for Hive {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Hive::from_token(s)
    }
}

impl fmt::Display for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A parsed `<Hive>\<SubKeyPath>` string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryPath {
    hive: Hive,
    subkey: String,
}

impl RegistryPath {
    /// Splits `path` at its first backslash and validates the hive token.
    ///
    /// A path without a backslash names the hive root itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHive`] naming the token when it is not one of
    /// the five recognized hives.
    ///
    /// ```
    /// use winctl::registry::{Hive, RegistryPath};
    ///
    /// let path = RegistryPath::parse(r"hkey_current_user\Software\Vendor")?;
    /// assert_eq!(path.hive(), Hive::CurrentUser);
    /// assert_eq!(path.subkey(), r"Software\Vendor");
    /// # Ok::<(), winctl::error::Error>(())
    /// ```
    pub fn parse(path: &str) -> Result<Self> {
        let (token, subkey) = path.split_once('\\').unwrap_or((path, ""));
        let hive = Hive::from_token(token)?;
        Ok(Self {
            hive,
            subkey: subkey.to_string(),
        })
    }

    /// Builds a path from its parts.
    pub fn new(hive: Hive, subkey: impl Into<String>) -> Self {
        Self {
            hive,
            subkey: subkey.into(),
        }
    }

    /// Returns the hive.
    #[inline]
    pub fn hive(&self) -> Hive {
        self.hive
    }

    /// Returns the subkey path below the hive, exactly as given.
    #[inline]
    pub fn subkey(&self) -> &str {
        &self.subkey
    }

    /// Returns the non-empty key-name segments of the subkey path, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.subkey.split('\\').filter(|s| !s.is_empty())
    }

    /// Returns the path of a direct child key.
    pub fn join(&self, child: &str) -> Self {
        let subkey = if self.subkey.is_empty() {
            child.to_string()
        } else {
            format!("{}\\{}", self.subkey.trim_end_matches('\\'), child)
        };
        Self {
            hive: self.hive,
            subkey,
        }
    }
}

impl FromStr for RegistryPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RegistryPath::parse(s)
    }
}

impl fmt::Display for RegistryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subkey.is_empty() {
            f.write_str(self.hive.token())
        } else {
            write!(f, "{}\\{}", self.hive.token(), self.subkey)
        }
    }
}

#[cfg(windows)]
pub use native::resolve;

#[cfg(windows)]
mod native {
    use super::RegistryPath;
    use crate::error::Result;
    use crate::registry::key::{Access, Key};
    use tracing::debug;

    /// Opens the key named by `path` for reading and writing.
    ///
    /// Returns `Ok(None)` when the key does not exist. The hive token is
    /// validated before any native call is made.
    pub fn resolve(path: &str) -> Result<Option<Key>> {
        let parsed = RegistryPath::parse(path)?;
        let key = Key::open_optional(&parsed, Access::READ_WRITE)?;
        debug!(path, found = key.is_some(), "resolved registry path");
        Ok(key)
    }
}
