//! UTF-16 conversions for Windows APIs and registry payloads.
//!
//! Windows APIs take null-terminated UTF-16 strings, and registry string data
//! arrives as little-endian UTF-16 bytes. These helpers convert between those
//! layouts and Rust strings.

use crate::error::{Error, Result};

/// Converts a Rust string to a null-terminated UTF-16 vector.
///
/// # Example
///
/// ```
/// use winctl::string::to_wide;
///
/// let wide = to_wide("Hello");
/// assert_eq!(wide, vec![72, 101, 108, 108, 111, 0]);
/// ```
#[inline]
pub fn to_wide(s: &str) -> Vec<u16> {
    // UTF-16 length never exceeds UTF-8 length; +1 for the terminator.
    let mut result = Vec::with_capacity(s.len() + 1);
    result.extend(s.encode_utf16());
    result.push(0);
    result
}

/// Converts a UTF-16 slice to a Rust `String`, stopping at the first null.
///
/// ```
/// use winctl::string::{to_wide, from_wide};
///
/// let s = from_wide(&to_wide("Hello")).unwrap();
/// assert_eq!(s, "Hello");
/// ```
#[inline]
pub fn from_wide(wide: &[u16]) -> Result<String> {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16(&wide[..len])
        .map_err(|_| Error::string_conversion("Invalid UTF-16 sequence"))
}

/// Encodes a list of strings as a `REG_MULTI_SZ` block.
///
/// Each entry is null-terminated and the block ends with an extra null.
pub fn to_multi_wide<S: AsRef<str>>(strings: &[S]) -> Vec<u16> {
    let mut wide = Vec::new();
    for s in strings {
        wide.extend(s.as_ref().encode_utf16());
        wide.push(0);
    }
    wide.push(0);
    wide
}

/// Decodes a `REG_MULTI_SZ` block into its entries.
///
/// Decoding stops at the first empty entry, which marks the end of the block.
/// A block missing its final terminators is accepted.
pub fn from_multi_wide(wide: &[u16]) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    for entry in wide.split(|&c| c == 0) {
        if entry.is_empty() {
            break;
        }
        strings.push(
            String::from_utf16(entry)
                .map_err(|_| Error::string_conversion("Invalid UTF-16 sequence"))?,
        );
    }
    Ok(strings)
}

/// Reinterprets little-endian bytes as UTF-16 code units.
///
/// A trailing odd byte is dropped.
pub fn bytes_to_wide(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect()
}

/// Serializes UTF-16 code units as little-endian bytes.
pub fn wide_to_bytes(wide: &[u16]) -> Vec<u8> {
    wide.iter().flat_map(|&w| w.to_le_bytes()).collect()
}

/// An owned null-terminated wide string for passing to Windows APIs.
#[derive(Clone)]
pub struct WideString {
    buffer: Vec<u16>,
}

impl WideString {
    /// Creates a new `WideString` from a Rust string.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self {
            buffer: to_wide(s),
        }
    }

    /// Returns the string as a PCWSTR for use with Windows APIs.
    ///
    /// The pointer is valid for as long as `self` is alive.
    #[cfg(windows)]
    #[inline]
    pub fn as_pcwstr(&self) -> windows::core::PCWSTR {
        windows::core::PCWSTR::from_raw(self.buffer.as_ptr())
    }

    /// Returns the length in UTF-16 code units, not including the null terminator.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len().saturating_sub(1)
    }

    /// Returns true if the string is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the underlying buffer, terminator included.
    #[inline]
    pub fn as_slice(&self) -> &[u16] {
        &self.buffer
    }
}

impl From<&str> for WideString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Replaces `%NAME%` references with the values of environment variables.
///
/// Unknown variables are left as written.
#[cfg(windows)]
pub fn expand_environment(s: &str) -> Result<String> {
    use windows::Win32::System::Environment::ExpandEnvironmentStringsW;

    let source = WideString::new(s);
    let mut buffer = vec![0u16; source.as_slice().len()];
    // The environment can change between calls; retry with the reported size.
    for _ in 0..3 {
        // SAFETY: source is null-terminated and buffer is writable for its
        // full length, which is passed with the slice.
        let needed = unsafe { ExpandEnvironmentStringsW(source.as_pcwstr(), Some(&mut buffer)) };
        if needed == 0 {
            return Err(crate::error::last_error());
        }
        if needed as usize <= buffer.len() {
            return from_wide(&buffer);
        }
        buffer = vec![0u16; needed as usize];
    }
    Err(Error::invalid_data(format!("expansion of '{s}' kept changing size")))
}
