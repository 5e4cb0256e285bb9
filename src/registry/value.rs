//! Typed registry values.
//!
//! Raw registry data arrives as a [`RawValue`]. Its kind is checked against
//! [`ValueKind`] from the `REG_*` type alone, and only a matching payload is
//! decoded into [`Value`]. Lookups report one of three outcomes through
//! [`Lookup`], so "missing" and "present with the wrong kind" are never
//! confused with a real payload.

use crate::error::{Error, Result};
use crate::string::{bytes_to_wide, from_multi_wide, from_wide, to_multi_wide, to_wide, wide_to_bytes};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

const REG_SZ: u32 = 1;
const REG_EXPAND_SZ: u32 = 2;
const REG_BINARY: u32 = 3;
const REG_DWORD: u32 = 4;
const REG_MULTI_SZ: u32 = 7;
const REG_QWORD: u32 = 11;

/// The declared kind a caller expects a value to have.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `REG_SZ` or `REG_EXPAND_SZ`.
    String,
    /// `REG_DWORD`.
    DWord,
    /// `REG_QWORD`.
    QWord,
    /// `REG_MULTI_SZ`.
    MultiString,
    /// `REG_BINARY`, or any other raw-byte type.
    Binary,
}

impl ValueKind {
    /// Returns the lower-case name accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::DWord => "dword",
            ValueKind::QWord => "qword",
            ValueKind::MultiString => "multi-string",
            ValueKind::Binary => "binary",
        }
    }

    /// Returns the kind a raw `REG_*` type code is read as.
    ///
    /// Types without a dedicated kind count as [`ValueKind::Binary`].
    pub fn of_raw(raw_type: u32) -> Self {
        match raw_type {
            REG_SZ | REG_EXPAND_SZ => ValueKind::String,
            REG_DWORD => ValueKind::DWord,
            REG_QWORD => ValueKind::QWord,
            REG_MULTI_SZ => ValueKind::MultiString,
            _ => ValueKind::Binary,
        }
    }
}

impl FromStr for ValueKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "sz" | "reg_sz" => Ok(ValueKind::String),
            "dword" | "reg_dword" => Ok(ValueKind::DWord),
            "qword" | "reg_qword" => Ok(ValueKind::QWord),
            "multi-string" | "multistring" | "reg_multi_sz" => Ok(ValueKind::MultiString),
            "binary" | "reg_binary" => Ok(ValueKind::Binary),
            _ => Err(Error::invalid_input(format!("unknown value kind '{s}'"))),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded registry value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// A string value (`REG_SZ`).
    String(String),
    /// An unexpanded string value (`REG_EXPAND_SZ`).
    ExpandString(String),
    /// A multi-string value (`REG_MULTI_SZ`).
    MultiString(Vec<String>),
    /// A 32-bit integer (`REG_DWORD`).
    DWord(u32),
    /// A 64-bit integer (`REG_QWORD`).
    QWord(u64),
    /// Binary data (`REG_BINARY`).
    Binary(Vec<u8>),
    /// Any other registry type, kept as raw bytes.
    Other {
        /// The raw `REG_*` type code.
        raw_type: u32,
        /// The stored bytes.
        data: Vec<u8>,
    },
}

impl Value {
    /// Creates a string value.
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Creates a DWORD value.
    pub fn dword(v: u32) -> Self {
        Value::DWord(v)
    }

    /// Creates a QWORD value.
    pub fn qword(v: u64) -> Self {
        Value::QWord(v)
    }

    /// Creates a binary value.
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Value::Binary(data.into())
    }

    /// Creates a multi-string value.
    pub fn multi_string<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::MultiString(items.into_iter().map(Into::into).collect())
    }

    /// Returns the kind this value satisfies.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) | Value::ExpandString(_) => ValueKind::String,
            Value::MultiString(_) => ValueKind::MultiString,
            Value::DWord(_) => ValueKind::DWord,
            Value::QWord(_) => ValueKind::QWord,
            Value::Binary(_) | Value::Other { .. } => ValueKind::Binary,
        }
    }

    /// Returns true if this value has the shape `expected` requires.
    #[inline]
    pub fn matches(&self, expected: ValueKind) -> bool {
        self.kind() == expected
    }

    /// Gets the value as a string, if it is one.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::ExpandString(s) => Some(s),
            _ => None,
        }
    }

    /// Gets the value as a u32, if it is one.
    pub fn as_dword(&self) -> Option<u32> {
        match self {
            Value::DWord(v) => Some(*v),
            _ => None,
        }
    }

    /// Gets the value as a u64, if it is one.
    pub fn as_qword(&self) -> Option<u64> {
        match self {
            Value::QWord(v) => Some(*v),
            _ => None,
        }
    }

    /// Gets the value as a list of strings, if it is one.
    pub fn as_multi_string(&self) -> Option<&[String]> {
        match self {
            Value::MultiString(v) => Some(v),
            _ => None,
        }
    }

    /// Gets the raw bytes of a binary-kind value.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(v) | Value::Other { data: v, .. } => Some(v),
            _ => None,
        }
    }

    /// Decodes raw registry data of type `raw_type`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] when an integer payload is shorter than
    /// its type requires, and [`Error::StringConversion`] for invalid UTF-16.
    pub fn decode(raw_type: u32, data: Vec<u8>) -> Result<Self> {
        match raw_type {
            REG_SZ => Ok(Value::String(from_wide(&bytes_to_wide(&data))?)),
            REG_EXPAND_SZ => Ok(Value::ExpandString(from_wide(&bytes_to_wide(&data))?)),
            REG_MULTI_SZ => Ok(Value::MultiString(from_multi_wide(&bytes_to_wide(&data))?)),
            REG_DWORD => {
                let bytes: [u8; 4] = data
                    .get(..4)
                    .and_then(|b| b.try_into().ok())
                    .ok_or_else(|| Error::invalid_data(format!("DWORD of {} bytes", data.len())))?;
                Ok(Value::DWord(u32::from_le_bytes(bytes)))
            }
            REG_QWORD => {
                let bytes: [u8; 8] = data
                    .get(..8)
                    .and_then(|b| b.try_into().ok())
                    .ok_or_else(|| Error::invalid_data(format!("QWORD of {} bytes", data.len())))?;
                Ok(Value::QWord(u64::from_le_bytes(bytes)))
            }
            REG_BINARY => Ok(Value::Binary(data)),
            raw_type => Ok(Value::Other { raw_type, data }),
        }
    }

    /// Encodes this value as a raw registry type and payload.
    pub fn encode(&self) -> (u32, Vec<u8>) {
        match self {
            Value::String(s) => (REG_SZ, wide_to_bytes(&to_wide(s))),
            Value::ExpandString(s) => (REG_EXPAND_SZ, wide_to_bytes(&to_wide(s))),
            Value::MultiString(items) => (REG_MULTI_SZ, wide_to_bytes(&to_multi_wide(items.as_slice()))),
            Value::DWord(v) => (REG_DWORD, v.to_le_bytes().to_vec()),
            Value::QWord(v) => (REG_QWORD, v.to_le_bytes().to_vec()),
            Value::Binary(data) => (REG_BINARY, data.clone()),
            Value::Other { raw_type, data } => (*raw_type, data.clone()),
        }
    }

    /// Parses command-line input into a value of `kind`.
    ///
    /// Integers accept decimal or `0x` hex. Binary input is a string of hex
    /// digit pairs, optionally separated by spaces. Only multi-string values
    /// take more than one input.
    pub fn parse_as(kind: ValueKind, inputs: &[&str]) -> Result<Self> {
        let single = || match inputs {
            [one] => Ok(*one),
            _ => Err(Error::invalid_input(format!(
                "{kind} takes exactly one input, got {}",
                inputs.len()
            ))),
        };
        match kind {
            ValueKind::String => Ok(Value::string(single()?)),
            ValueKind::DWord => {
                let v = parse_integer(single()?)?;
                u32::try_from(v)
                    .map(Value::DWord)
                    .map_err(|_| Error::invalid_input(format!("{v} does not fit in a DWORD")))
            }
            ValueKind::QWord => parse_integer(single()?).map(Value::QWord),
            ValueKind::MultiString => Ok(Value::multi_string(inputs.iter().copied())),
            ValueKind::Binary => parse_hex(&inputs.concat()).map(Value::Binary),
        }
    }
}

fn parse_integer(s: &str) -> Result<u64> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|_| Error::invalid_input(format!("'{s}' is not an integer")))
}

fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = s.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(Error::invalid_input("binary input needs an even number of hex digits"));
    }
    digits
        .chunks_exact(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|p| u8::from_str_radix(p, 16).ok())
                .ok_or_else(|| Error::invalid_input(format!("invalid hex byte in '{s}'")))
        })
        .collect()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) | Value::ExpandString(s) => f.write_str(s),
            Value::MultiString(items) => f.write_str(&items.join("\n")),
            Value::DWord(v) => write!(f, "{v}"),
            Value::QWord(v) => write!(f, "{v}"),
            Value::Binary(data) | Value::Other { data, .. } => {
                for (i, byte) in data.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(windows)]
impl Value {
    /// Expands the environment references of an [`Value::ExpandString`],
    /// returning the result as [`Value::String`]. Other values are returned
    /// unchanged.
    pub fn expand(self) -> Result<Value> {
        match self {
            Value::ExpandString(s) => Ok(Value::String(crate::string::expand_environment(&s)?)),
            other => Ok(other),
        }
    }
}

/// Registry data exactly as stored, before decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawValue {
    /// The `REG_*` type code.
    pub raw_type: u32,
    /// The stored bytes.
    pub data: Vec<u8>,
}

impl RawValue {
    /// Wraps a type code and payload.
    pub fn new(raw_type: u32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            raw_type,
            data: data.into(),
        }
    }

    /// Returns the kind implied by the type code, whatever the payload holds.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        ValueKind::of_raw(self.raw_type)
    }

    /// Decodes the payload; see [`Value::decode`].
    pub fn decode(self) -> Result<Value> {
        Value::decode(self.raw_type, self.data)
    }
}

impl From<&Value> for RawValue {
    fn from(value: &Value) -> Self {
        let (raw_type, data) = value.encode();
        Self { raw_type, data }
    }
}

/// What to do with a value whose kind does not match the expected one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mismatch {
    /// Leave it in place and report [`Lookup::WrongKind`].
    #[default]
    Keep,
    /// Delete it and report [`Lookup::Absent`].
    Delete,
}

/// Outcome of a typed registry read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// The key or value does not exist (or was just deleted).
    Absent,
    /// The value exists but has a different kind, or a payload that does not
    /// decode as its declared type; it was not deleted.
    WrongKind,
    /// The value exists with the expected kind.
    Present(Value),
}

impl Lookup {
    /// Classifies a raw read against the expected kind.
    ///
    /// The type code is compared first and the payload is decoded only when
    /// it matches, so a malformed payload under another type is simply the
    /// wrong kind. A malformed payload under the expected type (a short
    /// `REG_DWORD`, a string with unpaired surrogates) cannot be read as that
    /// kind either and is also reported as [`Lookup::WrongKind`].
    pub fn classify(raw: Option<RawValue>, expected: ValueKind) -> Self {
        let Some(raw) = raw else {
            return Lookup::Absent;
        };
        if raw.kind() != expected {
            return Lookup::WrongKind;
        }
        let raw_type = raw.raw_type;
        match raw.decode() {
            Ok(value) => Lookup::Present(value),
            Err(e) => {
                warn!(raw_type, %expected, error = %e, "registry payload does not decode as its type");
                Lookup::WrongKind
            }
        }
    }

    /// Returns the value if present with the expected kind.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Lookup::Present(value) => Some(value),
            _ => None,
        }
    }

    /// Returns true for [`Lookup::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    /// Returns true for [`Lookup::WrongKind`].
    pub fn is_wrong_kind(&self) -> bool {
        matches!(self, Lookup::WrongKind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_strings() {
        let data = wide_to_bytes(&to_wide("C:\\Tools"));
        assert_eq!(
            Value::decode(REG_SZ, data.clone()).unwrap(),
            Value::string("C:\\Tools")
        );
        assert_eq!(
            Value::decode(REG_EXPAND_SZ, data).unwrap(),
            Value::ExpandString("C:\\Tools".into())
        );

        let block = wide_to_bytes(&to_multi_wide(&["one", "two"]));
        assert_eq!(
            Value::decode(REG_MULTI_SZ, block).unwrap(),
            Value::multi_string(["one", "two"])
        );
    }

    #[test]
    fn test_decode_integers() {
        assert_eq!(
            Value::decode(REG_DWORD, vec![0x2a, 0, 0, 0]).unwrap(),
            Value::DWord(42)
        );
        assert_eq!(
            Value::decode(REG_QWORD, 0xFFFF_FFFFu64.to_le_bytes().to_vec()).unwrap(),
            Value::QWord(0xFFFF_FFFF)
        );
        assert!(matches!(
            Value::decode(REG_DWORD, vec![1, 2]),
            Err(Error::InvalidData(_))
        ));
        assert!(Value::decode(REG_QWORD, vec![0; 4]).is_err());
    }

    #[test]
    fn test_decode_unknown_type_is_binary_kind() {
        // REG_NONE and REG_DWORD_BIG_ENDIAN both surface as raw bytes.
        for raw_type in [0, 5] {
            let value = Value::decode(raw_type, vec![1, 2, 3, 4]).unwrap();
            assert_eq!(value.kind(), ValueKind::Binary);
            assert_eq!(value.as_binary(), Some(&[1u8, 2, 3, 4][..]));
        }
    }

    #[test]
    fn test_encode_matches_decode() {
        for value in [
            Value::string("text"),
            Value::ExpandString("%TEMP%".into()),
            Value::multi_string(["a", "b"]),
            Value::dword(7),
            Value::qword(u64::MAX),
            Value::binary(vec![0xde, 0xad]),
        ] {
            let (raw_type, data) = value.encode();
            assert_eq!(Value::decode(raw_type, data).unwrap(), value);
        }
    }

    #[test]
    fn test_kind_matching() {
        assert!(Value::ExpandString("x".into()).matches(ValueKind::String));
        assert!(Value::dword(1).matches(ValueKind::DWord));
        assert!(!Value::dword(1).matches(ValueKind::QWord));
        assert!(!Value::string("1").matches(ValueKind::DWord));
        assert!(Value::Other { raw_type: 0, data: vec![] }.matches(ValueKind::Binary));
        assert!(!Value::multi_string(["x"]).matches(ValueKind::String));
    }

    #[test]
    fn test_lookup_classification() {
        assert_eq!(Lookup::classify(None, ValueKind::DWord), Lookup::Absent);
        assert_eq!(
            Lookup::classify(Some((&Value::dword(5)).into()), ValueKind::DWord),
            Lookup::Present(Value::dword(5))
        );
        assert_eq!(
            Lookup::classify(Some((&Value::string("5")).into()), ValueKind::DWord),
            Lookup::WrongKind
        );
    }

    #[test]
    fn test_malformed_payload_under_other_type_is_wrong_kind() {
        // "\u{D800}A": an unpaired high surrogate followed by 'A'.
        let lone_surrogate = RawValue::new(REG_SZ, vec![0x00, 0xD8, 0x41, 0x00, 0x00, 0x00]);
        assert_eq!(
            Lookup::classify(Some(lone_surrogate), ValueKind::DWord),
            Lookup::WrongKind
        );

        let short_dword = RawValue::new(REG_DWORD, vec![1, 2]);
        assert_eq!(
            Lookup::classify(Some(short_dword), ValueKind::String),
            Lookup::WrongKind
        );
    }

    #[test]
    fn test_malformed_payload_under_expected_type_is_wrong_kind() {
        let short_dword = RawValue::new(REG_DWORD, vec![1, 2]);
        assert_eq!(
            Lookup::classify(Some(short_dword), ValueKind::DWord),
            Lookup::WrongKind
        );

        let lone_surrogate = RawValue::new(REG_EXPAND_SZ, vec![0x00, 0xD8, 0x00, 0x00]);
        assert_eq!(
            Lookup::classify(Some(lone_surrogate), ValueKind::String),
            Lookup::WrongKind
        );
    }

    #[test]
    fn test_kind_of_raw_type() {
        assert_eq!(ValueKind::of_raw(REG_SZ), ValueKind::String);
        assert_eq!(ValueKind::of_raw(REG_EXPAND_SZ), ValueKind::String);
        assert_eq!(ValueKind::of_raw(REG_DWORD), ValueKind::DWord);
        assert_eq!(ValueKind::of_raw(REG_QWORD), ValueKind::QWord);
        assert_eq!(ValueKind::of_raw(REG_MULTI_SZ), ValueKind::MultiString);
        assert_eq!(ValueKind::of_raw(REG_BINARY), ValueKind::Binary);
        // REG_NONE and REG_DWORD_BIG_ENDIAN have no dedicated kind.
        assert_eq!(ValueKind::of_raw(0), ValueKind::Binary);
        assert_eq!(ValueKind::of_raw(5), ValueKind::Binary);
    }

    #[test]
    fn test_unmodelled_type_is_present_as_binary() {
        let raw = RawValue::new(0, vec![9, 8]);
        assert_eq!(
            Lookup::classify(Some(raw), ValueKind::Binary),
            Lookup::Present(Value::Other {
                raw_type: 0,
                data: vec![9, 8]
            })
        );
    }

    #[test]
    fn test_wrong_kind_distinct_from_all_ones_dword() {
        // A stored 0xFFFFFFFF is a real payload, not a mismatch marker.
        let lookup = Lookup::classify(Some((&Value::dword(u32::MAX)).into()), ValueKind::DWord);
        assert!(!lookup.is_wrong_kind());
        assert_eq!(lookup.into_value(), Some(Value::dword(u32::MAX)));
    }

    #[test]
    fn test_parse_as() {
        assert_eq!(Value::parse_as(ValueKind::DWord, &["0x10"]).unwrap(), Value::dword(16));
        assert_eq!(Value::parse_as(ValueKind::QWord, &["12"]).unwrap(), Value::qword(12));
        assert_eq!(
            Value::parse_as(ValueKind::MultiString, &["a", "b"]).unwrap(),
            Value::multi_string(["a", "b"])
        );
        assert_eq!(
            Value::parse_as(ValueKind::Binary, &["de ad", "01"]).unwrap(),
            Value::binary(vec![0xde, 0xad, 0x01])
        );
        assert!(Value::parse_as(ValueKind::DWord, &["4294967296"]).is_err());
        assert!(Value::parse_as(ValueKind::String, &["a", "b"]).is_err());
        assert!(Value::parse_as(ValueKind::Binary, &["abc"]).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::binary(vec![0x0a, 0xff]).to_string(), "0a ff");
        assert_eq!(Value::multi_string(["x", "y"]).to_string(), "x\ny");
        assert_eq!(Value::qword(9).to_string(), "9");
        assert_eq!("REG_MULTI_SZ".parse::<ValueKind>().unwrap(), ValueKind::MultiString);
        assert!("float".parse::<ValueKind>().is_err());
    }

    #[cfg(windows)]
    #[test]
    fn test_expand_only_touches_expandable_strings() {
        let root = std::env::var("SystemRoot").unwrap();
        assert_eq!(
            Value::ExpandString(r"%SystemRoot%\Temp".into()).expand().unwrap(),
            Value::string(format!(r"{root}\Temp"))
        );
        assert_eq!(
            Value::string("%SystemRoot%").expand().unwrap(),
            Value::string("%SystemRoot%")
        );
        assert_eq!(Value::dword(3).expand().unwrap(), Value::dword(3));
    }
}
