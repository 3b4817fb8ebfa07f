//! The tagged parameter-value union (spec §3 "Parameter value").

use ncp_core::{DecodeError, DecodeErrorExt, EncodeError, EncodeErrorExt};

pub const TAG_I32: u8 = 0x00;
pub const TAG_U32: u8 = 0x01;
pub const TAG_STR: u8 = 0x02;
pub const TAG_RAW: u8 = 0x80;
pub const TAG_U8_ARRAY: u8 = 0x81;
pub const TAG_U16_ARRAY: u8 = 0x82;
pub const TAG_U32_ARRAY: u8 = 0x83;
pub const TAG_I8_ARRAY: u8 = 0x84;
pub const TAG_I16_ARRAY: u8 = 0x85;
pub const TAG_I32_ARRAY: u8 = 0x86;

/// A parameter's value, tagged by wire type.
///
/// `Unknown` preserves any tag this crate does not recognize, carrying the
/// raw (already unpadded) payload bytes rather than dropping the parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    I32(i32),
    U32(u32),
    Str(String),
    Raw(Vec<u8>),
    U8Array(Vec<u8>),
    U16Array(Vec<u16>),
    U32Array(Vec<u32>),
    I8Array(Vec<i8>),
    I16Array(Vec<i16>),
    I32Array(Vec<i32>),
    Unknown(u8, Vec<u8>),
}

impl ParamValue {
    pub const fn tag(&self) -> u8 {
        match self {
            Self::I32(_) => TAG_I32,
            Self::U32(_) => TAG_U32,
            Self::Str(_) => TAG_STR,
            Self::Raw(_) => TAG_RAW,
            Self::U8Array(_) => TAG_U8_ARRAY,
            Self::U16Array(_) => TAG_U16_ARRAY,
            Self::U32Array(_) => TAG_U32_ARRAY,
            Self::I8Array(_) => TAG_I8_ARRAY,
            Self::I16Array(_) => TAG_I16_ARRAY,
            Self::I32Array(_) => TAG_I32_ARRAY,
            Self::Unknown(tag, _) => *tag,
        }
    }

    /// Encodes the value's payload, unpadded (callers pad to a word boundary).
    pub fn encode_payload(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(match self {
            Self::I32(v) => v.to_le_bytes().to_vec(),
            Self::U32(v) => v.to_le_bytes().to_vec(),
            Self::Str(s) => {
                let mut bytes = encode_latin1(s)?;
                bytes.push(0);
                bytes
            }
            Self::Raw(bytes) => bytes.clone(),
            Self::U8Array(items) => items.clone(),
            Self::U16Array(items) => items.iter().flat_map(|v| v.to_le_bytes()).collect(),
            Self::U32Array(items) => items.iter().flat_map(|v| v.to_le_bytes()).collect(),
            Self::I8Array(items) => items.iter().map(|v| v.to_le_bytes()[0]).collect(),
            Self::I16Array(items) => items.iter().flat_map(|v| v.to_le_bytes()).collect(),
            Self::I32Array(items) => items.iter().flat_map(|v| v.to_le_bytes()).collect(),
            Self::Unknown(_, bytes) => bytes.clone(),
        })
    }

    /// Decodes a value from its wire tag and unpadded payload bytes.
    ///
    /// `raw`, when true, always produces `Unknown(tag, bytes)` regardless of
    /// whether the tag is recognized — this backs `decode_packet`'s `raw`
    /// mode (spec §4.2).
    pub fn decode_payload(tag: u8, bytes: &[u8], raw: bool) -> Result<Self, DecodeError> {
        if raw {
            return Ok(Self::Unknown(tag, bytes.to_vec()));
        }
        Ok(match tag {
            TAG_I32 => {
                let arr: [u8; 4] = bytes
                    .try_into()
                    .map_err(|_| DecodeError::invalid_field("decode_value", "i32", "expected 4 bytes"))?;
                Self::I32(i32::from_le_bytes(arr))
            }
            TAG_U32 => {
                let arr: [u8; 4] = bytes
                    .try_into()
                    .map_err(|_| DecodeError::invalid_field("decode_value", "u32", "expected 4 bytes"))?;
                Self::U32(u32::from_le_bytes(arr))
            }
            TAG_STR => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                Self::Str(decode_latin1(&bytes[..end]))
            }
            TAG_RAW => Self::Raw(bytes.to_vec()),
            TAG_U8_ARRAY => Self::U8Array(bytes.to_vec()),
            TAG_U16_ARRAY => Self::U16Array(decode_packed2(bytes, "u16array", u16::from_le_bytes)?),
            TAG_U32_ARRAY => Self::U32Array(decode_packed4(bytes, "u32array", u32::from_le_bytes)?),
            TAG_I8_ARRAY => Self::I8Array(bytes.iter().map(|&b| b as i8).collect()),
            TAG_I16_ARRAY => Self::I16Array(decode_packed2(bytes, "i16array", i16::from_le_bytes)?),
            TAG_I32_ARRAY => Self::I32Array(decode_packed4(bytes, "i32array", i32::from_le_bytes)?),
            other => Self::Unknown(other, bytes.to_vec()),
        })
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Raw(v)
    }
}

impl From<Vec<u16>> for ParamValue {
    fn from(v: Vec<u16>) -> Self {
        Self::U16Array(v)
    }
}

impl From<Vec<u32>> for ParamValue {
    fn from(v: Vec<u32>) -> Self {
        Self::U32Array(v)
    }
}

impl From<Vec<i8>> for ParamValue {
    fn from(v: Vec<i8>) -> Self {
        Self::I8Array(v)
    }
}

impl From<Vec<i16>> for ParamValue {
    fn from(v: Vec<i16>) -> Self {
        Self::I16Array(v)
    }
}

impl From<Vec<i32>> for ParamValue {
    fn from(v: Vec<i32>) -> Self {
        Self::I32Array(v)
    }
}

fn encode_latin1(s: &str) -> Result<Vec<u8>, EncodeError> {
    s.chars()
        .map(|c| {
            let codepoint = u32::from(c);
            if codepoint <= 0xFF {
                Ok(codepoint as u8)
            } else {
                Err(EncodeError::invalid_field("encode_value", "string", "not representable in Latin-1"))
            }
        })
        .collect()
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn decode_packed2<T>(bytes: &[u8], field: &'static str, from_le_bytes: impl Fn([u8; 2]) -> T) -> Result<Vec<T>, DecodeError> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::invalid_field("decode_value", field, "length not a multiple of 2"));
    }
    Ok(bytes.chunks_exact(2).map(|c| from_le_bytes([c[0], c[1]])).collect())
}

fn decode_packed4<T>(bytes: &[u8], field: &'static str, from_le_bytes: impl Fn([u8; 4]) -> T) -> Result<Vec<T>, DecodeError> {
    if bytes.len() % 4 != 0 {
        return Err(DecodeError::invalid_field("decode_value", field, "length not a multiple of 4"));
    }
    Ok(bytes.chunks_exact(4).map(|c| from_le_bytes([c[0], c[1], c[2], c[3]])).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i32_round_trips() {
        let v = ParamValue::I32(-5);
        let bytes = v.encode_payload().unwrap();
        assert_eq!(ParamValue::decode_payload(TAG_I32, &bytes, false).unwrap(), v);
    }

    #[test]
    fn u32_round_trips() {
        let v = ParamValue::U32(2_400_000_000);
        let bytes = v.encode_payload().unwrap();
        assert_eq!(ParamValue::decode_payload(TAG_U32, &bytes, false).unwrap(), v);
    }

    #[test]
    fn string_round_trips_and_strips_nul() {
        let v = ParamValue::Str("rx0".to_owned());
        let bytes = v.encode_payload().unwrap();
        assert_eq!(bytes, b"rx0\0");
        assert_eq!(ParamValue::decode_payload(TAG_STR, &bytes, false).unwrap(), v);
    }

    #[test]
    fn u16_array_round_trips() {
        let v = ParamValue::U16Array(vec![1, 2, 3, 4, 5]);
        let bytes = v.encode_payload().unwrap();
        assert_eq!(ParamValue::decode_payload(TAG_U16_ARRAY, &bytes, false).unwrap(), v);
    }

    #[test]
    fn unknown_tag_preserved() {
        let bytes = vec![1, 2, 3];
        let v = ParamValue::decode_payload(0x7f, &bytes, false).unwrap();
        assert_eq!(v, ParamValue::Unknown(0x7f, bytes));
    }

    #[test]
    fn raw_mode_always_yields_unknown() {
        let v = ParamValue::decode_payload(TAG_I32, &[1, 0, 0, 0], true).unwrap();
        assert_eq!(v, ParamValue::Unknown(TAG_I32, vec![1, 0, 0, 0]));
    }
}
