//! Parameter codec: `{name[4], size_in_words[3 LE], type_tag[1], value..., pad}`.

use ncp_core::{padding_for, round_to_word, DecodeError, DecodeErrorExt, EncodeError, EncodeErrorExt, ReadCursor, WriteCursor};

use crate::ident::Identifier;
use crate::value::ParamValue;

/// Byte length of a parameter's fixed header: `name[4] + size_in_words[3] + type_tag[1]`.
pub const PARAM_HEADER_LEN: usize = 8;

#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub name: Identifier,
    pub value: ParamValue,
}

impl Parameter {
    pub fn new(name: Identifier, value: impl Into<ParamValue>) -> Self {
        Self { name, value: value.into() }
    }

    /// Total encoded size in bytes, including header and padding.
    pub fn encoded_len(&self) -> Result<usize, EncodeError> {
        let payload = self.value.encode_payload()?;
        Ok(PARAM_HEADER_LEN + round_to_word(payload.len()))
    }

    pub fn encode(&self, dst: &mut WriteCursor<'_>) -> Result<(), EncodeError> {
        let payload = self.value.encode_payload()?;
        let total = PARAM_HEADER_LEN + round_to_word(payload.len());
        let size_words = u32::try_from(total / 4)
            .map_err(|_| EncodeError::invalid_field("encode_parameter", "size_in_words", "parameter too large"))?;

        dst.write_array(self.name.encode());
        dst.write_u24(size_words);
        dst.write_u8(self.value.tag());
        dst.write_slice(&payload);
        ncp_core::write_padding(dst, padding_for(payload.len()));
        Ok(())
    }

    /// Decodes one parameter from `src`, which must be positioned at the
    /// parameter's header. `raw` forwards to [`ParamValue::decode_payload`].
    pub fn decode(src: &mut ReadCursor<'_>, raw: bool) -> Result<Self, DecodeError> {
        let name_bytes = src.read_array::<4>();
        let name = Identifier::decode(name_bytes)
            .ok_or_else(|| DecodeError::invalid_field("decode_parameter", "name", "empty identifier"))?;
        let size_words = src
            .try_read_u24()
            .map_err(|e| DecodeError::not_enough_bytes("decode_parameter", e.received(), e.expected()))?;
        let tag = src
            .try_read_u8()
            .map_err(|e| DecodeError::not_enough_bytes("decode_parameter", e.received(), e.expected()))?;

        let total = (size_words as usize)
            .checked_mul(4)
            .ok_or_else(|| DecodeError::invalid_field("decode_parameter", "size_in_words", "overflow"))?;
        if total < PARAM_HEADER_LEN {
            return Err(DecodeError::invalid_field(
                "decode_parameter",
                "size_in_words",
                "smaller than parameter header",
            ));
        }
        let payload_len = total - PARAM_HEADER_LEN;
        if src.len() < payload_len {
            return Err(DecodeError::not_enough_bytes("decode_parameter", src.len(), payload_len));
        }
        // `payload` includes any trailing word-alignment padding. Strings
        // find their own terminator; everything else has no way to tell
        // padding from trailing zero data shorter than a word, so a packed
        // array/raw value whose natural length isn't already 4-byte aligned
        // decodes with its padding folded in as trailing zeros, matching the
        // legacy wire format's behavior.
        let payload = src.read_slice(payload_len);
        let value = ParamValue::decode_payload(tag, payload, raw)?;

        Ok(Self { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identifier {
        Identifier::try_from(s).unwrap()
    }

    #[test]
    fn round_trips_i32() {
        let p = Parameter::new(id("GAIN"), -5i32);
        let len = p.encoded_len().unwrap();
        let mut buf = vec![0u8; len];
        p.encode(&mut WriteCursor::new(&mut buf)).unwrap();
        assert_eq!(buf.len() % 4, 0);

        let mut cursor = ReadCursor::new(&buf);
        let decoded = Parameter::decode(&mut cursor, false).unwrap();
        assert_eq!(decoded, p);
    }

    #[test]
    fn round_trips_string_with_padding() {
        let p = Parameter::new(id("NAME"), "rx0");
        let len = p.encoded_len().unwrap();
        let mut buf = vec![0u8; len];
        p.encode(&mut WriteCursor::new(&mut buf)).unwrap();

        let mut cursor = ReadCursor::new(&buf);
        let decoded = Parameter::decode(&mut cursor, false).unwrap();
        assert_eq!(decoded.value, ParamValue::Str("rx0".to_owned()));
    }

    #[test]
    fn size_words_times_four_equals_encoded_len() {
        let p = Parameter::new(id("FREQ"), 2_400_000_000u32);
        let len = p.encoded_len().unwrap();
        assert_eq!(len % 4, 0);
    }

    #[test]
    fn word_aligned_array_round_trips_exactly() {
        // 4 * u16 = 8 bytes, already word-aligned, so no padding ambiguity.
        let p = Parameter::new(id("DATA"), ParamValue::U16Array(vec![1, 2, 3, 4]));
        let len = p.encoded_len().unwrap();
        let mut buf = vec![0u8; len];
        p.encode(&mut WriteCursor::new(&mut buf)).unwrap();

        let mut cursor = ReadCursor::new(&buf);
        let decoded = Parameter::decode(&mut cursor, false).unwrap();
        assert_eq!(decoded, p);
    }

    #[test]
    fn raw_mode_preserves_opaque_tag_and_bytes() {
        let p = Parameter::new(id("GAIN"), -5i32);
        let len = p.encoded_len().unwrap();
        let mut buf = vec![0u8; len];
        p.encode(&mut WriteCursor::new(&mut buf)).unwrap();

        let mut cursor = ReadCursor::new(&buf);
        let decoded = Parameter::decode(&mut cursor, true).unwrap();
        assert_eq!(decoded.value, ParamValue::Unknown(0x00, vec![251, 255, 255, 255]));
    }
}
