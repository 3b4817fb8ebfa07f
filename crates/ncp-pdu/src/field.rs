//! Field codec: `{name[4], size_in_words[3 LE], reserved[1]=0, field_id[4 LE], params...}`.

use tracing::{debug, warn};

use ncp_core::{DecodeError, DecodeErrorExt, EncodeError, EncodeErrorExt, ReadCursor, WriteCursor};

use crate::ident::Identifier;
use crate::param::Parameter;

/// Byte length of a field's fixed header: `name[4] + size_in_words[3] + reserved[1] + id[4]`.
pub const FIELD_HEADER_LEN: usize = 12;

/// The packet-footer pattern with a zeroed checksum, spuriously embedded in
/// field bodies by a known vendor defect (spec §4.2 Axis-quirk workaround).
const EMBEDDED_FOOTER_QUIRK: [u8; 8] = [0x00, 0x00, 0x00, 0x00, 0xAA, 0xBB, 0xCC, 0xDD];

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: Identifier,
    pub id: u32,
    pub params: Vec<Parameter>,
}

impl Field {
    pub fn new(name: Identifier, id: u32, params: Vec<Parameter>) -> Self {
        Self { name, id, params }
    }

    pub fn encoded_len(&self) -> Result<usize, EncodeError> {
        let mut total = FIELD_HEADER_LEN;
        for param in &self.params {
            total += param.encoded_len()?;
        }
        Ok(total)
    }

    pub fn encode(&self, dst: &mut WriteCursor<'_>) -> Result<(), EncodeError> {
        let total = self.encoded_len()?;
        let size_words = u32::try_from(total / 4)
            .map_err(|_| EncodeError::invalid_field("encode_field", "size_in_words", "field too large"))?;

        dst.write_array(self.name.encode());
        dst.write_u24(size_words);
        dst.write_u8(0); // reserved type byte, always zero.
        dst.write_u32(self.id);
        for param in &self.params {
            param.encode(dst)?;
        }
        Ok(())
    }

    /// Decodes one field from `src`, which must be positioned at the
    /// field's header. `raw` forwards to [`Parameter::decode`].
    pub fn decode(src: &mut ReadCursor<'_>, raw: bool) -> Result<Self, DecodeError> {
        let name_bytes = src.read_array::<4>();
        let name = Identifier::decode(name_bytes)
            .ok_or_else(|| DecodeError::invalid_field("decode_field", "name", "empty identifier"))?;
        let size_words = src
            .try_read_u24()
            .map_err(|e| DecodeError::not_enough_bytes("decode_field", e.received(), e.expected()))?;
        let _reserved = src
            .try_read_u8()
            .map_err(|e| DecodeError::not_enough_bytes("decode_field", e.received(), e.expected()))?;
        let id = src
            .try_read_u32()
            .map_err(|e| DecodeError::not_enough_bytes("decode_field", e.received(), e.expected()))?;

        let total = (size_words as usize)
            .checked_mul(4)
            .ok_or_else(|| DecodeError::invalid_field("decode_field", "size_in_words", "overflow"))?;
        if total < FIELD_HEADER_LEN {
            return Err(DecodeError::invalid_field(
                "decode_field",
                "size_in_words",
                "smaller than field header",
            ));
        }
        let param_region_len = total - FIELD_HEADER_LEN;
        if src.len() < param_region_len {
            return Err(DecodeError::not_enough_bytes("decode_field", src.len(), param_region_len));
        }
        let param_limit = src.pos() + param_region_len;

        let mut params: Vec<Parameter> = Vec::new();
        while src.pos() < param_limit {
            if src.remaining().len() >= 8 && src.remaining()[..8] == EMBEDDED_FOOTER_QUIRK {
                warn!("encountered embedded packet footer bug while decoding field {name}");
                src.advance(8);
                continue;
            }

            let param = Parameter::decode(src, raw)?;
            if let Some(existing) = params.iter_mut().find(|p: &&mut Parameter| p.name == param.name) {
                debug!(field = %name, param = %param.name, "duplicate parameter name, keeping last value");
                *existing = param;
            } else {
                params.push(param);
            }
        }

        if src.pos() > param_limit {
            return Err(DecodeError::invalid_field(
                "decode_field",
                "size_in_words",
                "parameter overflowed field boundary",
            ));
        }

        Ok(Self { name, id, params })
    }

    /// Looks up a parameter by name, returning the last matching value
    /// (duplicates are already collapsed to last-write-wins on decode).
    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name.as_str() == name)
    }
}

/// Spec §7: a field carrying `ERRC` is a command-error response.
pub fn field_error_code(field: &Field) -> Option<u32> {
    use crate::value::ParamValue;
    match field.param("ERRC").map(|p| &p.value) {
        Some(ParamValue::U32(code)) => Some(*code),
        Some(ParamValue::I32(code)) => Some(*code as u32),
        _ => None,
    }
}

pub fn field_error_detail(field: &Field) -> Option<String> {
    use crate::value::ParamValue;
    match field.param("ERRO").map(|p| &p.value) {
        Some(ParamValue::Str(s)) => Some(s.clone()),
        _ => None,
    }
}

pub fn field_warning_code(field: &Field) -> Option<u32> {
    use crate::value::ParamValue;
    match field.param("WARC").map(|p| &p.value) {
        Some(ParamValue::U32(code)) => Some(*code),
        Some(ParamValue::I32(code)) => Some(*code as u32),
        _ => None,
    }
}

pub fn field_warning_detail(field: &Field) -> Option<String> {
    use crate::value::ParamValue;
    match field.param("WARN").map(|p| &p.value) {
        Some(ParamValue::Str(s)) => Some(s.clone()),
        _ => None,
    }
}
