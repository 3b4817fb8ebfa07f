//! Packet codec: 32-byte header, fields, 8-byte footer (spec §3 "Packet", §4.2).

use chrono::{DateTime, Utc};

use ncp_core::{DecodeError, DecodeErrorExt, EncodeError, EncodeErrorExt, ReadCursor, WriteCursor};

use crate::field::Field;
use crate::ident::Identifier;
use crate::timestamp::{decode_timestamp, encode_timestamp};

/// Byte length of the fixed packet header (spec §3 wire layout table).
pub const PACKET_HEADER_LEN: usize = 32;

/// Byte length of the packet footer: 4 zero "checksum" bytes + magic.
pub const PACKET_FOOTER_LEN: usize = 8;

const HEADER_MAGIC: [u8; 4] = [0xDD, 0xCC, 0xBB, 0xAA];
const FOOTER_MAGIC: [u8; 4] = [0xAA, 0xBB, 0xCC, 0xDD];
const PACKET_FORMAT: u32 = 1;

#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    pub packet_type: Identifier,
    pub id: u32,
    pub timestamp: DateTime<Utc>,
    pub info: [u8; 4],
    pub fields: Vec<Field>,
}

impl Packet {
    pub fn new(packet_type: Identifier, id: u32, timestamp: DateTime<Utc>, info: [u8; 4], fields: Vec<Field>) -> Self {
        Self { packet_type, id, timestamp, info, fields }
    }

    fn fields_len(&self) -> Result<usize, EncodeError> {
        let mut total = 0;
        for field in &self.fields {
            total += field.encoded_len()?;
        }
        Ok(total)
    }

    pub fn encoded_len(&self) -> Result<usize, EncodeError> {
        Ok(PACKET_HEADER_LEN + self.fields_len()? + PACKET_FOOTER_LEN)
    }
}

/// Encodes `packet` into a freshly allocated, contiguous buffer.
pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>, EncodeError> {
    let total = packet.encoded_len()?;
    let size_words = u32::try_from(total / 4)
        .map_err(|_| EncodeError::invalid_field("encode_packet", "total_size_words", "packet too large"))?;
    let (unix_seconds, nanoseconds) = encode_timestamp(packet.timestamp);

    let mut buf = vec![0u8; total];
    let mut dst = WriteCursor::new(&mut buf);
    dst.write_array(HEADER_MAGIC);
    dst.write_array(packet.packet_type.encode());
    dst.write_u32(size_words);
    dst.write_u32(packet.id);
    dst.write_u32(PACKET_FORMAT);
    dst.write_u32(unix_seconds);
    dst.write_u32(nanoseconds);
    dst.write_array(packet.info);
    for field in &packet.fields {
        field.encode(&mut dst)?;
    }
    dst.write_array([0, 0, 0, 0]); // footer checksum, always zero.
    dst.write_array(FOOTER_MAGIC);

    debug_assert_eq!(dst.pos(), total);
    Ok(buf)
}

/// Reads the total packet size (in bytes) from the first 12 bytes of a
/// packet, i.e. enough to reach the `total_size_words` field at offset 8.
/// Used by streaming readers to know how many more bytes to read after the
/// fixed 32-byte header (spec §4.2).
pub fn peek_packet_size(header_prefix: &[u8]) -> Result<u32, DecodeError> {
    if header_prefix.len() < 12 {
        return Err(DecodeError::not_enough_bytes("peek_packet_size", header_prefix.len(), 12));
    }
    let mut src = ReadCursor::new(header_prefix);
    src.advance(8);
    let size_words = src
        .try_read_u32()
        .map_err(|e| DecodeError::not_enough_bytes("peek_packet_size", e.received(), e.expected()))?;
    Ok(size_words * 4)
}

/// The result of decoding a packet's fixed header: enough information to
/// know how many more body bytes to read, plus a continuation that finishes
/// decoding once those bytes are in hand.
pub struct PacketHeader {
    packet_type: Identifier,
    id: u32,
    timestamp: DateTime<Utc>,
    info: [u8; 4],
    total_size: usize,
}

impl PacketHeader {
    /// Number of bytes remaining to read after the 32-byte header
    /// (the field region plus the 8-byte footer).
    pub const fn body_size(&self) -> usize {
        self.total_size - PACKET_HEADER_LEN
    }

    /// Finishes decoding the packet given its body bytes (everything after
    /// the 32-byte header — the encoded fields followed by the footer).
    pub fn finish(self, body: &[u8], raw: bool) -> Result<Packet, DecodeError> {
        if body.len() != self.body_size() {
            return Err(DecodeError::invalid_field("decode_packet", "body", "unexpected body length"));
        }
        if body.len() < PACKET_FOOTER_LEN {
            return Err(DecodeError::not_enough_bytes("decode_packet", body.len(), PACKET_FOOTER_LEN));
        }
        let footer_start = body.len() - PACKET_FOOTER_LEN;
        let footer_magic = &body[footer_start + 4..];
        if footer_magic != FOOTER_MAGIC {
            return Err(DecodeError::invalid_field("decode_packet", "footer_magic", "bad footer magic"));
        }

        let field_bytes = &body[..footer_start];
        let mut src = ReadCursor::new(field_bytes);
        let mut fields = Vec::new();
        while !src.is_empty() {
            fields.push(Field::decode(&mut src, raw)?);
        }

        Ok(Packet {
            packet_type: self.packet_type,
            id: self.id,
            timestamp: self.timestamp,
            info: self.info,
            fields,
        })
    }
}

/// Decodes the fixed 32-byte packet header, returning a [`PacketHeader`]
/// that reports how many more bytes to read and can finish decoding once
/// they arrive. See spec §4.2 "Two-phase decode".
pub fn decode_header(header: &[u8; PACKET_HEADER_LEN]) -> Result<PacketHeader, DecodeError> {
    let mut src = ReadCursor::new(header);

    let magic = src.read_array::<4>();
    if magic != HEADER_MAGIC {
        return Err(DecodeError::invalid_field("decode_packet", "magic", "bad header magic"));
    }
    let packet_type = Identifier::decode(src.read_array::<4>())
        .ok_or_else(|| DecodeError::invalid_field("decode_packet", "type", "empty identifier"))?;
    let size_words = src
        .try_read_u32()
        .map_err(|e| DecodeError::not_enough_bytes("decode_packet", e.received(), e.expected()))?;
    let id = src
        .try_read_u32()
        .map_err(|e| DecodeError::not_enough_bytes("decode_packet", e.received(), e.expected()))?;
    let format = src
        .try_read_u32()
        .map_err(|e| DecodeError::not_enough_bytes("decode_packet", e.received(), e.expected()))?;
    if format != PACKET_FORMAT {
        tracing::warn!(format, "unknown packet format");
    }
    let unix_seconds = src
        .try_read_u32()
        .map_err(|e| DecodeError::not_enough_bytes("decode_packet", e.received(), e.expected()))?;
    let nanoseconds = src
        .try_read_u32()
        .map_err(|e| DecodeError::not_enough_bytes("decode_packet", e.received(), e.expected()))?;
    let info = src.read_array::<4>();

    let total_size = (size_words as usize)
        .checked_mul(4)
        .ok_or_else(|| DecodeError::invalid_field("decode_packet", "total_size_words", "overflow"))?;
    if total_size < PACKET_HEADER_LEN + PACKET_FOOTER_LEN {
        return Err(DecodeError::invalid_field(
            "decode_packet",
            "total_size_words",
            "smaller than header plus footer",
        ));
    }
    let timestamp = decode_timestamp(unix_seconds, nanoseconds)?;

    Ok(PacketHeader { packet_type, id, timestamp, info, total_size })
}

/// Decodes a complete packet from `buf`. `raw`, when true, keeps parameter
/// values as opaque `(tag, bytes)` pairs rather than typed variants.
pub fn decode_packet(buf: &[u8], raw: bool) -> Result<Packet, DecodeError> {
    if buf.len() < PACKET_HEADER_LEN {
        return Err(DecodeError::not_enough_bytes("decode_packet", buf.len(), PACKET_HEADER_LEN));
    }
    let header_bytes: [u8; PACKET_HEADER_LEN] = buf[..PACKET_HEADER_LEN].try_into().expect("checked length above");
    let header = decode_header(&header_bytes)?;
    let body = &buf[PACKET_HEADER_LEN..];
    if body.len() < header.body_size() {
        return Err(DecodeError::not_enough_bytes("decode_packet", body.len(), header.body_size()));
    }
    header.finish(&body[..header.body_size()], raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::Parameter;
    use chrono::TimeZone;

    fn id(s: &str) -> Identifier {
        Identifier::try_from(s).unwrap()
    }

    fn sample_packet() -> Packet {
        Packet::new(
            id("LINK"),
            42,
            Utc.timestamp_opt(1_700_000_000, 123_456_000).single().unwrap(),
            *b"INFO",
            vec![Field::new(
                id("HELO"),
                1,
                vec![Parameter::new(id("NAME"), "rx0")],
            )],
        )
    }

    #[test]
    fn round_trips_full_packet() {
        let packet = sample_packet();
        let bytes = encode_packet(&packet).unwrap();
        let decoded = decode_packet(&bytes, false).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn framing_invariants_hold() {
        let packet = sample_packet();
        let bytes = encode_packet(&packet).unwrap();
        assert_eq!(&bytes[..4], &HEADER_MAGIC);
        assert_eq!(&bytes[bytes.len() - 4..], &FOOTER_MAGIC);
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn peek_packet_size_matches_encoded_length() {
        let packet = sample_packet();
        let bytes = encode_packet(&packet).unwrap();
        let size = peek_packet_size(&bytes[..12]).unwrap();
        assert_eq!(size as usize, bytes.len());
    }

    #[test]
    fn two_phase_decode_matches_one_shot_decode() {
        let packet = sample_packet();
        let bytes = encode_packet(&packet).unwrap();

        let header_bytes: [u8; PACKET_HEADER_LEN] = bytes[..PACKET_HEADER_LEN].try_into().unwrap();
        let header = decode_header(&header_bytes).unwrap();
        let body = &bytes[PACKET_HEADER_LEN..PACKET_HEADER_LEN + header.body_size()];
        let via_two_phase = header.finish(body, false).unwrap();

        let via_one_shot = decode_packet(&bytes, false).unwrap();
        assert_eq!(via_two_phase, via_one_shot);
    }

    #[test]
    fn empty_packet_meets_minimum_size() {
        let packet = Packet::new(id("LINK"), 1, Utc.timestamp_opt(0, 0).single().unwrap(), [0; 4], vec![]);
        let bytes = encode_packet(&packet).unwrap();
        assert_eq!(bytes.len(), 40);
    }

    #[test]
    fn rejects_bad_header_magic() {
        let packet = sample_packet();
        let mut bytes = encode_packet(&packet).unwrap();
        bytes[0] = 0;
        assert!(decode_packet(&bytes, false).is_err());
    }

    #[test]
    fn rejects_bad_footer_magic() {
        let packet = sample_packet();
        let mut bytes = encode_packet(&packet).unwrap();
        let last = bytes.len() - 1;
        bytes[last] = 0;
        assert!(decode_packet(&bytes, false).is_err());
    }
}
