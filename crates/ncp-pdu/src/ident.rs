use std::fmt;

use ncp_core::{EncodeError, EncodeErrorExt};

/// A 4-byte, space-padded Latin-1 ASCII token used as a packet type, field
/// name, or parameter name.
///
/// On the wire this is always exactly 4 bytes. In memory it is stored
/// unpadded (trailing spaces/NULs stripped), which is what `Display`,
/// `Eq`, and `Hash` compare against.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier {
    bytes: [u8; 4],
    len: u8,
}

impl Identifier {
    /// Builds an identifier from up to 4 already-validated Latin-1 bytes.
    ///
    /// # Panics
    ///
    /// Panics if `len` is 0 or greater than 4.
    const fn from_raw(bytes: [u8; 4], len: u8) -> Self {
        assert!(len > 0 && len <= 4, "identifier length must be 1..=4");
        Self { bytes, len }
    }

    /// Decodes an identifier from its 4-byte wire representation, stripping
    /// trailing `0x20` (space) and `0x00` (NUL) bytes.
    ///
    /// Returns `None` if the identifier would be empty after stripping —
    /// callers should treat that as a malformed frame.
    pub fn decode(wire: [u8; 4]) -> Option<Self> {
        let mut len = 4usize;
        while len > 0 && matches!(wire[len - 1], 0x20 | 0x00) {
            len -= 1;
        }
        if len == 0 {
            return None;
        }
        Some(Self::from_raw(wire, len as u8))
    }

    /// Encodes this identifier to its 4-byte, space-padded wire representation.
    pub fn encode(&self) -> [u8; 4] {
        let mut out = [0x20u8; 4];
        out[..self.len as usize].copy_from_slice(&self.bytes[..self.len as usize]);
        out
    }

    pub fn as_str(&self) -> &str {
        // Safety argument: every byte was validated as printable Latin-1
        // ASCII (0x20..=0x7e) at construction time in `TryFrom<&str>` or
        // `decode`, both of which only accept ASCII bytes, so this is valid UTF-8.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl TryFrom<&str> for Identifier {
    type Error = EncodeError;

    fn try_from(text: &str) -> Result<Self, Self::Error> {
        if text.is_empty() || text.len() > 4 {
            return Err(EncodeError::invalid_field(
                "encode_identifier",
                "identifier",
                "must be 1 to 4 bytes",
            ));
        }
        if !text.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
            return Err(EncodeError::invalid_field(
                "encode_identifier",
                "identifier",
                "must be printable Latin-1 ASCII",
            ));
        }

        let mut bytes = [0u8; 4];
        bytes[..text.len()].copy_from_slice(text.as_bytes());
        Ok(Self::from_raw(bytes, text.len() as u8))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({:?})", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_full_length() {
        let id = Identifier::try_from("LINK").unwrap();
        assert_eq!(id.encode(), *b"LINK");
        assert_eq!(Identifier::decode(*b"LINK").unwrap(), id);
    }

    #[test]
    fn pads_short_identifiers_with_spaces() {
        let id = Identifier::try_from("ID").unwrap();
        assert_eq!(id.encode(), *b"ID  ");
    }

    #[test]
    fn decode_strips_trailing_space_and_nul() {
        let from_space = Identifier::decode(*b"ID  ").unwrap();
        let from_nul = Identifier::decode(*b"ID\0\0").unwrap();
        assert_eq!(from_space.as_str(), "ID");
        assert_eq!(from_nul.as_str(), "ID");
        assert_eq!(from_space, from_nul);
    }

    #[test]
    fn rejects_empty_and_too_long() {
        assert!(Identifier::try_from("").is_err());
        assert!(Identifier::try_from("TOOLONG").is_err());
    }

    #[test]
    fn decode_rejects_all_padding() {
        assert!(Identifier::decode([0x20; 4]).is_none());
        assert!(Identifier::decode([0; 4]).is_none());
    }
}
