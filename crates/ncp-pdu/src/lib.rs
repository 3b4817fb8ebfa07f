//! NCP packet wire format: identifiers, parameter values, fields, and
//! packets, plus the two-phase streaming packet decoder.

mod field;
mod ident;
mod packet;
mod param;
mod timestamp;
mod value;

pub use self::field::{
    field_error_code, field_error_detail, field_warning_code, field_warning_detail, Field, FIELD_HEADER_LEN,
};
pub use self::ident::Identifier;
pub use self::packet::{
    decode_header, decode_packet, encode_packet, peek_packet_size, Packet, PacketHeader, PACKET_FOOTER_LEN,
    PACKET_HEADER_LEN,
};
pub use self::param::{Parameter, PARAM_HEADER_LEN};
pub use self::timestamp::{decode_timestamp, encode_timestamp};
pub use self::value::{
    ParamValue, TAG_I16_ARRAY, TAG_I32, TAG_I32_ARRAY, TAG_I8_ARRAY, TAG_RAW, TAG_STR, TAG_U16_ARRAY, TAG_U32,
    TAG_U32_ARRAY, TAG_U8_ARRAY,
};

pub use ncp_core::{DecodeError, DecodeErrorKind, EncodeError, EncodeErrorKind};
