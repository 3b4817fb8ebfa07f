use std::fmt;

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Error type for decoding operations, wrapping a [`DecodeErrorKind`].
pub type DecodeError = ncp_error::Error<DecodeErrorKind>;

#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum DecodeErrorKind {
    NotEnoughBytes { received: usize, expected: usize },
    InvalidField { field: &'static str, reason: &'static str },
    Other { description: &'static str },
}

impl std::error::Error for DecodeErrorKind {}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEnoughBytes { received, expected } => write!(
                f,
                "not enough bytes provided to decode: received {received} bytes, expected {expected} bytes"
            ),
            Self::InvalidField { field, reason } => write!(f, "invalid `{field}`: {reason}"),
            Self::Other { description } => write!(f, "{description}"),
        }
    }
}

pub trait DecodeErrorExt {
    fn not_enough_bytes(context: &'static str, received: usize, expected: usize) -> Self;
    fn invalid_field(context: &'static str, field: &'static str, reason: &'static str) -> Self;
    fn other(context: &'static str, description: &'static str) -> Self;
}

impl DecodeErrorExt for DecodeError {
    fn not_enough_bytes(context: &'static str, received: usize, expected: usize) -> Self {
        Self::new(context, DecodeErrorKind::NotEnoughBytes { received, expected })
    }

    fn invalid_field(context: &'static str, field: &'static str, reason: &'static str) -> Self {
        Self::new(context, DecodeErrorKind::InvalidField { field, reason })
    }

    fn other(context: &'static str, description: &'static str) -> Self {
        Self::new(context, DecodeErrorKind::Other { description })
    }
}

impl From<crate::cursor::NotEnoughBytesError> for DecodeErrorKind {
    fn from(e: crate::cursor::NotEnoughBytesError) -> Self {
        DecodeErrorKind::NotEnoughBytes {
            received: e.received(),
            expected: e.expected(),
        }
    }
}
