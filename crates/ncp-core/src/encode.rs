use std::fmt;

pub type EncodeResult<T> = Result<T, EncodeError>;

/// Error type for encoding operations, wrapping an [`EncodeErrorKind`].
pub type EncodeError = ncp_error::Error<EncodeErrorKind>;

#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum EncodeErrorKind {
    NotEnoughBytes { received: usize, expected: usize },
    InvalidField { field: &'static str, reason: &'static str },
    Other { description: &'static str },
}

impl std::error::Error for EncodeErrorKind {}

impl fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEnoughBytes { received, expected } => write!(
                f,
                "not enough bytes provided to encode: received {received} bytes, expected {expected} bytes"
            ),
            Self::InvalidField { field, reason } => write!(f, "invalid `{field}`: {reason}"),
            Self::Other { description } => write!(f, "{description}"),
        }
    }
}

pub trait EncodeErrorExt {
    fn invalid_field(context: &'static str, field: &'static str, reason: &'static str) -> Self;
    fn other(context: &'static str, description: &'static str) -> Self;
}

impl EncodeErrorExt for EncodeError {
    fn invalid_field(context: &'static str, field: &'static str, reason: &'static str) -> Self {
        Self::new(context, EncodeErrorKind::InvalidField { field, reason })
    }

    fn other(context: &'static str, description: &'static str) -> Self {
        Self::new(context, EncodeErrorKind::Other { description })
    }
}
