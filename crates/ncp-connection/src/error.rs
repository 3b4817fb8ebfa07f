use std::fmt;

use ncp_pdu::{DecodeErrorKind, Identifier};

pub type ConnectionError = ncp_error::Error<ConnectionErrorKind>;
pub type ConnectionResult<T> = Result<T, ConnectionError>;

#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum ConnectionErrorKind {
    Decode(DecodeErrorKind),
    Command {
        packet_type: Identifier,
        field_name: Identifier,
        detail: Option<String>,
        code: u32,
    },
    Network,
    NetworkTimeout,
    Closed,
    QueueOverflow,
}

impl fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(kind) => write!(f, "decode error: {kind}"),
            Self::Command {
                packet_type,
                field_name,
                detail,
                code,
            } => {
                write!(f, "command error on {packet_type} {field_name} (code {code})")?;
                if let Some(detail) = detail {
                    write!(f, ": {detail}")?;
                }
                Ok(())
            }
            Self::Network => write!(f, "network error"),
            Self::NetworkTimeout => write!(f, "no packet received within the read timeout"),
            Self::Closed => write!(f, "connection closed"),
            Self::QueueOverflow => write!(f, "waiter mailbox overflowed"),
        }
    }
}

impl std::error::Error for ConnectionErrorKind {}

pub trait ConnectionErrorExt {
    fn decode(context: &'static str, kind: DecodeErrorKind) -> Self;
    fn command(context: &'static str, packet_type: Identifier, field_name: Identifier, detail: Option<String>, code: u32) -> Self;
    fn network(context: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> Self;
    fn timeout(context: &'static str) -> Self;
    fn closed(context: &'static str) -> Self;
    fn overflow(context: &'static str) -> Self;
}

impl ConnectionErrorExt for ConnectionError {
    fn decode(context: &'static str, kind: DecodeErrorKind) -> Self {
        Self::new(context, ConnectionErrorKind::Decode(kind))
    }

    fn command(context: &'static str, packet_type: Identifier, field_name: Identifier, detail: Option<String>, code: u32) -> Self {
        Self::new(
            context,
            ConnectionErrorKind::Command {
                packet_type,
                field_name,
                detail,
                code,
            },
        )
    }

    fn network(context: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::new(context, ConnectionErrorKind::Network).with_source(source)
    }

    fn timeout(context: &'static str) -> Self {
        Self::new(context, ConnectionErrorKind::NetworkTimeout)
    }

    fn closed(context: &'static str) -> Self {
        Self::new(context, ConnectionErrorKind::Closed)
    }

    fn overflow(context: &'static str) -> Self {
        Self::new(context, ConnectionErrorKind::QueueOverflow)
    }
}

/// `ncp_error::Error` can't derive `Clone` (its `source` is a boxed trait
/// object), but `ConnectionErrorKind` can — used to fan one poisoning
/// error out to every waiter without the original causal chain.
pub(crate) fn clone_without_source(error: &ConnectionError) -> ConnectionError {
    ConnectionError::new(error.context, error.kind.clone())
}

pub type ClientError = ncp_error::Error<ClientErrorKind>;

#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum ClientErrorKind {
    Connection(ConnectionErrorKind),
    Authentication { detail: Option<String>, code: Option<u32> },
}

impl fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(kind) => write!(f, "{kind}"),
            Self::Authentication { detail, code } => {
                write!(f, "authentication failed")?;
                if let Some(code) = code {
                    write!(f, " (code {code})")?;
                }
                if let Some(detail) = detail {
                    write!(f, ": {detail}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ClientErrorKind {}
